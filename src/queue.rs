//! Single-flight merge queue.
//!
//! [`MergeQueue`] accepts [`ChapterTask`]s at any time and merges them one
//! at a time, in arrival order, on a single background worker. The worker
//! wakes on two signals:
//!
//! - a [`Notify`] fired by [`MergeQueue::enqueue`], and
//! - a periodic heartbeat (`queue.heartbeat_ms`), which drains the queue
//!   even if a wake-up was missed.
//!
//! Between two tasks the worker sleeps `queue.yield_ms` so other work on
//! the runtime (HTTP handlers, readers of the library) gets a turn.
//!
//! A failed merge is written to the event log as `error` and the worker
//! moves on. The busy state is mirrored to the store's scratch flag
//! [`BUSY_FLAG`] so another process can see a drain in progress.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use chapter_merge_core::models::ChapterTask;
use chapter_merge_core::store::{Store, BUSY_FLAG};
use chapter_merge_core::Library;

use crate::config::QueueConfig;

/// The library shared between the queue worker and readers.
pub type SharedLibrary = Arc<Mutex<Library>>;

#[derive(Clone)]
pub struct MergeQueue {
    library: SharedLibrary,
    store: Arc<dyn Store>,
    pending: Arc<Mutex<VecDeque<ChapterTask>>>,
    notify: Arc<Notify>,
    busy: Arc<AtomicBool>,
    outstanding: Arc<watch::Sender<usize>>,
    shutdown: Arc<watch::Sender<bool>>,
    worker: Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
    yield_delay: Duration,
    heartbeat: Duration,
}

impl MergeQueue {
    /// Reset the busy flag and spawn the worker.
    pub async fn start(library: SharedLibrary, config: &QueueConfig) -> Result<Self> {
        let store = library.lock().await.store().clone();
        store.put_flag(BUSY_FLAG, false).await?;

        let (outstanding, _) = watch::channel(0usize);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let queue = Self {
            library,
            store,
            pending: Arc::new(Mutex::new(VecDeque::new())),
            notify: Arc::new(Notify::new()),
            busy: Arc::new(AtomicBool::new(false)),
            outstanding: Arc::new(outstanding),
            shutdown: Arc::new(shutdown),
            worker: Arc::new(std::sync::Mutex::new(None)),
            yield_delay: config.yield_delay(),
            heartbeat: config.heartbeat(),
        };

        let worker = queue.clone();
        let handle = tokio::spawn(async move {
            worker.run_loop(shutdown_rx).await;
        });
        if let Ok(mut slot) = queue.worker.lock() {
            *slot = Some(handle);
        }
        Ok(queue)
    }

    pub fn library(&self) -> &SharedLibrary {
        &self.library
    }

    /// Append a task; never blocks on a merge in progress.
    pub async fn enqueue(&self, task: ChapterTask) {
        let mut pending = self.pending.lock().await;
        self.outstanding.send_modify(|n| *n += 1);
        pending.push_back(task);
        drop(pending);
        self.notify.notify_one();
    }

    /// Tasks queued or in flight.
    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// True while the worker is draining.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Resolve once every enqueued task has been merged or has failed.
    pub async fn wait_idle(&self) {
        let mut rx = self.outstanding.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Stop the worker after the task it is currently merging.
    ///
    /// Tasks still queued are dropped and no longer count as outstanding.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let handle = self.worker.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "merge worker ended abnormally");
            }
        }

        let mut pending = self.pending.lock().await;
        let dropped = pending.len();
        pending.clear();
        self.outstanding.send_modify(|n| *n = n.saturating_sub(dropped));
        if dropped > 0 {
            tracing::warn!(dropped, "merge queue stopped with tasks still queued");
        }
    }

    fn stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn run_loop(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut heartbeat = tokio::time::interval(self.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = heartbeat.tick() => {}
                _ = shutdown_rx.changed() => {}
            }
            if self.stopping() {
                break;
            }
            self.drain().await;
        }
        tracing::debug!("merge worker stopped");
    }

    async fn drain(&self) {
        if self.pending.lock().await.is_empty() {
            return;
        }
        self.set_busy(true).await;

        loop {
            if self.stopping() {
                break;
            }
            let next = self.pending.lock().await.pop_front();
            let Some(task) = next else {
                break;
            };
            self.process(task).await;
            self.outstanding.send_modify(|n| *n = n.saturating_sub(1));

            if self.pending.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(self.yield_delay).await;
        }

        self.set_busy(false).await;
    }

    async fn process(&self, task: ChapterTask) {
        let mut library = self.library.lock().await;
        match library.merge(&task).await {
            Ok(outcome) => {
                tracing::debug!(title = %task.title, ?outcome, "merged");
            }
            Err(e) => {
                tracing::error!(title = %task.title, error = %e, "merge failed");
                library
                    .record_failure(
                        &task.collection_id,
                        &format!("Merge failed for {}: {:#}", task.title, e),
                    )
                    .await;
            }
        }
    }

    async fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
        if let Err(e) = self.store.put_flag(BUSY_FLAG, busy).await {
            tracing::warn!(error = %e, "failed to write busy flag");
        }
    }
}
