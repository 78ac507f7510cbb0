//! Ingestion driver.
//!
//! Feeds inbound events into a running [`MergeQueue`]: `MERGE` events become
//! queued [`ChapterTask`](chapter_merge_core::models::ChapterTask)s using the
//! target folder's grouping setting, and `CHECKLIST` events are imported
//! immediately. The CLI entry points wait for the queue to drain before
//! printing a summary.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};

use chapter_merge_core::merge::clean_content;
use chapter_merge_core::models::LogCategory;
use chapter_merge_core::ImportReport;

use crate::config::Config;
use crate::db;
use crate::events::{parse_jsonl, InboundEvent};
use crate::queue::MergeQueue;

/// What happened to one dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Queued,
    Checklist(ImportReport),
}

/// Route one event to the queue or the checklist tracker.
pub async fn dispatch(
    queue: &MergeQueue,
    collection_id: &str,
    event: InboundEvent,
) -> Result<Dispatched> {
    match event {
        InboundEvent::Merge(payload) => {
            let task = queue
                .library()
                .lock()
                .await
                .task_for(collection_id, &payload.title, &payload.content)?;
            queue.enqueue(task).await;
            Ok(Dispatched::Queued)
        }
        InboundEvent::Checklist(items) => {
            let mut library = queue.library().lock().await;
            let report = library.import_checklist(collection_id, items).await?;
            Ok(Dispatched::Checklist(report))
        }
    }
}

/// Read a whole input, where `None` or `-` means stdin.
pub fn read_input(source: Option<&Path>) -> Result<String> {
    match source {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

async fn start_queue(config: &Config, folder: &str) -> Result<MergeQueue> {
    let library = db::open_shared(config).await?;
    if library.lock().await.collection(folder).is_none() {
        bail!("folder not found: {}", folder);
    }
    MergeQueue::start(library, &config.queue).await
}

/// `chm ingest`: apply a JSON-lines stream of events to one folder.
pub async fn run_ingest(config: &Config, source: Option<&Path>, folder: &str) -> Result<()> {
    let input = read_input(source)?;
    let batch = parse_jsonl(&input);
    for err in &batch.errors {
        tracing::warn!(%err, "skipping malformed event");
    }

    let queue = start_queue(config, folder).await?;
    let mut queued = 0usize;
    let mut reports = Vec::new();
    let mut failed = 0usize;
    for event in batch.events {
        match dispatch(&queue, folder, event).await {
            Ok(Dispatched::Queued) => queued += 1,
            Ok(Dispatched::Checklist(report)) => reports.push(report),
            Err(e) => {
                tracing::error!(error = %e, "event rejected");
                failed += 1;
            }
        }
    }
    queue.wait_idle().await;
    queue.shutdown().await;

    let library = queue.library().lock().await;
    println!("ingest {}", folder);
    println!("  merges processed: {}", queued);
    println!("  checklists imported: {}", reports.len());
    println!("  malformed lines: {}", batch.errors.len());
    if failed > 0 {
        println!("  rejected events: {}", failed);
    }
    let flagged: Vec<&ImportReport> = reports.iter().filter(|r| r.show_log()).collect();
    for report in &flagged {
        let joined: Vec<String> = report.duplicates.iter().map(|i| i.to_string()).collect();
        println!("  duplicate checklist indices: {}", joined.join(", "));
    }
    if !flagged.is_empty() {
        println!();
        println!("Recent errors:");
        for entry in library
            .log_entries(folder, Some(LogCategory::Error), None)
            .iter()
            .take(10)
        {
            println!("  [{}] {}", entry.category, entry.message);
        }
    }
    let progress = library.progress(folder);
    if progress.total > 0 {
        println!(
            "  progress: {}/{} ({:.1}%)",
            progress.done, progress.total, progress.percent
        );
    }
    println!("ok");
    Ok(())
}

/// `chm merge`: queue a single submission and wait for it.
pub async fn run_merge(
    config: &Config,
    title: &str,
    source: Option<&Path>,
    folder: &str,
    no_group: bool,
) -> Result<()> {
    let content = read_input(source)?;
    if clean_content(&content).is_empty() {
        println!("merge {}", title);
        println!("  skipped: empty content");
        return Ok(());
    }

    let queue = start_queue(config, folder).await?;
    let mut task = queue.library().lock().await.task_for(folder, title, &content)?;
    if no_group {
        task.grouping_enabled = false;
    }
    queue.enqueue(task).await;
    queue.wait_idle().await;
    queue.shutdown().await;

    let library = queue.library().lock().await;
    println!("merge {}", title);
    if let Some(entry) = library.log_entries(folder, None, None).first() {
        println!("  [{}] {}", entry.category, entry.message);
        if entry.category == LogCategory::Error {
            bail!("merge failed");
        }
    }
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use crate::events::MergePayload;
    use chapter_merge_core::models::{ChecklistItem, ROOT_COLLECTION};
    use chapter_merge_core::store::memory::InMemoryStore;
    use chapter_merge_core::{Library, LibraryOptions};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    async fn queue() -> MergeQueue {
        let library = Library::load(Arc::new(InMemoryStore::new()), LibraryOptions::default())
            .await
            .unwrap();
        MergeQueue::start(
            Arc::new(Mutex::new(library)),
            &QueueConfig {
                yield_ms: 1,
                heartbeat_ms: 20,
            },
        )
        .await
        .unwrap()
    }

    fn merge(title: &str, content: &str) -> InboundEvent {
        InboundEvent::Merge(MergePayload {
            title: title.into(),
            content: content.into(),
        })
    }

    #[tokio::test]
    async fn test_merge_events_use_folder_grouping() {
        let queue = queue().await;
        let folder = queue
            .library()
            .lock()
            .await
            .create_collection("Flat", Some(false))
            .await
            .unwrap();

        for title in ["Chapter 4.2", "Chapter 4.1"] {
            let d = dispatch(&queue, &folder.id, merge(title, "text")).await.unwrap();
            assert_eq!(d, Dispatched::Queued);
        }
        queue.wait_idle().await;

        let library = queue.library().lock().await;
        let names: Vec<&str> = library
            .documents(&folder.id, None)
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["Chapter 4.1.docx", "Chapter 4.2.docx"]);
        drop(library);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_checklist_event_is_imported() {
        let queue = queue().await;
        let items = vec![
            ChecklistItem {
                index: 1,
                title: "One".into(),
            },
            ChecklistItem {
                index: 1,
                title: "Again".into(),
            },
        ];
        let d = dispatch(&queue, ROOT_COLLECTION, InboundEvent::Checklist(items))
            .await
            .unwrap();
        let Dispatched::Checklist(report) = d else {
            panic!("expected checklist report");
        };
        assert_eq!(report.duplicates, vec![1]);
        assert_eq!(queue.library().lock().await.checklist(ROOT_COLLECTION).len(), 1);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_folder_rejected() {
        let queue = queue().await;
        assert!(dispatch(&queue, "nope", merge("Chapter 1", "x")).await.is_err());
        assert_eq!(queue.outstanding(), 0);
        queue.shutdown().await;
    }
}
