//! The library service: owner of all in-memory state.
//!
//! [`Library`] holds the collections, documents, checklists, and event log
//! loaded from a [`Store`], and is the only place they are mutated. Every
//! mutation is applied in memory first, so a task merged right after
//! another sees its result, and then written through to the store.
//!
//! ## Merge flow
//!
//! ```text
//! ChapterTask ─▶ parse_title ─▶ NamingPolicy::resolve ─▶ find (collection, name)
//!                                                          │
//!                       ┌──────────── not found ───────────┤
//!                       ▼                                  ▼ found
//!              new Document + Segment            upsert_segment (insert | replace)
//!                       │                                  │
//!                       └──────▶ refresh_document ◀────────┘
//!                                      │
//!                              Store::put_document ─▶ EventLog
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use uuid::Uuid;

use crate::checklist::{self, ChecklistPolicy, ChecklistStatus, Progress};
use crate::log::{EventLog, DEFAULT_LOG_CAPACITY};
use crate::merge::{clean_content, refresh_document, upsert_segment, MergeOutcome, SegmentChange};
use crate::models::{
    ChapterTask, Checklist, ChecklistItem, Collection, Document, LogCategory, LogEntry, Segment,
    ROOT_COLLECTION,
};
use crate::naming::NamingPolicy;
use crate::store::Store;
use crate::title::{chapter_order, parse_title};

/// Display name of the root collection.
pub const ROOT_COLLECTION_NAME: &str = "Main folder";

/// Static behavior of a [`Library`].
#[derive(Debug, Clone)]
pub struct LibraryOptions {
    pub naming: NamingPolicy,
    pub checklist_policy: ChecklistPolicy,
    pub log_capacity: usize,
    /// Grouping applied to newly created collections.
    pub default_grouping: bool,
}

impl Default for LibraryOptions {
    fn default() -> Self {
        Self {
            naming: NamingPolicy::default(),
            checklist_policy: ChecklistPolicy::default(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            default_grouping: true,
        }
    }
}

/// Outcome of a checklist import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub received: usize,
    pub added: usize,
    pub total: usize,
    pub duplicates: Vec<i64>,
}

impl ImportReport {
    /// Duplicates were found; the caller should surface the event log.
    pub fn show_log(&self) -> bool {
        !self.duplicates.is_empty()
    }
}

pub struct Library {
    store: Arc<dyn Store>,
    options: LibraryOptions,
    collections: Vec<Collection>,
    documents: Vec<Document>,
    checklists: HashMap<String, Vec<ChecklistItem>>,
    log: EventLog,
}

impl Library {
    /// Load all state from `store`, creating the root collection if missing.
    pub async fn load(store: Arc<dyn Store>, options: LibraryOptions) -> Result<Self> {
        let mut collections = store.load_collections().await?;
        if !collections.iter().any(|c| c.id == ROOT_COLLECTION) {
            let root = Collection {
                id: ROOT_COLLECTION.to_string(),
                name: ROOT_COLLECTION_NAME.to_string(),
                grouping: options.default_grouping,
            };
            store.put_collection(&root).await?;
            collections.insert(0, root);
        }

        let documents = store.load_documents().await?;
        let checklists = store
            .load_checklists()
            .await?
            .into_iter()
            .map(|c| (c.collection_id, c.list))
            .collect();

        let (log, evicted) = EventLog::from_entries(options.log_capacity, store.load_log().await?);
        if !evicted.is_empty() {
            let ids: Vec<String> = evicted.into_iter().map(|e| e.id).collect();
            if let Err(e) = store.delete_log_entries(&ids).await {
                tracing::warn!(error = %e, "failed to prune event log");
            }
        }

        tracing::debug!(
            collections = collections.len(),
            documents = documents.len(),
            "library loaded"
        );

        Ok(Self {
            store,
            options,
            collections,
            documents,
            checklists,
            log,
        })
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    // ============ Collections ============

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn collection(&self, id: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.id == id)
    }

    fn require_collection(&self, id: &str) -> Result<&Collection> {
        match self.collection(id) {
            Some(c) => Ok(c),
            None => bail!("collection not found: {}", id),
        }
    }

    pub async fn create_collection(&mut self, name: &str, grouping: Option<bool>) -> Result<Collection> {
        let name = name.trim();
        if name.is_empty() {
            bail!("collection name must not be empty");
        }
        let collection = Collection {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            grouping: grouping.unwrap_or(self.options.default_grouping),
        };
        self.store.put_collection(&collection).await?;
        self.collections.push(collection.clone());
        Ok(collection)
    }

    /// Delete a collection with its documents, checklist, and log.
    pub async fn delete_collection(&mut self, id: &str) -> Result<()> {
        if id == ROOT_COLLECTION {
            bail!("the root collection cannot be deleted");
        }
        self.require_collection(id)?;

        let doc_ids: Vec<String> = self
            .documents
            .iter()
            .filter(|d| d.collection_id == id)
            .map(|d| d.id.clone())
            .collect();
        self.delete_documents(&doc_ids).await?;
        self.clear_checklist(id).await?;
        self.clear_log(id).await?;

        self.store.delete_collection(id).await?;
        self.collections.retain(|c| c.id != id);
        Ok(())
    }

    /// Build a task using the collection's grouping setting.
    pub fn task_for(&self, collection_id: &str, title: &str, content: &str) -> Result<ChapterTask> {
        let collection = self.require_collection(collection_id)?;
        Ok(ChapterTask {
            collection_id: collection.id.clone(),
            title: title.to_string(),
            raw_content: content.to_string(),
            grouping_enabled: collection.grouping,
        })
    }

    // ============ Merge engine ============

    /// Merge one chapter submission into its target document.
    ///
    /// Empty or whitespace-only content is a silent no-op.
    pub async fn merge(&mut self, task: &ChapterTask) -> Result<MergeOutcome> {
        let lines = clean_content(&task.raw_content);
        if lines.is_empty() {
            tracing::debug!(title = %task.title, "skipping empty submission");
            return Ok(MergeOutcome::Skipped);
        }
        self.require_collection(&task.collection_id)?;

        let parsed = parse_title(&task.title);
        let target = self
            .options
            .naming
            .resolve(&task.title, &parsed, task.grouping_enabled);
        let segment = Segment {
            sort_key: parsed.sort_key(),
            lines,
            source_title: task.title.clone(),
        };

        let existing = self
            .documents
            .iter()
            .position(|d| d.collection_id == task.collection_id && d.name == target.file_name);

        let (index, outcome, category, message) = match existing {
            None => {
                let mut doc = Document {
                    id: Uuid::new_v4().to_string(),
                    collection_id: task.collection_id.clone(),
                    name: target.file_name.clone(),
                    group_header: target.header,
                    segments: vec![segment],
                    word_count: 0,
                    updated_at: 0,
                    rendered_bytes: Vec::new(),
                };
                refresh_document(&mut doc)?;
                let outcome = MergeOutcome::Created {
                    document_id: doc.id.clone(),
                    name: doc.name.clone(),
                };
                self.documents.push(doc);
                (
                    self.documents.len() - 1,
                    outcome,
                    LogCategory::Info,
                    format!("Created {}", target.file_name),
                )
            }
            Some(index) => {
                let doc = &mut self.documents[index];
                let change = upsert_segment(&mut doc.segments, segment);
                refresh_document(doc)?;
                let (document_id, name) = (doc.id.clone(), doc.name.clone());
                match change {
                    SegmentChange::Replaced => (
                        index,
                        MergeOutcome::Updated { document_id, name },
                        LogCategory::Warn,
                        format!("Updated {} in {}", task.title, target.file_name),
                    ),
                    SegmentChange::Inserted => (
                        index,
                        MergeOutcome::Appended { document_id, name },
                        LogCategory::Success,
                        format!("Merged {} into {}", task.title, target.file_name),
                    ),
                }
            }
        };

        self.store.put_document(&self.documents[index]).await?;
        self.append_log(&task.collection_id, category, message).await;
        Ok(outcome)
    }

    /// Record a failed task in the event log.
    pub async fn record_failure(&mut self, collection_id: &str, message: &str) {
        self.append_log(collection_id, LogCategory::Error, message.to_string())
            .await;
    }

    // ============ Documents ============

    /// Documents of a collection, name-filtered, in chapter order of their names.
    pub fn documents(&self, collection_id: &str, keyword: Option<&str>) -> Vec<&Document> {
        let keyword = keyword
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty());
        let mut docs: Vec<&Document> = self
            .documents
            .iter()
            .filter(|d| d.collection_id == collection_id)
            .filter(|d| {
                keyword
                    .as_deref()
                    .map_or(true, |k| d.name.to_lowercase().contains(k))
            })
            .collect();
        docs.sort_by(|a, b| chapter_order(&a.name, &b.name));
        docs
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Delete documents by id; unknown ids are ignored. Returns the count removed.
    pub async fn delete_documents(&mut self, ids: &[String]) -> Result<usize> {
        let mut removed = 0;
        for id in ids {
            if self.document(id).is_none() {
                continue;
            }
            self.store.delete_document(id).await?;
            self.documents.retain(|d| &d.id != id);
            removed += 1;
        }
        Ok(removed)
    }

    // ============ Checklist ============

    /// Import a checklist batch under the configured policy.
    ///
    /// Duplicate indices in the batch are logged as an error; the stored
    /// list never holds an index twice.
    pub async fn import_checklist(
        &mut self,
        collection_id: &str,
        items: Vec<ChecklistItem>,
    ) -> Result<ImportReport> {
        self.require_collection(collection_id)?;
        let received = items.len();
        let existing = self.checklist(collection_id).to_vec();
        let result = checklist::merge_checklist(&existing, items, self.options.checklist_policy);

        let stored = Checklist {
            collection_id: collection_id.to_string(),
            list: result.list,
        };
        self.store.put_checklist(&stored).await?;
        let total = stored.list.len();
        self.checklists.insert(stored.collection_id, stored.list);

        if result.duplicates.is_empty() {
            self.append_log(
                collection_id,
                LogCategory::Success,
                format!("Imported checklist: {} items ({} new)", received, result.added),
            )
            .await;
        } else {
            let joined = result
                .duplicates
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            self.append_log(
                collection_id,
                LogCategory::Error,
                format!("Duplicate chapter indices in checklist: {}", joined),
            )
            .await;
        }

        Ok(ImportReport {
            received,
            added: result.added,
            total,
            duplicates: result.duplicates,
        })
    }

    pub async fn clear_checklist(&mut self, collection_id: &str) -> Result<()> {
        self.store.delete_checklist(collection_id).await?;
        self.checklists.remove(collection_id);
        Ok(())
    }

    pub fn checklist(&self, collection_id: &str) -> &[ChecklistItem] {
        self.checklists
            .get(collection_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn checklist_status(&self, collection_id: &str) -> Vec<ChecklistStatus> {
        checklist::checklist_status(
            self.checklist(collection_id),
            self.documents.iter().filter(|d| d.collection_id == collection_id),
        )
    }

    pub fn progress(&self, collection_id: &str) -> Progress {
        checklist::progress(&self.checklist_status(collection_id))
    }

    // ============ Event log ============

    pub fn log_entries(
        &self,
        collection_id: &str,
        category: Option<LogCategory>,
        keyword: Option<&str>,
    ) -> Vec<&LogEntry> {
        self.log.entries(collection_id, category, keyword)
    }

    pub async fn clear_log(&mut self, collection_id: &str) -> Result<()> {
        let ids: Vec<String> = self.log.clear(collection_id).into_iter().map(|e| e.id).collect();
        if !ids.is_empty() {
            self.store.delete_log_entries(&ids).await?;
        }
        Ok(())
    }

    /// Append to the event log. Store failures are traced, not propagated.
    async fn append_log(&mut self, collection_id: &str, category: LogCategory, message: String) {
        match category {
            LogCategory::Error => tracing::error!(collection = collection_id, "{}", message),
            LogCategory::Warn => tracing::warn!(collection = collection_id, "{}", message),
            _ => tracing::info!(collection = collection_id, "{}", message),
        }

        let (entry, evicted) = self.log.append(collection_id, category, message);
        if let Err(e) = self.store.put_log_entry(&entry).await {
            tracing::warn!(error = %e, "failed to persist log entry");
        }
        if !evicted.is_empty() {
            let ids: Vec<String> = evicted.into_iter().map(|e| e.id).collect();
            if let Err(e) = self.store.delete_log_entries(&ids).await {
                tracing::warn!(error = %e, "failed to evict log entries");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    async fn library() -> Library {
        Library::load(Arc::new(InMemoryStore::new()), LibraryOptions::default())
            .await
            .unwrap()
    }

    fn task(title: &str, content: &str, grouping: bool) -> ChapterTask {
        ChapterTask {
            collection_id: ROOT_COLLECTION.to_string(),
            title: title.to_string(),
            raw_content: content.to_string(),
            grouping_enabled: grouping,
        }
    }

    fn item(index: i64) -> ChecklistItem {
        ChecklistItem {
            index,
            title: format!("Chapter {}", index),
        }
    }

    #[tokio::test]
    async fn test_load_creates_root_collection() {
        let store = Arc::new(InMemoryStore::new());
        let lib = Library::load(store.clone(), LibraryOptions::default()).await.unwrap();
        assert!(lib.collection(ROOT_COLLECTION).is_some());
        assert_eq!(store.load_collections().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_content_is_a_silent_noop() {
        let mut lib = library().await;
        let outcome = lib.merge(&task("Chapter 1", "  \n\t ", false)).await.unwrap();
        assert_eq!(outcome, MergeOutcome::Skipped);
        assert!(lib.documents(ROOT_COLLECTION, None).is_empty());
        assert!(lib.log_entries(ROOT_COLLECTION, None, None).is_empty());
    }

    #[tokio::test]
    async fn test_resubmission_replaces_content() {
        let mut lib = library().await;
        let first = lib.merge(&task("Chapter 1", "old words here", false)).await.unwrap();
        let second = lib.merge(&task("Chapter 1", "new text", false)).await.unwrap();
        assert!(matches!(first, MergeOutcome::Created { .. }));
        assert!(matches!(second, MergeOutcome::Updated { .. }));
        assert_eq!(first.document_id(), second.document_id());

        let docs = lib.documents(ROOT_COLLECTION, None);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "Chapter 1.docx");
        assert_eq!(docs[0].segments.len(), 1);
        assert_eq!(docs[0].segments[0].lines, vec!["new text"]);
        // "Chapter 1" + "new text"
        assert_eq!(docs[0].word_count, 4);

        let log = lib.log_entries(ROOT_COLLECTION, None, None);
        assert_eq!(log[0].category, LogCategory::Warn);
        assert_eq!(log[1].category, LogCategory::Info);
    }

    #[tokio::test]
    async fn test_out_of_order_sub_chapters_sorted() {
        let mut lib = library().await;
        for title in ["Chapter 1.2", "Chapter 1", "Chapter 1.1"] {
            lib.merge(&task(title, title, true)).await.unwrap();
        }
        let docs = lib.documents(ROOT_COLLECTION, None);
        assert_eq!(docs.len(), 1);
        let keys: Vec<f64> = docs[0].segments.iter().map(|s| s.sort_key).collect();
        assert_eq!(keys, vec![1.0, 1.1, 1.2]);
    }

    #[tokio::test]
    async fn test_grouping_merges_into_one_document() {
        let mut lib = library().await;
        lib.merge(&task("Chapter 3.2", "second part", true)).await.unwrap();
        let outcome = lib.merge(&task("Chapter 3.1", "first part", true)).await.unwrap();
        assert!(matches!(outcome, MergeOutcome::Appended { .. }));

        let docs = lib.documents(ROOT_COLLECTION, None);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "Chapter 3.docx");
        assert_eq!(docs[0].group_header, "Chapter 3");
        assert_eq!(docs[0].segments[0].lines, vec!["first part"]);
        assert_eq!(docs[0].segments[1].lines, vec!["second part"]);
        assert_eq!(
            docs[0].rendered_bytes,
            crate::assemble::assemble_document("Chapter 3", &docs[0].segments).unwrap()
        );
    }

    #[tokio::test]
    async fn test_merge_persists_to_store() {
        let store = Arc::new(InMemoryStore::new());
        let mut lib = Library::load(store.clone(), LibraryOptions::default()).await.unwrap();
        lib.merge(&task("Chapter 5", "body", true)).await.unwrap();
        lib.merge(&task("Chapter 5.5", "more", true)).await.unwrap();

        let stored = store.load_documents().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].segments.len(), 2);
        assert_eq!(store.load_log().await.unwrap().len(), 2);

        let reloaded = Library::load(store, LibraryOptions::default()).await.unwrap();
        assert_eq!(reloaded.documents(ROOT_COLLECTION, None).len(), 1);
        assert_eq!(reloaded.log_entries(ROOT_COLLECTION, None, None).len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_an_error() {
        let mut lib = library().await;
        let mut t = task("Chapter 1", "x", false);
        t.collection_id = "nope".into();
        assert!(lib.merge(&t).await.is_err());
    }

    #[tokio::test]
    async fn test_documents_listed_in_chapter_order() {
        let mut lib = library().await;
        for title in ["Chapter 10", "Afterword", "Chapter 2"] {
            lib.merge(&task(title, "text", true)).await.unwrap();
        }
        let names: Vec<&str> = lib
            .documents(ROOT_COLLECTION, None)
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["Chapter 2.docx", "Chapter 10.docx", "Afterword.docx"]);
        assert_eq!(lib.documents(ROOT_COLLECTION, Some("after")).len(), 1);
    }

    #[tokio::test]
    async fn test_import_flags_duplicates_and_keeps_unique_list() {
        let mut lib = library().await;
        let report = lib
            .import_checklist(ROOT_COLLECTION, vec![item(1), item(2), item(1)])
            .await
            .unwrap();
        assert_eq!(report.duplicates, vec![1]);
        assert!(report.show_log());
        assert_eq!(lib.checklist(ROOT_COLLECTION).len(), 2);

        let errors = lib.log_entries(ROOT_COLLECTION, Some(LogCategory::Error), None);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains('1'));
    }

    #[tokio::test]
    async fn test_progress_tracks_segments() {
        let mut lib = library().await;
        lib.import_checklist(ROOT_COLLECTION, vec![item(1), item(2), item(3)])
            .await
            .unwrap();
        lib.merge(&task("Chapter 1", "a", false)).await.unwrap();
        lib.merge(&task("Chapter 2.0", "b", false)).await.unwrap();
        let progress = lib.progress(ROOT_COLLECTION);
        assert_eq!((progress.done, progress.total), (2, 3));
    }

    #[tokio::test]
    async fn test_collection_lifecycle() {
        let mut lib = library().await;
        let coll = lib.create_collection("Novel", Some(false)).await.unwrap();
        let t = lib.task_for(&coll.id, "Chapter 1.1", "x").unwrap();
        assert!(!t.grouping_enabled);
        lib.merge(&t).await.unwrap();
        lib.import_checklist(&coll.id, vec![item(1)]).await.unwrap();
        assert_eq!(lib.documents(&coll.id, None)[0].name, "Chapter 1.1.docx");

        lib.delete_collection(&coll.id).await.unwrap();
        assert!(lib.collection(&coll.id).is_none());
        assert!(lib.documents(&coll.id, None).is_empty());
        assert!(lib.checklist(&coll.id).is_empty());
        assert!(lib.delete_collection(ROOT_COLLECTION).await.is_err());
    }

    #[tokio::test]
    async fn test_log_capacity_applies_per_collection() {
        let options = LibraryOptions {
            log_capacity: 2,
            ..LibraryOptions::default()
        };
        let store = Arc::new(InMemoryStore::new());
        let mut lib = Library::load(store.clone(), options).await.unwrap();
        for i in 1..=4 {
            lib.merge(&task(&format!("Chapter {}", i), "x", false)).await.unwrap();
        }
        assert_eq!(lib.log_entries(ROOT_COLLECTION, None, None).len(), 2);
        assert_eq!(store.load_log().await.unwrap().len(), 2);
    }
}
