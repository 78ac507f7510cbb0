//! Storage abstraction for chapter-merge.
//!
//! The [`Store`] trait is the narrow record-store interface the merge
//! pipeline depends on: load everything of one kind, put a record (last
//! write wins), delete a record by id. Backends are pluggable (SQLite,
//! in-memory).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Checklist, Collection, Document, LogEntry};

/// Scratch flag set while a merge is in flight.
pub const BUSY_FLAG: &str = "merge_busy";

/// Abstract record store.
///
/// # Operations
///
/// | Kind | Load | Put | Delete |
/// |------|------|-----|--------|
/// | collections | [`load_collections`](Store::load_collections) | [`put_collection`](Store::put_collection) | [`delete_collection`](Store::delete_collection) |
/// | documents | [`load_documents`](Store::load_documents) | [`put_document`](Store::put_document) | [`delete_document`](Store::delete_document) |
/// | checklists | [`load_checklists`](Store::load_checklists) | [`put_checklist`](Store::put_checklist) | [`delete_checklist`](Store::delete_checklist) |
/// | log entries | [`load_log`](Store::load_log) | [`put_log_entry`](Store::put_log_entry) | [`delete_log_entries`](Store::delete_log_entries) |
/// | scratch flags | [`get_flag`](Store::get_flag) | [`put_flag`](Store::put_flag) | - |
#[async_trait]
pub trait Store: Send + Sync {
    async fn load_collections(&self) -> Result<Vec<Collection>>;
    async fn put_collection(&self, collection: &Collection) -> Result<()>;
    async fn delete_collection(&self, id: &str) -> Result<()>;

    async fn load_documents(&self) -> Result<Vec<Document>>;
    /// Insert or overwrite a document by id.
    async fn put_document(&self, doc: &Document) -> Result<()>;
    async fn delete_document(&self, id: &str) -> Result<()>;

    async fn load_checklists(&self) -> Result<Vec<Checklist>>;
    /// Insert or overwrite the checklist of `checklist.collection_id`.
    async fn put_checklist(&self, checklist: &Checklist) -> Result<()>;
    async fn delete_checklist(&self, collection_id: &str) -> Result<()>;

    async fn load_log(&self) -> Result<Vec<LogEntry>>;
    async fn put_log_entry(&self, entry: &LogEntry) -> Result<()>;
    async fn delete_log_entries(&self, ids: &[String]) -> Result<()>;

    async fn put_flag(&self, key: &str, value: bool) -> Result<()>;
    async fn get_flag(&self, key: &str) -> Result<Option<bool>>;
}
