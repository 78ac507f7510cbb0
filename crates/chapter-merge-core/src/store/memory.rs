//! In-memory [`Store`] implementation for testing and embedding.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Checklist, Collection, Document, LogEntry};

use super::Store;

/// In-memory store. Documents and collections keep insertion order.
pub struct InMemoryStore {
    collections: RwLock<Vec<Collection>>,
    documents: RwLock<Vec<Document>>,
    checklists: RwLock<HashMap<String, Checklist>>,
    log: RwLock<Vec<LogEntry>>,
    flags: RwLock<HashMap<String, bool>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(Vec::new()),
            documents: RwLock::new(Vec::new()),
            checklists: RwLock::new(HashMap::new()),
            log: RwLock::new(Vec::new()),
            flags: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn load_collections(&self) -> Result<Vec<Collection>> {
        Ok(self.collections.read().unwrap().clone())
    }

    async fn put_collection(&self, collection: &Collection) -> Result<()> {
        let mut stored = self.collections.write().unwrap();
        match stored.iter_mut().find(|c| c.id == collection.id) {
            Some(existing) => *existing = collection.clone(),
            None => stored.push(collection.clone()),
        }
        Ok(())
    }

    async fn delete_collection(&self, id: &str) -> Result<()> {
        self.collections.write().unwrap().retain(|c| c.id != id);
        Ok(())
    }

    async fn load_documents(&self) -> Result<Vec<Document>> {
        Ok(self.documents.read().unwrap().clone())
    }

    async fn put_document(&self, doc: &Document) -> Result<()> {
        let mut stored = self.documents.write().unwrap();
        match stored.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc.clone(),
            None => stored.push(doc.clone()),
        }
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        self.documents.write().unwrap().retain(|d| d.id != id);
        Ok(())
    }

    async fn load_checklists(&self) -> Result<Vec<Checklist>> {
        Ok(self.checklists.read().unwrap().values().cloned().collect())
    }

    async fn put_checklist(&self, checklist: &Checklist) -> Result<()> {
        self.checklists
            .write()
            .unwrap()
            .insert(checklist.collection_id.clone(), checklist.clone());
        Ok(())
    }

    async fn delete_checklist(&self, collection_id: &str) -> Result<()> {
        self.checklists.write().unwrap().remove(collection_id);
        Ok(())
    }

    async fn load_log(&self) -> Result<Vec<LogEntry>> {
        Ok(self.log.read().unwrap().clone())
    }

    async fn put_log_entry(&self, entry: &LogEntry) -> Result<()> {
        self.log.write().unwrap().push(entry.clone());
        Ok(())
    }

    async fn delete_log_entries(&self, ids: &[String]) -> Result<()> {
        self.log.write().unwrap().retain(|e| !ids.contains(&e.id));
        Ok(())
    }

    async fn put_flag(&self, key: &str, value: bool) -> Result<()> {
        self.flags.write().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn get_flag(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.flags.read().unwrap().get(key).copied())
    }
}
