//! Capped per-collection event log.
//!
//! Entries are kept newest first. When a collection exceeds its capacity
//! the oldest entries are evicted and handed back to the caller so they can
//! be removed from the store as well.

use std::collections::{HashMap, VecDeque};

use uuid::Uuid;

use crate::models::{now_millis, LogCategory, LogEntry};

/// Default number of entries retained per collection.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct EventLog {
    capacity: usize,
    entries: HashMap<String, VecDeque<LogEntry>>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
        }
    }

    /// Rebuild from stored entries in any order; returns entries over capacity.
    pub fn from_entries(capacity: usize, mut stored: Vec<LogEntry>) -> (Self, Vec<LogEntry>) {
        let mut log = Self::new(capacity);
        stored.sort_by_key(|e| e.timestamp);
        let mut evicted = Vec::new();
        for entry in stored {
            evicted.extend(log.insert(entry));
        }
        (log, evicted)
    }

    /// Create and append a new entry; returns it with any evicted entries.
    pub fn append(
        &mut self,
        collection_id: &str,
        category: LogCategory,
        message: impl Into<String>,
    ) -> (LogEntry, Vec<LogEntry>) {
        let entry = LogEntry {
            id: Uuid::new_v4().to_string(),
            collection_id: collection_id.to_string(),
            timestamp: now_millis(),
            category,
            message: message.into(),
        };
        let evicted = self.insert(entry.clone());
        (entry, evicted)
    }

    fn insert(&mut self, entry: LogEntry) -> Vec<LogEntry> {
        let queue = self.entries.entry(entry.collection_id.clone()).or_default();
        queue.push_front(entry);
        let mut evicted = Vec::new();
        while queue.len() > self.capacity {
            if let Some(old) = queue.pop_back() {
                evicted.push(old);
            }
        }
        evicted
    }

    /// Newest-first entries for a collection, optionally filtered.
    pub fn entries(
        &self,
        collection_id: &str,
        category: Option<LogCategory>,
        keyword: Option<&str>,
    ) -> Vec<&LogEntry> {
        let keyword = keyword.map(str::to_lowercase);
        self.entries
            .get(collection_id)
            .map(|q| {
                q.iter()
                    .filter(|e| category.map_or(true, |c| e.category == c))
                    .filter(|e| {
                        keyword
                            .as_deref()
                            .map_or(true, |k| e.message.to_lowercase().contains(k))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop every entry of a collection, returning them.
    pub fn clear(&mut self, collection_id: &str) -> Vec<LogEntry> {
        self.entries
            .remove(collection_id)
            .map(Vec::from)
            .unwrap_or_default()
    }

    pub fn len(&self, collection_id: &str) -> usize {
        self.entries.get(collection_id).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let mut log = EventLog::new(10);
        log.append("root", LogCategory::Info, "first");
        log.append("root", LogCategory::Success, "second");
        let entries = log.entries("root", None, None);
        assert_eq!(entries[0].message, "second");
        assert_eq!(entries[1].message, "first");
    }

    #[test]
    fn test_capacity_evicts_oldest_per_collection() {
        let mut log = EventLog::new(2);
        log.append("a", LogCategory::Info, "a1");
        log.append("b", LogCategory::Info, "b1");
        log.append("a", LogCategory::Info, "a2");
        let (_, evicted) = log.append("a", LogCategory::Info, "a3");
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].message, "a1");
        assert_eq!(log.len("a"), 2);
        assert_eq!(log.len("b"), 1);
    }

    #[test]
    fn test_filters() {
        let mut log = EventLog::new(10);
        log.append("root", LogCategory::Error, "Merge failed for Chapter 2");
        log.append("root", LogCategory::Success, "Merged Chapter 3");
        assert_eq!(log.entries("root", Some(LogCategory::Error), None).len(), 1);
        assert_eq!(log.entries("root", None, Some("chapter 3")).len(), 1);
        assert!(log.entries("missing", None, None).is_empty());
    }

    #[test]
    fn test_from_entries_applies_capacity() {
        let stored: Vec<LogEntry> = (0..5)
            .map(|i| LogEntry {
                id: i.to_string(),
                collection_id: "root".into(),
                timestamp: i,
                category: LogCategory::Info,
                message: format!("m{}", i),
            })
            .rev()
            .collect();
        let (log, evicted) = EventLog::from_entries(3, stored);
        let kept: Vec<&str> = log
            .entries("root", None, None)
            .iter()
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(kept, vec!["m4", "m3", "m2"]);
        assert_eq!(evicted.len(), 2);
    }
}
