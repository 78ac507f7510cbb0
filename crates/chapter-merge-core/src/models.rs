//! Core data models used throughout chapter-merge.
//!
//! These types represent the submissions, documents, checklists, and log
//! entries that flow through the merge pipeline and the [`Store`](crate::store::Store).

use serde::{Deserialize, Serialize};

/// Identifier of the collection that always exists.
pub const ROOT_COLLECTION: &str = "root";

/// A single chapter submission waiting to be merged.
///
/// Created per inbound event and consumed exactly once by the merge engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterTask {
    pub collection_id: String,
    pub title: String,
    pub raw_content: String,
    pub grouping_enabled: bool,
}

/// One submitted chapter's lines, owned by exactly one [`Document`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub sort_key: f64,
    pub lines: Vec<String>,
    pub source_title: String,
}

/// The assembled output unit: one DOCX file made of one or more segments.
///
/// `segments` is kept strictly ascending by `sort_key`, and
/// `rendered_bytes` always matches the current segments and header once a
/// merge has completed.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub collection_id: String,
    pub name: String,
    pub group_header: String,
    pub segments: Vec<Segment>,
    pub word_count: usize,
    /// Unix timestamp in milliseconds.
    pub updated_at: i64,
    pub rendered_bytes: Vec<u8>,
}

impl Document {
    /// Returns true if any segment carries exactly this chapter key.
    pub fn contains_key(&self, sort_key: f64) -> bool {
        self.segments.iter().any(|s| s.sort_key == sort_key)
    }
}

/// One expected chapter in a collection's checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    #[serde(alias = "num")]
    pub index: i64,
    pub title: String,
}

/// A collection's stored checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    pub collection_id: String,
    pub list: Vec<ChecklistItem>,
}

/// A named folder grouping documents, a checklist, and a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    /// Whether submissions to this collection are grouped by integer chapter.
    pub grouping: bool,
}

/// Event log category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    Info,
    Success,
    Warn,
    Error,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Info => "info",
            LogCategory::Success => "success",
            LogCategory::Warn => "warn",
            LogCategory::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Some(LogCategory::Info),
            "success" => Some(LogCategory::Success),
            "warn" | "warning" => Some(LogCategory::Warn),
            "error" => Some(LogCategory::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only record of a merge, checklist, or failure event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub collection_id: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    pub category: LogCategory,
    pub message: String,
}

/// Current wall-clock time as unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
