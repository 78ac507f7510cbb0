//! Inbound submission events.
//!
//! Producers deliver two kinds of event, adjacently tagged:
//!
//! ```json
//! {"type": "MERGE", "payload": {"title": "Chapter 12.1", "content": "..."}}
//! {"type": "CHECKLIST", "payload": [{"index": 1, "title": "Prologue"}]}
//! ```
//!
//! Checklist items may use the older `num` key in place of `index`.
//! A batch of events is read as JSON lines; blank lines are ignored and
//! malformed lines are reported with their 1-based line number.

use serde::{Deserialize, Serialize};

use chapter_merge_core::models::ChecklistItem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum InboundEvent {
    #[serde(rename = "MERGE")]
    Merge(MergePayload),
    #[serde(rename = "CHECKLIST")]
    Checklist(Vec<ChecklistItem>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePayload {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// A line that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Decoded events in input order, plus the lines that failed.
#[derive(Debug, Default)]
pub struct EventBatch {
    pub events: Vec<InboundEvent>,
    pub errors: Vec<LineError>,
}

/// Decode a JSON-lines document.
pub fn parse_jsonl(input: &str) -> EventBatch {
    let mut batch = EventBatch::default();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<InboundEvent>(line) {
            Ok(event) => batch.events.push(event),
            Err(e) => batch.errors.push(LineError {
                line: i + 1,
                message: e.to_string(),
            }),
        }
    }
    batch
}
