//! Expected-chapter checklists and duplicate detection.
//!
//! A checklist is an externally supplied list of `{index, title}` items.
//! Completion is never stored: an index is done when some document in the
//! same collection holds a segment whose chapter key equals that index.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::models::{ChecklistItem, Document};

/// How an incoming batch combines with the stored checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecklistPolicy {
    /// The batch replaces the stored list. Indices repeated inside the batch
    /// are reported and only their first occurrence is kept.
    #[default]
    ReplaceAndFlag,
    /// Items whose index is not yet present are appended; the list is
    /// re-sorted by index.
    Additive,
}

impl ChecklistPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "replace" | "replace-and-flag" => Some(ChecklistPolicy::ReplaceAndFlag),
            "additive" | "merge" => Some(ChecklistPolicy::Additive),
            _ => None,
        }
    }
}

/// Result of combining a batch with the stored list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub list: Vec<ChecklistItem>,
    /// Number of batch items that ended up in `list` as new entries.
    pub added: usize,
    /// Indices that appeared more than once inside the batch, ascending.
    pub duplicates: Vec<i64>,
}

/// Combine `incoming` with `existing` under `policy`.
pub fn merge_checklist(
    existing: &[ChecklistItem],
    incoming: Vec<ChecklistItem>,
    policy: ChecklistPolicy,
) -> ImportResult {
    match policy {
        ChecklistPolicy::ReplaceAndFlag => {
            let mut seen = HashSet::new();
            let mut duplicates = BTreeSet::new();
            let mut list = Vec::with_capacity(incoming.len());
            for item in incoming {
                if seen.insert(item.index) {
                    list.push(item);
                } else {
                    duplicates.insert(item.index);
                }
            }
            ImportResult {
                added: list.len(),
                list,
                duplicates: duplicates.into_iter().collect(),
            }
        }
        ChecklistPolicy::Additive => {
            let mut list = existing.to_vec();
            let mut present: HashSet<i64> = list.iter().map(|i| i.index).collect();
            let mut added = 0;
            for item in incoming {
                if present.insert(item.index) {
                    list.push(item);
                    added += 1;
                }
            }
            list.sort_by_key(|i| i.index);
            ImportResult {
                list,
                added,
                duplicates: Vec::new(),
            }
        }
    }
}

/// A checklist item with its computed completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistStatus {
    pub index: i64,
    pub title: String,
    pub done: bool,
}

/// Completion summary for one collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
    pub percent: f64,
}

/// Mark each item done when a document holds a segment with that key.
///
/// `documents` must already be restricted to the checklist's collection.
pub fn checklist_status<'a, I>(list: &[ChecklistItem], documents: I) -> Vec<ChecklistStatus>
where
    I: IntoIterator<Item = &'a Document>,
{
    let docs: Vec<&Document> = documents.into_iter().collect();
    list.iter()
        .map(|item| ChecklistStatus {
            index: item.index,
            title: item.title.clone(),
            done: docs.iter().any(|d| d.contains_key(item.index as f64)),
        })
        .collect()
}

/// Summarize statuses into done / total / percent (zero when empty).
pub fn progress(statuses: &[ChecklistStatus]) -> Progress {
    let total = statuses.len();
    let done = statuses.iter().filter(|s| s.done).count();
    let percent = if total == 0 {
        0.0
    } else {
        done as f64 / total as f64 * 100.0
    };
    Progress {
        done,
        total,
        percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Segment;

    fn item(index: i64) -> ChecklistItem {
        ChecklistItem {
            index,
            title: format!("Chapter {}", index),
        }
    }

    fn doc_with_keys(keys: &[f64]) -> Document {
        Document {
            id: "d".into(),
            collection_id: "root".into(),
            name: "x.docx".into(),
            group_header: "x".into(),
            segments: keys
                .iter()
                .map(|k| Segment {
                    sort_key: *k,
                    lines: vec!["line".into()],
                    source_title: String::new(),
                })
                .collect(),
            word_count: 0,
            updated_at: 0,
            rendered_bytes: Vec::new(),
        }
    }

    #[test]
    fn test_replace_flags_batch_duplicates() {
        let result = merge_checklist(
            &[item(9)],
            vec![item(1), item(2), item(1)],
            ChecklistPolicy::ReplaceAndFlag,
        );
        assert_eq!(result.duplicates, vec![1]);
        assert_eq!(result.list, vec![item(1), item(2)]);
        assert_eq!(result.added, 2);
    }

    #[test]
    fn test_replace_without_duplicates_discards_prior_list() {
        let result = merge_checklist(&[item(9)], vec![item(3), item(1)], ChecklistPolicy::ReplaceAndFlag);
        assert!(result.duplicates.is_empty());
        assert_eq!(result.list, vec![item(3), item(1)]);
    }

    #[test]
    fn test_additive_appends_only_absent_indices() {
        let result = merge_checklist(
            &[item(1), item(3)],
            vec![item(2), item(3), item(2)],
            ChecklistPolicy::Additive,
        );
        assert_eq!(result.list, vec![item(1), item(2), item(3)]);
        assert_eq!(result.added, 1);
        assert!(result.duplicates.is_empty());
    }

    #[test]
    fn test_progress_two_of_three() {
        let list = vec![item(1), item(2), item(3)];
        let doc = doc_with_keys(&[1.0, 2.0]);
        let statuses = checklist_status(&list, [&doc]);
        assert_eq!(
            statuses.iter().map(|s| s.done).collect::<Vec<_>>(),
            vec![true, true, false]
        );
        let p = progress(&statuses);
        assert_eq!((p.done, p.total), (2, 3));
        assert!((p.percent - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_fractional_segment_does_not_complete_integer_index() {
        let doc = doc_with_keys(&[4.5]);
        let statuses = checklist_status(&[item(4)], [&doc]);
        assert!(!statuses[0].done);
    }

    #[test]
    fn test_empty_checklist_progress_is_zero() {
        let p = progress(&[]);
        assert_eq!(p.total, 0);
        assert_eq!(p.percent, 0.0);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(ChecklistPolicy::parse("replace"), Some(ChecklistPolicy::ReplaceAndFlag));
        assert_eq!(ChecklistPolicy::parse("additive"), Some(ChecklistPolicy::Additive));
        assert_eq!(ChecklistPolicy::parse("other"), None);
    }
}
