//! Segment reconciliation and derived-field recomputation.
//!
//! These are the building blocks the [`Library`](crate::library::Library)
//! uses to merge a chapter into a document: cleaning raw text into lines,
//! upserting a segment by chapter key, and regenerating the word count and
//! rendered DOCX bytes after every mutation.

use anyhow::Result;

use crate::assemble::assemble_document;
use crate::models::{now_millis, Document, Segment};

/// What happened to a document when a task was merged into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Empty content; nothing was created or changed.
    Skipped,
    /// A new document was created with a single segment.
    Created { document_id: String, name: String },
    /// A new segment was added to an existing document.
    Appended { document_id: String, name: String },
    /// An existing segment with the same chapter key had its lines replaced.
    Updated { document_id: String, name: String },
}

impl MergeOutcome {
    pub fn document_id(&self) -> Option<&str> {
        match self {
            MergeOutcome::Skipped => None,
            MergeOutcome::Created { document_id, .. }
            | MergeOutcome::Appended { document_id, .. }
            | MergeOutcome::Updated { document_id, .. } => Some(document_id),
        }
    }
}

/// How [`upsert_segment`] changed the segment list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentChange {
    Inserted,
    Replaced,
}

/// Split raw text into trimmed, non-empty lines.
pub fn clean_content(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whitespace-delimited token count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Word count of the header plus every line of every segment.
pub fn document_word_count(header: &str, segments: &[Segment]) -> usize {
    count_words(header)
        + segments
            .iter()
            .flat_map(|s| s.lines.iter())
            .map(|l| count_words(l))
            .sum::<usize>()
}

/// Insert a segment or replace the lines of the one with the same key,
/// then restore ascending key order.
pub fn upsert_segment(segments: &mut Vec<Segment>, segment: Segment) -> SegmentChange {
    let change = match segments.iter_mut().find(|s| s.sort_key == segment.sort_key) {
        Some(existing) => {
            existing.lines = segment.lines;
            existing.source_title = segment.source_title;
            SegmentChange::Replaced
        }
        None => {
            segments.push(segment);
            SegmentChange::Inserted
        }
    };
    segments.sort_by(|a, b| a.sort_key.total_cmp(&b.sort_key));
    change
}

/// Recompute word count, timestamp, and rendered bytes from the current
/// header and segments.
pub fn refresh_document(doc: &mut Document) -> Result<()> {
    doc.word_count = document_word_count(&doc.group_header, &doc.segments);
    doc.rendered_bytes = assemble_document(&doc.group_header, &doc.segments)?;
    doc.updated_at = now_millis();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(key: f64, lines: &[&str]) -> Segment {
        Segment {
            sort_key: key,
            lines: lines.iter().map(|l| l.to_string()).collect(),
            source_title: format!("Chapter {}", key),
        }
    }

    #[test]
    fn test_clean_content_trims_and_drops_blank_lines() {
        let lines = clean_content("  first  \n\n\t\nsecond\r\n   third");
        assert_eq!(lines, vec!["first", "second", "third"]);
        assert!(clean_content("   \n  ").is_empty());
    }

    #[test]
    fn test_word_count_includes_header() {
        let segments = vec![segment(1.0, &["Hello world.", "Second line here."])];
        assert_eq!(document_word_count("Chapter 1", &segments), 7);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_upsert_orders_out_of_order_keys() {
        let mut segments = Vec::new();
        upsert_segment(&mut segments, segment(2.0, &["b"]));
        upsert_segment(&mut segments, segment(1.0, &["a"]));
        upsert_segment(&mut segments, segment(1.5, &["ab"]));
        let keys: Vec<f64> = segments.iter().map(|s| s.sort_key).collect();
        assert_eq!(keys, vec![1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_upsert_replaces_same_key() {
        let mut segments = vec![segment(1.0, &["old"]), segment(2.0, &["two"])];
        let change = upsert_segment(&mut segments, segment(1.0, &["new", "lines"]));
        assert_eq!(change, SegmentChange::Replaced);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].lines, vec!["new", "lines"]);
    }

    #[test]
    fn test_refresh_document_recomputes_fields() {
        let mut doc = Document {
            id: "d1".into(),
            collection_id: "root".into(),
            name: "Chapter 1.docx".into(),
            group_header: "Chapter 1".into(),
            segments: vec![segment(1.0, &["one two three"])],
            word_count: 0,
            updated_at: 0,
            rendered_bytes: Vec::new(),
        };
        refresh_document(&mut doc).unwrap();
        assert_eq!(doc.word_count, 5);
        assert!(!doc.rendered_bytes.is_empty());
        assert!(doc.updated_at > 0);
        assert_eq!(
            doc.rendered_bytes,
            assemble_document(&doc.group_header, &doc.segments).unwrap()
        );
    }
}
