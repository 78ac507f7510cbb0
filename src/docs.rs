//! Document listing, preview, and deletion.
//!
//! Shared by the `chm docs` commands and the HTTP document endpoints.

use anyhow::{bail, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

use chapter_merge_core::models::Document;

use crate::config::Config;
use crate::db;
use crate::extract::extract_paragraphs;

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub group_header: String,
    pub segments: usize,
    pub word_count: usize,
    pub updated_at: String, // ISO8601
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentInfo {
    pub sort_key: f64,
    pub source_title: String,
    pub lines: usize,
}

/// Full view of one document, including the text read back from its DOCX.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub summary: DocumentSummary,
    pub collection_id: String,
    pub sha256: String,
    pub segment_list: Vec<SegmentInfo>,
    pub preview: Vec<String>,
}

fn format_ts(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

pub fn summarize(doc: &Document) -> DocumentSummary {
    DocumentSummary {
        id: doc.id.clone(),
        name: doc.name.clone(),
        group_header: doc.group_header.clone(),
        segments: doc.segments.len(),
        word_count: doc.word_count,
        updated_at: format_ts(doc.updated_at),
        size_bytes: doc.rendered_bytes.len(),
    }
}

pub fn detail(doc: &Document) -> Result<DocumentDetail> {
    let preview = extract_paragraphs(&doc.rendered_bytes)?;
    Ok(DocumentDetail {
        summary: summarize(doc),
        collection_id: doc.collection_id.clone(),
        sha256: hex::encode(Sha256::digest(&doc.rendered_bytes)),
        segment_list: doc
            .segments
            .iter()
            .map(|s| SegmentInfo {
                sort_key: s.sort_key,
                source_title: s.source_title.clone(),
                lines: s.lines.len(),
            })
            .collect(),
        preview,
    })
}

/// `chm docs list`
pub async fn run_docs_list(config: &Config, folder: &str, keyword: Option<&str>) -> Result<()> {
    let library = db::open_library(config).await?;
    if library.collection(folder).is_none() {
        bail!("folder not found: {}", folder);
    }
    let docs = library.documents(folder, keyword);
    if docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for doc in docs {
        let s = summarize(doc);
        println!(
            "{}  {}  ({} segments, {} words)",
            s.id, s.name, s.segments, s.word_count
        );
    }
    Ok(())
}

/// `chm docs show`
pub async fn run_docs_show(config: &Config, id: &str) -> Result<()> {
    let library = db::open_library(config).await?;
    let Some(doc) = library.document(id) else {
        bail!("document not found: {}", id);
    };
    let d = detail(doc)?;

    println!("--- {} ---", d.summary.name);
    println!("id:         {}", d.summary.id);
    println!("folder:     {}", d.collection_id);
    println!("header:     {}", d.summary.group_header);
    println!("words:      {}", d.summary.word_count);
    println!("updated:    {}", d.summary.updated_at);
    println!("size:       {} bytes", d.summary.size_bytes);
    println!("sha256:     {}", d.sha256);
    println!("segments:");
    for seg in &d.segment_list {
        println!(
            "  {:>10}  {} ({} lines)",
            seg.sort_key, seg.source_title, seg.lines
        );
    }
    println!();
    for paragraph in &d.preview {
        println!("{}", paragraph);
    }
    Ok(())
}

/// `chm docs delete`
pub async fn run_docs_delete(config: &Config, ids: &[String]) -> Result<()> {
    let mut library = db::open_library(config).await?;
    let removed = library.delete_documents(ids).await?;
    println!("Deleted {} of {} documents", removed, ids.len());
    Ok(())
}
