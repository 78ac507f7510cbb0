//! `chm checklist` commands: import, show, clear.
//!
//! An import file holds either a JSON array of `{index, title}` items or a
//! whole `CHECKLIST` event.

use std::path::Path;

use anyhow::{bail, Context, Result};

use chapter_merge_core::models::{ChecklistItem, LogCategory};

use crate::config::Config;
use crate::db;
use crate::events::InboundEvent;
use crate::ingest::read_input;

/// Decode checklist items from an array or a `CHECKLIST` event.
pub fn parse_checklist(input: &str) -> Result<Vec<ChecklistItem>> {
    if let Ok(items) = serde_json::from_str::<Vec<ChecklistItem>>(input) {
        return Ok(items);
    }
    match serde_json::from_str::<InboundEvent>(input)
        .context("expected a JSON array of checklist items or a CHECKLIST event")?
    {
        InboundEvent::Checklist(items) => Ok(items),
        InboundEvent::Merge(_) => bail!("expected a CHECKLIST event, got MERGE"),
    }
}

pub async fn run_checklist_import(config: &Config, source: Option<&Path>, folder: &str) -> Result<()> {
    let items = parse_checklist(&read_input(source)?)?;
    let mut library = db::open_library(config).await?;
    let report = library.import_checklist(folder, items).await?;

    println!("checklist import {}", folder);
    println!("  received: {}", report.received);
    println!("  new: {}", report.added);
    println!("  total: {}", report.total);
    if report.show_log() {
        let joined: Vec<String> = report.duplicates.iter().map(|i| i.to_string()).collect();
        println!("  duplicate indices: {}", joined.join(", "));
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
    Ok(())
}

pub async fn run_checklist_show(config: &Config, folder: &str, pending_only: bool) -> Result<()> {
    let library = db::open_library(config).await?;
    if library.collection(folder).is_none() {
        bail!("folder not found: {}", folder);
    }
    for status in library.checklist_status(folder) {
        if pending_only && status.done {
            continue;
        }
        let mark = if status.done { "x" } else { " " };
        println!("[{}] {:>5}  {}", mark, status.index, status.title);
    }
    let progress = library.progress(folder);
    println!(
        "{}/{} done ({:.1}%)",
        progress.done, progress.total, progress.percent
    );
    Ok(())
}

pub async fn run_checklist_clear(config: &Config, folder: &str) -> Result<()> {
    let mut library = db::open_library(config).await?;
    library.clear_checklist(folder).await?;
    println!("Cleared checklist for {}", folder);
    Ok(())
}
