//! `chm log` commands.

use anyhow::{bail, Result};

use chapter_merge_core::models::LogCategory;

use crate::config::Config;
use crate::db;

pub async fn run_log_show(
    config: &Config,
    folder: &str,
    category: Option<&str>,
    keyword: Option<&str>,
) -> Result<()> {
    let category = match category {
        Some(c) => match LogCategory::parse(c) {
            Some(c) => Some(c),
            None => bail!(
                "Unknown log category: '{}'. Must be info, success, warn, or error.",
                c
            ),
        },
        None => None,
    };

    let library = db::open_library(config).await?;
    let entries = library.log_entries(folder, category, keyword);
    if entries.is_empty() {
        println!("No log entries.");
    }
    for entry in entries {
        let ts = chrono::DateTime::from_timestamp_millis(entry.timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        println!("{}  {:<7}  {}", ts, entry.category.as_str(), entry.message);
    }
    Ok(())
}

pub async fn run_log_clear(config: &Config, folder: &str) -> Result<()> {
    let mut library = db::open_library(config).await?;
    library.clear_log(folder).await?;
    println!("Cleared log for {}", folder);
    Ok(())
}
