//! `chm folders` commands.

use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_folders_list(config: &Config) -> Result<()> {
    let library = db::open_library(config).await?;
    for c in library.collections() {
        let docs = library.documents(&c.id, None).len();
        let progress = library.progress(&c.id);
        println!(
            "{}  {}  grouping={}  documents={}  checklist={}/{}",
            c.id, c.name, c.grouping, docs, progress.done, progress.total
        );
    }
    Ok(())
}

pub async fn run_folders_create(config: &Config, name: &str, grouping: Option<bool>) -> Result<()> {
    let mut library = db::open_library(config).await?;
    let collection = library.create_collection(name, grouping).await?;
    println!("Created folder {} ({})", collection.name, collection.id);
    Ok(())
}

pub async fn run_folders_delete(config: &Config, id: &str) -> Result<()> {
    let mut library = db::open_library(config).await?;
    library.delete_collection(id).await?;
    println!("Deleted folder {}", id);
    Ok(())
}
