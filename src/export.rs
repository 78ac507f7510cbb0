//! Export assembled documents to disk.
//!
//! Two shapes are supported:
//!
//! - an archive: every selected document in one ZIP, each entry named
//!   after its `Document.name` (default file `Batch_<unix-millis>.zip`);
//! - a directory: one file per selected document.
//!
//! The bytes written are the stored `rendered_bytes`, so an export is
//! exactly what the last merge produced.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use zip::write::SimpleFileOptions;

use chapter_merge_core::models::{now_millis, Document};
use chapter_merge_core::Library;

use crate::config::Config;
use crate::db;

/// `Batch_<unix-millis>.zip`
pub fn default_archive_name() -> String {
    format!("Batch_{}.zip", now_millis())
}

/// Build a ZIP archive holding each document under its name.
pub fn archive_bytes(docs: &[&Document]) -> Result<Vec<u8>> {
    // DOCX packages are already deflated.
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for doc in docs {
        zip.start_file(doc.name.as_str(), options)?;
        zip.write_all(&doc.rendered_bytes)?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Write each document into `dir`; returns the paths written.
pub fn write_dir(docs: &[&Document], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let mut written = Vec::with_capacity(docs.len());
    for doc in docs {
        let path = dir.join(&doc.name);
        std::fs::write(&path, &doc.rendered_bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// The folder's documents, or only `ids` when non-empty.
///
/// An id that is not in the folder is an error.
pub fn select<'a>(library: &'a Library, folder: &str, ids: &[String]) -> Result<Vec<&'a Document>> {
    if library.collection(folder).is_none() {
        bail!("folder not found: {}", folder);
    }
    let docs = library.documents(folder, None);
    if ids.is_empty() {
        return Ok(docs);
    }
    let mut selected = Vec::with_capacity(ids.len());
    for id in ids {
        match docs.iter().find(|d| &d.id == id) {
            Some(doc) => selected.push(*doc),
            None => bail!("document not found in folder {}: {}", folder, id),
        }
    }
    Ok(selected)
}

/// `chm export archive`
pub async fn run_export_archive(
    config: &Config,
    folder: &str,
    ids: &[String],
    output: Option<&Path>,
) -> Result<()> {
    let library = db::open_library(config).await?;
    let docs = select(&library, folder, ids)?;
    if docs.is_empty() {
        bail!("no documents to export in folder {}", folder);
    }

    let path = match output {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(default_archive_name()),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = archive_bytes(&docs)?;
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(documents = docs.len(), path = %path.display(), "archive written");
    println!("Exported {} documents to {}", docs.len(), path.display());
    Ok(())
}

/// `chm export dir`
pub async fn run_export_dir(config: &Config, folder: &str, ids: &[String], dir: &Path) -> Result<()> {
    let library = db::open_library(config).await?;
    let docs = select(&library, folder, ids)?;
    let written = write_dir(&docs, dir)?;
    for path in &written {
        println!("  {}", path.display());
    }
    println!("Exported {} documents to {}", written.len(), dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn doc(name: &str, bytes: &[u8]) -> Document {
        Document {
            id: name.into(),
            collection_id: "root".into(),
            name: name.into(),
            group_header: name.into(),
            segments: Vec::new(),
            word_count: 0,
            updated_at: 0,
            rendered_bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_archive_entries_named_after_documents() {
        let a = doc("Chapter 1.docx", b"one");
        let b = doc("Chapter 2.docx", b"two");
        let bytes = archive_bytes(&[&a, &b]).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("Chapter 2.docx")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "two");
    }

    #[test]
    fn test_write_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let a = doc("Prologue.docx", b"p");
        let written = write_dir(&[&a], &tmp.path().join("out")).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(std::fs::read(&written[0]).unwrap(), b"p");
    }

    #[test]
    fn test_default_archive_name() {
        let name = default_archive_name();
        assert!(name.starts_with("Batch_"));
        assert!(name.ends_with(".zip"));
    }
}
