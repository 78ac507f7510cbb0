//! SQLite database connection management.
//!
//! Provides a connection pool to the SQLite database with WAL mode
//! enabled, and [`open_library`] which loads the core
//! [`Library`](chapter_merge_core::Library) on top of a [`SqliteStore`].
//! The database file and its parent directories are created automatically.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;

use chapter_merge_core::Library;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::migrate;
use crate::queue::SharedLibrary;
use crate::sqlite_store::SqliteStore;

/// Create a connection pool to the configured SQLite database.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Connect, ensure the schema exists, and load the library.
pub async fn open_library(config: &Config) -> Result<Library> {
    let pool = connect(config).await?;
    migrate::apply(&pool).await?;
    let store = Arc::new(SqliteStore::new(pool));
    Library::load(store, config.library_options()).await
}

/// [`open_library`] wrapped for sharing with a merge queue.
pub async fn open_shared(config: &Config) -> Result<SharedLibrary> {
    Ok(Arc::new(Mutex::new(open_library(config).await?)))
}
