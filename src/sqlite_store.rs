//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the schema created by
//! [`migrate`](crate::migrate). Writes are upserts keyed by record id, so
//! the last write wins.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use chapter_merge_core::models::{
    now_millis, Checklist, ChecklistItem, Collection, Document, LogCategory, LogEntry, Segment,
};
use chapter_merge_core::store::Store;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_document(row: &SqliteRow) -> Result<Document> {
    let segments_json: String = row.get("segments_json");
    let segments: Vec<Segment> = serde_json::from_str(&segments_json)?;
    let word_count: i64 = row.get("word_count");
    Ok(Document {
        id: row.get("id"),
        collection_id: row.get("collection_id"),
        name: row.get("name"),
        group_header: row.get("group_header"),
        segments,
        word_count: word_count.max(0) as usize,
        updated_at: row.get("updated_at"),
        rendered_bytes: row.get("rendered"),
    })
}

fn row_to_log_entry(row: &SqliteRow) -> Result<LogEntry> {
    let category: String = row.get("category");
    Ok(LogEntry {
        id: row.get("id"),
        collection_id: row.get("collection_id"),
        timestamp: row.get("timestamp"),
        category: LogCategory::parse(&category)
            .ok_or_else(|| anyhow!("unknown log category in store: {}", category))?,
        message: row.get("message"),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn load_collections(&self) -> Result<Vec<Collection>> {
        let rows = sqlx::query("SELECT id, name, grouping FROM collections ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| {
                let grouping: i64 = row.get("grouping");
                Collection {
                    id: row.get("id"),
                    name: row.get("name"),
                    grouping: grouping != 0,
                }
            })
            .collect())
    }

    async fn put_collection(&self, collection: &Collection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO collections (id, name, grouping, created_at) VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name, grouping = excluded.grouping
            "#,
        )
        .bind(&collection.id)
        .bind(&collection.name)
        .bind(collection.grouping as i64)
        .bind(now_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_collection(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM collections WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn load_documents(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT id, collection_id, name, group_header, segments_json, word_count, updated_at, rendered \
             FROM documents ORDER BY updated_at",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_document).collect()
    }

    async fn put_document(&self, doc: &Document) -> Result<()> {
        let segments_json = serde_json::to_string(&doc.segments)?;
        sqlx::query(
            r#"
            INSERT INTO documents (id, collection_id, name, group_header, segments_json,
                                   word_count, updated_at, rendered)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                collection_id = excluded.collection_id,
                name = excluded.name,
                group_header = excluded.group_header,
                segments_json = excluded.segments_json,
                word_count = excluded.word_count,
                updated_at = excluded.updated_at,
                rendered = excluded.rendered
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.collection_id)
        .bind(&doc.name)
        .bind(&doc.group_header)
        .bind(&segments_json)
        .bind(doc.word_count as i64)
        .bind(doc.updated_at)
        .bind(&doc.rendered_bytes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn load_checklists(&self) -> Result<Vec<Checklist>> {
        let rows = sqlx::query("SELECT collection_id, list_json FROM checklists")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                let list_json: String = row.get("list_json");
                let list: Vec<ChecklistItem> = serde_json::from_str(&list_json)?;
                Ok(Checklist {
                    collection_id: row.get("collection_id"),
                    list,
                })
            })
            .collect()
    }

    async fn put_checklist(&self, checklist: &Checklist) -> Result<()> {
        let list_json = serde_json::to_string(&checklist.list)?;
        sqlx::query(
            r#"
            INSERT INTO checklists (collection_id, list_json) VALUES (?, ?)
            ON CONFLICT(collection_id) DO UPDATE SET list_json = excluded.list_json
            "#,
        )
        .bind(&checklist.collection_id)
        .bind(&list_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_checklist(&self, collection_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM checklists WHERE collection_id = ?")
            .bind(collection_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn load_log(&self) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query(
            "SELECT id, collection_id, timestamp, category, message FROM log_entries \
             ORDER BY timestamp, rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_log_entry).collect()
    }

    async fn put_log_entry(&self, entry: &LogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO log_entries (id, collection_id, timestamp, category, message)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.collection_id)
        .bind(entry.timestamp)
        .bind(entry.category.as_str())
        .bind(&entry.message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_log_entries(&self, ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM log_entries WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn put_flag(&self, key: &str, value: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scratch (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(if value { "true" } else { "false" })
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_flag(&self, key: &str) -> Result<Option<bool>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM scratch WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.map(|v| v == "true"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::apply(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn doc(name: &str) -> Document {
        Document {
            id: "doc-1".into(),
            collection_id: "root".into(),
            name: name.into(),
            group_header: "Chapter 1".into(),
            segments: vec![Segment {
                sort_key: 1.5,
                lines: vec!["Hello".into(), "world".into()],
                source_title: "Chapter 1.5".into(),
            }],
            word_count: 4,
            updated_at: 42,
            rendered_bytes: vec![0x50, 0x4b, 0x03, 0x04],
        }
    }

    #[tokio::test]
    async fn test_document_round_trip_and_overwrite() {
        let store = store().await;
        store.put_document(&doc("Chapter 1.docx")).await.unwrap();
        store.put_document(&doc("Renamed.docx")).await.unwrap();

        let docs = store.load_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0], doc("Renamed.docx"));

        store.delete_document("doc-1").await.unwrap();
        assert!(store.load_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checklist_replaced_per_collection() {
        let store = store().await;
        let mut checklist = Checklist {
            collection_id: "root".into(),
            list: vec![ChecklistItem {
                index: 1,
                title: "One".into(),
            }],
        };
        store.put_checklist(&checklist).await.unwrap();
        checklist.list.push(ChecklistItem {
            index: 2,
            title: "Two".into(),
        });
        store.put_checklist(&checklist).await.unwrap();

        let loaded = store.load_checklists().await.unwrap();
        assert_eq!(loaded, vec![checklist]);
    }

    #[tokio::test]
    async fn test_log_entries_ordered_by_time() {
        let store = store().await;
        for (id, ts) in [("b", 2), ("a", 1)] {
            store
                .put_log_entry(&LogEntry {
                    id: id.into(),
                    collection_id: "root".into(),
                    timestamp: ts,
                    category: LogCategory::Success,
                    message: id.into(),
                })
                .await
                .unwrap();
        }
        let log = store.load_log().await.unwrap();
        assert_eq!(log[0].id, "a");
        assert_eq!(log[1].category, LogCategory::Success);

        store.delete_log_entries(&["a".to_string()]).await.unwrap();
        assert_eq!(store.load_log().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_flags() {
        let store = store().await;
        assert_eq!(store.get_flag("merge_busy").await.unwrap(), None);
        store.put_flag("merge_busy", true).await.unwrap();
        store.put_flag("merge_busy", false).await.unwrap();
        assert_eq!(store.get_flag("merge_busy").await.unwrap(), Some(false));
    }

    #[tokio::test]
    async fn test_collections_keep_grouping() {
        let store = store().await;
        store
            .put_collection(&Collection {
                id: "c1".into(),
                name: "Novel".into(),
                grouping: false,
            })
            .await
            .unwrap();
        let loaded = store.load_collections().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(!loaded[0].grouping);
    }
}
