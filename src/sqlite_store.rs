//! SQLite-backed [`Store`] implementation.
//!
//! Objects live in a single `objects` table keyed by `(index_name, hash)`;
//! the autoincrement `seq` column records ingestion order. Attribute maps
//! are stored as JSON text, the content type in its own column.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use cas_gateway_core::models::{
    ContentHash, IndexSummary, IndexedObject, NewObject, ObjectMetadata, RetrievedObject,
};
use cas_gateway_core::store::Store;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn metadata_from_row(row: &SqliteRow) -> Result<ObjectMetadata> {
    let metadata_json: String = row.get("metadata_json");
    let attributes: BTreeMap<String, serde_json::Value> = serde_json::from_str(&metadata_json)
        .with_context(|| {
            format!(
                "corrupt metadata for object {}",
                row.get::<String, _>("hash")
            )
        })?;
    Ok(ObjectMetadata {
        content_type: row.get("content_type"),
        attributes,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_index(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO indexes (name, created_at) VALUES (?, ?)")
            .bind(name)
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn index_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM indexes WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn list_indexes(&self) -> Result<Vec<IndexSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT i.name AS name, COUNT(o.seq) AS object_count
            FROM indexes i
            LEFT JOIN objects o ON o.index_name = i.name
            GROUP BY i.name
            ORDER BY i.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| IndexSummary {
                name: row.get("name"),
                object_count: row.get::<i64, _>("object_count") as u64,
            })
            .collect())
    }

    async fn put_object(&self, index: &str, object: &NewObject) -> Result<ContentHash> {
        if !self.index_exists(index).await? {
            bail!("index not found: {}", index);
        }

        let hash = object.hash();
        let metadata_json = serde_json::to_string(&object.metadata.attributes)?;

        sqlx::query(
            r#"
            INSERT INTO objects (index_name, hash, content_type, metadata_json, payload, stored_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(index_name, hash) DO UPDATE SET
                content_type = excluded.content_type,
                metadata_json = excluded.metadata_json
            "#,
        )
        .bind(index)
        .bind(hash.as_str())
        .bind(&object.metadata.content_type)
        .bind(&metadata_json)
        .bind(&object.payload)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(hash)
    }

    async fn get_object(
        &self,
        hash: &ContentHash,
        index: Option<&str>,
        load_payload: bool,
    ) -> Result<Option<RetrievedObject>> {
        let payload_column = if load_payload { "payload" } else { "NULL AS payload" };
        let scope = if index.is_some() {
            "AND index_name = ?"
        } else {
            ""
        };
        let sql = format!(
            "SELECT hash, index_name, content_type, metadata_json, {} FROM objects \
             WHERE hash = ? {} ORDER BY seq ASC LIMIT 1",
            payload_column, scope
        );

        let mut query = sqlx::query(&sql).bind(hash.as_str());
        if let Some(name) = index {
            query = query.bind(name);
        }

        let Some(row) = query.fetch_optional(&self.pool).await? else {
            return Ok(None);
        };

        let payload: Option<Vec<u8>> = if load_payload {
            Some(row.get("payload"))
        } else {
            None
        };

        Ok(Some(RetrievedObject {
            hash: ContentHash::new(row.get::<String, _>("hash")),
            index_name: row.get("index_name"),
            metadata: metadata_from_row(&row)?,
            payload,
        }))
    }

    async fn scan_index(&self, index: &str) -> Result<Vec<IndexedObject>> {
        let rows = sqlx::query(
            "SELECT hash, index_name, content_type, metadata_json, stored_at FROM objects \
             WHERE index_name = ? ORDER BY seq ASC",
        )
        .bind(index)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(IndexedObject {
                    hash: ContentHash::new(row.get::<String, _>("hash")),
                    index_name: row.get("index_name"),
                    metadata: metadata_from_row(row)?,
                    stored_at: row.get("stored_at"),
                })
            })
            .collect()
    }
}
