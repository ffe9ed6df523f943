use anyhow::Result;

use cas_gateway_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Create the schema (idempotent) and the configured default index.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS indexes (
            name TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // seq gives the ingestion order used by unsorted searches
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS objects (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            index_name TEXT NOT NULL,
            hash TEXT NOT NULL,
            content_type TEXT,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            payload BLOB NOT NULL,
            stored_at INTEGER NOT NULL,
            UNIQUE(index_name, hash),
            FOREIGN KEY (index_name) REFERENCES indexes(name)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_objects_hash ON objects(hash)")
        .execute(&pool)
        .await?;

    let store = SqliteStore::new(pool.clone());
    store.create_index(&config.storage.default_index).await?;

    pool.close().await;
    Ok(())
}
