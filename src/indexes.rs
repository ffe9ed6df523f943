//! Index listing and creation.

use anyhow::{bail, Result};

use cas_gateway_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// CLI entry point for `casg indexes`.
pub async fn list_indexes(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let indexes = store.list_indexes().await?;
    pool.close().await;

    if indexes.is_empty() {
        println!("No indexes. Run `casg init` first.");
        return Ok(());
    }

    println!("{:<24} {:>10}", "INDEX", "OBJECTS");
    for index in &indexes {
        let marker = if index.name == config.storage.default_index {
            " (default)"
        } else {
            ""
        };
        println!("{:<24} {:>10}{}", index.name, index.object_count, marker);
    }
    Ok(())
}

/// CLI entry point for `casg create-index <name>`.
pub async fn create_index(config: &Config, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("index name must not be empty");
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let created = store.create_index(name).await?;
    pool.close().await;

    if created {
        println!("created index '{}'", name);
    } else {
        println!("index '{}' already exists", name);
    }
    Ok(())
}
