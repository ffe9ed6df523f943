//! Seed path: store local files under their content hash.
//!
//! `casg put` reads a file, or every regular file below a directory, and
//! writes it into an index with the given metadata. The content type is
//! taken from `--content-type` or guessed from the file extension; files
//! with an unknown extension are stored without one.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use cas_gateway_core::models::{NewObject, ObjectMetadata};
use cas_gateway_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Parse `key=value` pairs. Values that are valid JSON keep their type
/// (`year=2001` is a number); anything else is a string.
pub fn parse_attributes(pairs: &[String]) -> Result<BTreeMap<String, serde_json::Value>> {
    let mut attributes = BTreeMap::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("invalid attribute '{}': expected key=value", pair);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("invalid attribute '{}': empty key", pair);
        }
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        attributes.insert(key.to_string(), value);
    }
    Ok(attributes)
}

fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("no such file or directory: {}", path.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// CLI entry point for `casg put <path>`.
pub async fn run_put(
    config: &Config,
    path: &Path,
    index: Option<&str>,
    content_type: Option<&str>,
    attributes: &[String],
) -> Result<()> {
    let attributes = parse_attributes(attributes)?;
    let files = collect_files(path)?;
    let index = index.unwrap_or(config.storage.default_index.as_str());

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    if !store.index_exists(index).await? {
        pool.close().await;
        bail!(
            "index not found: {} (create it with `casg create-index {}`)",
            index,
            index
        );
    }

    let mut stored = 0usize;
    for file in &files {
        let payload =
            std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
        let content_type = content_type
            .map(String::from)
            .or_else(|| mime_guess::from_path(file).first().map(|m| m.to_string()));

        let object = NewObject {
            metadata: ObjectMetadata {
                content_type,
                attributes: attributes.clone(),
            },
            payload,
        };
        let hash = store.put_object(index, &object).await?;
        tracing::info!(hash = %hash, index, path = %file.display(), "object stored");
        println!("{}  {}", hash, file.display());
        stored += 1;
    }

    pool.close().await;
    println!("stored {} object(s) in index '{}'", stored, index);
    Ok(())
}
