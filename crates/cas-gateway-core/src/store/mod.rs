//! Storage abstraction for cas-gateway.
//!
//! The [`Store`] trait is the narrow surface the reference
//! [`Engine`](crate::engine::Engine) needs from a content-addressed backend:
//! index management, a seed write, hash lookup, and an index scan. Query
//! evaluation, sorting, and pagination happen in the engine, so every backend
//! answers searches identically.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ContentHash, IndexSummary, IndexedObject, NewObject, RetrievedObject};

/// Abstract content-addressed storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_index`](Store::create_index) | Create an index if missing |
/// | [`index_exists`](Store::index_exists) | Check that an index exists |
/// | [`list_indexes`](Store::list_indexes) | List indexes with object counts |
/// | [`put_object`](Store::put_object) | Store an object under its content hash |
/// | [`get_object`](Store::get_object) | Look up one object by hash |
/// | [`scan_index`](Store::scan_index) | All entries of an index, in ingestion order |
#[async_trait]
pub trait Store: Send + Sync {
    /// Create an index. Returns `false` if it already existed.
    async fn create_index(&self, name: &str) -> Result<bool>;

    async fn index_exists(&self, name: &str) -> Result<bool>;

    async fn list_indexes(&self) -> Result<Vec<IndexSummary>>;

    /// Store an object in `index`, replacing the metadata of an identical
    /// payload already stored there. The index must exist.
    async fn put_object(&self, index: &str, object: &NewObject) -> Result<ContentHash>;

    /// Look up an object by hash.
    ///
    /// With `index` set, only that index is searched; otherwise the
    /// earliest-ingested match across all indexes is returned. The payload
    /// is loaded only when `load_payload` is true.
    async fn get_object(
        &self,
        hash: &ContentHash,
        index: Option<&str>,
        load_payload: bool,
    ) -> Result<Option<RetrievedObject>>;

    /// Every entry in `index`, in ingestion order, without payloads.
    async fn scan_index(&self, index: &str) -> Result<Vec<IndexedObject>>;
}
