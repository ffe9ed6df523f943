//! In-memory [`Store`] implementation for testing and embedding.
//!
//! Indexes are kept in a `BTreeMap` behind a `std::sync::RwLock`. Every
//! stored object carries a global sequence number so that cross-index
//! lookups can return the earliest-ingested match.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::{
    ContentHash, IndexSummary, IndexedObject, NewObject, ObjectMetadata, RetrievedObject,
};

use super::Store;

struct StoredObject {
    seq: u64,
    hash: ContentHash,
    metadata: ObjectMetadata,
    payload: Vec<u8>,
    stored_at: i64,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    indexes: BTreeMap<String, Vec<StoredObject>>,
}

/// In-memory store for tests and embedded use.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with one empty index already created.
    pub fn with_index(name: &str) -> Self {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.write() {
            inner.indexes.insert(name.to_string(), Vec::new());
        }
        store
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

fn retrieved(index: &str, obj: &StoredObject, load_payload: bool) -> RetrievedObject {
    RetrievedObject {
        hash: obj.hash.clone(),
        index_name: index.to_string(),
        metadata: obj.metadata.clone(),
        payload: load_payload.then(|| obj.payload.clone()),
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_index(&self, name: &str) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.indexes.contains_key(name) {
            return Ok(false);
        }
        inner.indexes.insert(name.to_string(), Vec::new());
        Ok(true)
    }

    async fn index_exists(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.indexes.contains_key(name))
    }

    async fn list_indexes(&self) -> Result<Vec<IndexSummary>> {
        Ok(self
            .read()?
            .indexes
            .iter()
            .map(|(name, objects)| IndexSummary {
                name: name.clone(),
                object_count: objects.len() as u64,
            })
            .collect())
    }

    async fn put_object(&self, index: &str, object: &NewObject) -> Result<ContentHash> {
        let hash = object.hash();
        let mut inner = self.write()?;
        let seq = inner.next_seq;
        let Some(objects) = inner.indexes.get_mut(index) else {
            bail!("index not found: {}", index);
        };

        if let Some(existing) = objects.iter_mut().find(|o| o.hash == hash) {
            existing.metadata = object.metadata.clone();
            return Ok(hash);
        }

        objects.push(StoredObject {
            seq,
            hash: hash.clone(),
            metadata: object.metadata.clone(),
            payload: object.payload.clone(),
            stored_at: chrono::Utc::now().timestamp(),
        });
        inner.next_seq += 1;
        Ok(hash)
    }

    async fn get_object(
        &self,
        hash: &ContentHash,
        index: Option<&str>,
        load_payload: bool,
    ) -> Result<Option<RetrievedObject>> {
        let inner = self.read()?;
        let found = match index {
            Some(name) => inner
                .indexes
                .get_key_value(name)
                .and_then(|(n, objects)| objects.iter().find(|o| &o.hash == hash).map(|o| (n, o))),
            None => inner
                .indexes
                .iter()
                .filter_map(|(n, objects)| objects.iter().find(|o| &o.hash == hash).map(|o| (n, o)))
                .min_by_key(|(_, o)| o.seq),
        };
        Ok(found.map(|(name, obj)| retrieved(name, obj, load_payload)))
    }

    async fn scan_index(&self, index: &str) -> Result<Vec<IndexedObject>> {
        let inner = self.read()?;
        let Some(objects) = inner.indexes.get(index) else {
            bail!("index not found: {}", index);
        };
        Ok(objects
            .iter()
            .map(|o| IndexedObject {
                hash: o.hash.clone(),
                index_name: index.to_string(),
                metadata: o.metadata.clone(),
                stored_at: o.stored_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(body: &str, content_type: Option<&str>) -> NewObject {
        NewObject {
            metadata: ObjectMetadata {
                content_type: content_type.map(String::from),
                attributes: Default::default(),
            },
            payload: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_create_index_idempotent() {
        let store = InMemoryStore::new();
        assert!(store.create_index("docs").await.unwrap());
        assert!(!store.create_index("docs").await.unwrap());
        assert!(store.index_exists("docs").await.unwrap());
        assert!(!store.index_exists("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_requires_index() {
        let store = InMemoryStore::new();
        assert!(store.put_object("docs", &object("a", None)).await.is_err());
    }

    #[tokio::test]
    async fn test_put_replaces_metadata_of_same_payload() {
        let store = InMemoryStore::with_index("docs");
        let h1 = store
            .put_object("docs", &object("a", Some("text/plain")))
            .await
            .unwrap();
        let h2 = store
            .put_object("docs", &object("a", Some("text/markdown")))
            .await
            .unwrap();
        assert_eq!(h1, h2);

        let scanned = store.scan_index("docs").await.unwrap();
        assert_eq!(scanned.len(), 1);
        assert_eq!(
            scanned[0].metadata.content_type.as_deref(),
            Some("text/markdown")
        );
    }

    #[tokio::test]
    async fn test_get_object_payload_flag() {
        let store = InMemoryStore::with_index("docs");
        let hash = store.put_object("docs", &object("body", None)).await.unwrap();

        let full = store.get_object(&hash, None, true).await.unwrap().unwrap();
        assert_eq!(full.payload.as_deref(), Some(&b"body"[..]));

        let meta_only = store.get_object(&hash, None, false).await.unwrap().unwrap();
        assert!(meta_only.payload.is_none());
        assert_eq!(meta_only.index_name, "docs");
    }

    #[tokio::test]
    async fn test_get_object_scoped_to_index() {
        let store = InMemoryStore::with_index("docs");
        store.create_index("images").await.unwrap();
        let hash = store.put_object("images", &object("png", None)).await.unwrap();

        assert!(store
            .get_object(&hash, Some("docs"), true)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .get_object(&hash, Some("missing"), true)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .get_object(&hash, Some("images"), true)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_get_object_prefers_earliest_ingested() {
        let store = InMemoryStore::new();
        store.create_index("b").await.unwrap();
        store.create_index("a").await.unwrap();
        let hash = store.put_object("b", &object("same", None)).await.unwrap();
        store.put_object("a", &object("same", None)).await.unwrap();

        let found = store.get_object(&hash, None, false).await.unwrap().unwrap();
        assert_eq!(found.index_name, "b");
    }

    #[tokio::test]
    async fn test_list_indexes_counts() {
        let store = InMemoryStore::with_index("docs");
        store.put_object("docs", &object("1", None)).await.unwrap();
        store.put_object("docs", &object("2", None)).await.unwrap();
        let indexes = store.list_indexes().await.unwrap();
        assert_eq!(
            indexes,
            vec![IndexSummary {
                name: "docs".into(),
                object_count: 2
            }]
        );
    }
}
