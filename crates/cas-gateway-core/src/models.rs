//! Core data models shared by the store, engine, and gateway layers.
//!
//! These types describe stored objects as the gateway sees them: an opaque
//! [`ContentHash`], read-only [`ObjectMetadata`], and the per-request
//! [`RetrievedObject`] and [`SearchResultPage`] shapes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::pagination::PageRequest;

/// Attribute name that resolves to [`ObjectMetadata::content_type`] in
/// queries and sorts.
pub const CONTENT_TYPE_ATTRIBUTE: &str = "content_type";

/// Opaque identifier of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Lowercase hex SHA-256 of `payload`.
    pub fn of(payload: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(payload)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ContentHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Metadata describing a stored object.
///
/// Owned by the storage layer; the gateway only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ObjectMetadata {
    /// Look up an attribute by name. `content_type` resolves to the
    /// dedicated field rather than the attribute map.
    pub fn attribute(&self, name: &str) -> Option<serde_json::Value> {
        if name == CONTENT_TYPE_ATTRIBUTE {
            return self
                .content_type
                .as_ref()
                .map(|ct| serde_json::Value::String(ct.clone()));
        }
        self.attributes.get(name).cloned()
    }
}

/// An object to be written through the seed path.
#[derive(Debug, Clone)]
pub struct NewObject {
    pub metadata: ObjectMetadata,
    pub payload: Vec<u8>,
}

impl NewObject {
    pub fn hash(&self) -> ContentHash {
        ContentHash::of(&self.payload)
    }
}

/// An object's index entry without its payload, as scanned by search.
#[derive(Debug, Clone)]
pub struct IndexedObject {
    pub hash: ContentHash,
    pub index_name: String,
    pub metadata: ObjectMetadata,
    /// Unix timestamp of ingestion.
    pub stored_at: i64,
}

/// Result of a successful fetch.
///
/// `payload` is `None` exactly when a metadata-only fetch was requested.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedObject {
    pub hash: ContentHash,
    pub index_name: String,
    pub metadata: ObjectMetadata,
    #[serde(skip)]
    pub payload: Option<Vec<u8>>,
}

/// One entry of a [`SearchResultPage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub hash: ContentHash,
    pub index_name: String,
    pub metadata: ObjectMetadata,
    /// Ingestion time (ISO 8601).
    pub stored_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// A single page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultPage {
    pub hits: Vec<SearchHit>,
    /// Number of matches across all pages.
    pub total_count: u64,
    /// The page request that produced this page.
    pub page: PageRequest,
}

/// Name and size of an index, for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSummary {
    pub name: String,
    pub object_count: u64,
}

/// Format a Unix timestamp as ISO 8601.
pub fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
