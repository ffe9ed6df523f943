//! Reference engine implementing the retrieval and search contracts over a
//! [`Store`].
//!
//! # Search Algorithm
//!
//! 1. Validate the page parameters (`InvalidRequest` on failure).
//! 2. Resolve the index: the requested one, or the configured default
//!    (`IndexNotFound` if it does not exist).
//! 3. Scan the index in ingestion order and keep entries matching the query.
//! 4. If a sort field was given, stable-sort on it. Entries missing the
//!    field go last in both directions; mixed types order by type rank.
//! 5. Record the total, then slice out the requested page.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ServiceError;
use crate::models::{
    format_ts_iso, ContentHash, IndexedObject, RetrievedObject, SearchHit, SearchResultPage,
};
use crate::pagination::{PageRequest, SortDirection, SortOrder};
use crate::query::{compare_values, Query};
use crate::service::{RetrievalService, SearchService};
use crate::store::Store;

pub const DEFAULT_INDEX: &str = "default";
pub const DEFAULT_MAX_PAGE_SIZE: i64 = 1000;

/// Engine tuning, decoupled from application config.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Index searched when a request names none.
    pub default_index: String,
    /// Largest accepted page size.
    pub max_page_size: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_index: DEFAULT_INDEX.to_string(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

pub struct Engine<S> {
    store: S,
    settings: EngineSettings,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S, settings: EngineSettings) -> Self {
        Self { store, settings }
    }
}

#[async_trait]
impl<S: Store> RetrievalService for Engine<S> {
    async fn fetch(
        &self,
        hash: &ContentHash,
        index: Option<&str>,
        load_payload: bool,
    ) -> Result<RetrievedObject, ServiceError> {
        let found = if hash.is_empty() {
            None
        } else {
            self.store.get_object(hash, index, load_payload).await?
        };

        found.ok_or_else(|| {
            ServiceError::NotFound(match index {
                Some(name) => format!("content not found: {} (index: {})", hash, name),
                None => format!("content not found: {}", hash),
            })
        })
    }
}

#[async_trait]
impl<S: Store> SearchService for Engine<S> {
    async fn search(
        &self,
        index: Option<&str>,
        page: &PageRequest,
        query: Option<&Query>,
    ) -> Result<SearchResultPage, ServiceError> {
        let bounds = page.bounds(self.settings.max_page_size)?;
        let index = index.unwrap_or(self.settings.default_index.as_str());

        if !self.store.index_exists(index).await? {
            return Err(ServiceError::IndexNotFound(format!(
                "index not found: {}",
                index
            )));
        }

        let mut matched: Vec<IndexedObject> = self
            .store
            .scan_index(index)
            .await?
            .into_iter()
            .filter(|entry| query.map_or(true, |q| q.matches(&entry.metadata)))
            .collect();

        if let Some(order) = &page.sort {
            sort_entries(&mut matched, order);
        }

        let total_count = matched.len() as u64;
        tracing::debug!(index, total_count, offset = bounds.offset, "search evaluated");

        let hits = matched
            .into_iter()
            .skip(bounds.offset)
            .take(bounds.limit)
            .map(|entry| SearchHit {
                hash: entry.hash,
                index_name: entry.index_name,
                metadata: entry.metadata,
                stored_at: format_ts_iso(entry.stored_at),
                score: None,
            })
            .collect();

        Ok(SearchResultPage {
            hits,
            total_count,
            page: page.clone(),
        })
    }
}

/// Stable sort by one attribute. Ties keep ingestion order.
pub fn sort_entries(entries: &mut Vec<IndexedObject>, order: &SortOrder) {
    let mut keyed: Vec<(Option<Value>, IndexedObject)> = entries
        .drain(..)
        .map(|e| {
            let key = e.metadata.attribute(&order.field).filter(|v| !v.is_null());
            (key, e)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| compare_sort_keys(a.as_ref(), b.as_ref(), order.direction));
    entries.extend(keyed.into_iter().map(|(_, e)| e));
}

fn compare_sort_keys(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let natural = compare_values(x, y).unwrap_or_else(|| type_rank(x).cmp(&type_rank(y)));
            match direction {
                SortDirection::Asc => natural,
                SortDirection::Desc => natural.reverse(),
            }
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
