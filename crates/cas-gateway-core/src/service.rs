//! Service contracts the gateway dispatches to.
//!
//! Both traits are implemented by the reference
//! [`Engine`](crate::engine::Engine); other storage/index engines can be
//! plugged into the [`Gateway`](crate::gateway::Gateway) by implementing
//! them directly.

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::models::{ContentHash, RetrievedObject, SearchResultPage};
use crate::pagination::PageRequest;
use crate::query::Query;

/// Resolves a content hash to its metadata and, optionally, its payload.
#[async_trait]
pub trait RetrievalService: Send + Sync {
    /// Fetch the object stored under `hash`.
    ///
    /// Fails with [`ServiceError::NotFound`] when nothing is indexed under
    /// the hash (in `index`, when given). With `load_payload` false the
    /// returned object carries no payload.
    async fn fetch(
        &self,
        hash: &ContentHash,
        index: Option<&str>,
        load_payload: bool,
    ) -> Result<RetrievedObject, ServiceError>;
}

/// Runs paginated, sortable metadata searches.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Evaluate `query` (`None` matches everything) against `index` or the
    /// default index.
    ///
    /// Fails with [`ServiceError::InvalidRequest`] for out-of-range page
    /// parameters and [`ServiceError::IndexNotFound`] for an unknown index.
    async fn search(
        &self,
        index: Option<&str>,
        page: &PageRequest,
        query: Option<&Query>,
    ) -> Result<SearchResultPage, ServiceError>;
}
