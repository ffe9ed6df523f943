//! Error kinds declared by the retrieval and search service contracts.

use thiserror::Error;

/// Failure of a [`RetrievalService`](crate::service::RetrievalService) or
/// [`SearchService`](crate::service::SearchService) call.
///
/// Every kind except [`Unrecovered`](ServiceError::Unrecovered) is a client
/// error. `Unrecovered` carries the backend error untouched, including
/// cancellation and timeout errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No object is indexed under the requested hash.
    #[error("{0}")]
    NotFound(String),

    /// Page parameters out of range.
    #[error("{0}")]
    InvalidRequest(String),

    /// The named index does not exist.
    #[error("{0}")]
    IndexNotFound(String),

    #[error(transparent)]
    Unrecovered(#[from] anyhow::Error),
}
