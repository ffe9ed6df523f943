//! Orchestration layer between the transport and the services.
//!
//! The [`Gateway`] exposes the two boundary operations:
//!
//! - **fetch-by-hash**: always loads the payload and resolves the response
//!   content type once, via [`resolve_content_type`].
//! - **search**: normalizes raw [`SearchParams`] and a [`QueryInput`] into a
//!   [`NormalizedSearch`] with [`normalize_search`], then delegates to the
//!   [`SearchService`] and returns its page untouched.
//!
//! Service and parse failures are folded into [`GatewayError`], the single
//! error type the transport translates into a status code.

use std::sync::Arc;

use anyhow::anyhow;
use serde::Deserialize;
use thiserror::Error;

use crate::error::ServiceError;
use crate::models::{ContentHash, ObjectMetadata, RetrievedObject, SearchResultPage};
use crate::pagination::{PageRequest, SortDirection, DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE};
use crate::query::{ParseError, Query};
use crate::service::{RetrievalService, SearchService};

/// Content type used when an object's metadata carries none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Boundary error taxonomy.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Hash unresolved.
    #[error("{0}")]
    NotFound(String),

    /// Malformed textual query.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Invalid pagination.
    #[error("{0}")]
    InvalidRequest(String),

    /// Unknown index.
    #[error("{0}")]
    IndexNotFound(String),

    /// Any other backend failure, passed through unmodified.
    #[error(transparent)]
    Unrecovered(anyhow::Error),
}

impl From<ServiceError> for GatewayError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => GatewayError::NotFound(msg),
            ServiceError::InvalidRequest(msg) => GatewayError::InvalidRequest(msg),
            ServiceError::IndexNotFound(msg) => GatewayError::IndexNotFound(msg),
            ServiceError::Unrecovered(e) => GatewayError::Unrecovered(e),
        }
    }
}

/// Raw search parameters as received from a transport.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub dir: SortDirection,
}

fn default_page() -> i64 {
    DEFAULT_PAGE_NUMBER
}

fn default_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            index: None,
            page: DEFAULT_PAGE_NUMBER,
            size: DEFAULT_PAGE_SIZE,
            sort: None,
            dir: SortDirection::Asc,
        }
    }
}

/// How the caller supplied the query.
#[derive(Debug, Clone)]
pub enum QueryInput {
    /// Already-deserialized query (e.g. a request body).
    Structured(Query),
    /// Optional JSON text (e.g. a query-string parameter). Absent means
    /// unconstrained.
    Text(Option<String>),
}

impl QueryInput {
    /// Resolve to the query handed to the search service. `None` is the
    /// unconstrained query; a parse failure is returned, never replaced.
    pub fn resolve(self) -> Result<Option<Query>, ParseError> {
        match self {
            QueryInput::Structured(query) => Ok(Some(query)),
            QueryInput::Text(None) => Ok(None),
            QueryInput::Text(Some(text)) => Query::parse(&text).map(Some),
        }
    }
}

/// Canonical `(index, page, query)` triple passed to the search service.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSearch {
    pub index: Option<String>,
    pub page: PageRequest,
    pub query: Option<Query>,
}

/// Normalize transport parameters into a [`NormalizedSearch`].
pub fn normalize_search(
    params: SearchParams,
    input: QueryInput,
) -> Result<NormalizedSearch, GatewayError> {
    let page = PageRequest::of(params.page, params.size, params.sort.as_deref(), params.dir);
    let query = input.resolve()?;
    Ok(NormalizedSearch {
        index: params.index,
        page,
        query,
    })
}

/// Stored content type, or [`DEFAULT_CONTENT_TYPE`] when unset or blank.
pub fn resolve_content_type(metadata: &ObjectMetadata) -> &str {
    metadata
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Payload plus the content type to send it with.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub hash: ContentHash,
    pub content_type: String,
    pub payload: Vec<u8>,
}

/// Dispatches boundary operations to the retrieval and search services.
#[derive(Clone)]
pub struct Gateway {
    retrieval: Arc<dyn RetrievalService>,
    search: Arc<dyn SearchService>,
}

impl Gateway {
    pub fn new(retrieval: Arc<dyn RetrievalService>, search: Arc<dyn SearchService>) -> Self {
        Self { retrieval, search }
    }

    /// Use one engine for both services.
    pub fn from_engine<E>(engine: Arc<E>) -> Self
    where
        E: RetrievalService + SearchService + 'static,
    {
        Self {
            retrieval: engine.clone(),
            search: engine,
        }
    }

    /// Fetch an object's payload by hash.
    pub async fn fetch(
        &self,
        hash: &ContentHash,
        index: Option<&str>,
    ) -> Result<FetchResponse, GatewayError> {
        let object = self.retrieval.fetch(hash, index, true).await?;
        let content_type = resolve_content_type(&object.metadata).to_string();
        tracing::debug!(hash = %hash, content_type = %content_type, "resolved content type");

        let payload = object.payload.ok_or_else(|| {
            GatewayError::Unrecovered(anyhow!("backend returned no payload for {}", hash))
        })?;

        Ok(FetchResponse {
            hash: object.hash,
            content_type,
            payload,
        })
    }

    /// Fetch an object's metadata without loading its payload.
    pub async fn fetch_metadata(
        &self,
        hash: &ContentHash,
        index: Option<&str>,
    ) -> Result<RetrievedObject, GatewayError> {
        Ok(self.retrieval.fetch(hash, index, false).await?)
    }

    /// Normalize and run a search.
    pub async fn search(
        &self,
        params: SearchParams,
        input: QueryInput,
    ) -> Result<SearchResultPage, GatewayError> {
        let normalized = normalize_search(params, input)?;
        self.execute(&normalized).await
    }

    pub async fn execute(
        &self,
        normalized: &NormalizedSearch,
    ) -> Result<SearchResultPage, GatewayError> {
        tracing::debug!(
            index = ?normalized.index,
            page = normalized.page.page_number,
            size = normalized.page.page_size,
            "executing search"
        );
        Ok(self
            .search
            .search(
                normalized.index.as_deref(),
                &normalized.page,
                normalized.query.as_ref(),
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Engine, EngineSettings, DEFAULT_INDEX};
    use crate::models::NewObject;
    use crate::store::memory::InMemoryStore;
    use crate::store::Store;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;

    async fn gateway() -> Gateway {
        let store = InMemoryStore::with_index(DEFAULT_INDEX);
        let png = NewObject {
            metadata: ObjectMetadata {
                content_type: Some("image/png".into()),
                attributes: BTreeMap::from([("type".to_string(), json!("img"))]),
            },
            payload: vec![0x89, 0x50, 0x4e, 0x47],
        };
        let raw = NewObject {
            metadata: ObjectMetadata::default(),
            payload: b"raw bytes".to_vec(),
        };
        store.put_object(DEFAULT_INDEX, &png).await.unwrap();
        store.put_object(DEFAULT_INDEX, &raw).await.unwrap();
        for (i, title) in ["b", "e", "a", "d", "c", "f", "g"].iter().enumerate() {
            let doc = NewObject {
                metadata: ObjectMetadata {
                    content_type: Some("text/plain".into()),
                    attributes: BTreeMap::from([
                        ("type".to_string(), json!("doc")),
                        ("title".to_string(), json!(title)),
                    ]),
                },
                payload: format!("doc {}", i).into_bytes(),
            };
            store.put_object(DEFAULT_INDEX, &doc).await.unwrap();
        }
        Gateway::from_engine(Arc::new(Engine::new(store, EngineSettings::default())))
    }

    #[test]
    fn test_normalize_defaults() {
        let normalized = normalize_search(SearchParams::default(), QueryInput::Text(None)).unwrap();
        assert_eq!(
            normalized,
            NormalizedSearch {
                index: None,
                page: PageRequest::default(),
                query: None,
            }
        );
    }

    #[test]
    fn test_normalize_params_deserialized_defaults() {
        let params: SearchParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params, SearchParams::default());
    }

    #[test]
    fn test_normalize_text_and_structured_converge() {
        let params = SearchParams {
            index: Some("docs".into()),
            page: 1,
            size: 5,
            sort: Some("title".into()),
            dir: SortDirection::Desc,
        };
        let doc = Query::eq("type", "doc").unwrap();
        let structured = normalize_search(params.clone(), QueryInput::Structured(doc)).unwrap();
        let text = normalize_search(
            params,
            QueryInput::Text(Some(r#"{"eq":{"type":"doc"}}"#.into())),
        )
        .unwrap();
        assert_eq!(structured, text);
        assert_eq!(
            structured.page,
            PageRequest::sorted(1, 5, "title", SortDirection::Desc)
        );
    }

    #[test]
    fn test_normalize_parse_error_is_not_match_all() {
        for text in ["", "{", r#"{"eq":{}}"#] {
            let err = normalize_search(
                SearchParams::default(),
                QueryInput::Text(Some(text.to_string())),
            )
            .unwrap_err();
            assert!(matches!(err, GatewayError::Parse(_)), "for {:?}", text);
        }
    }

    #[test]
    fn test_resolve_content_type_default() {
        assert_eq!(
            resolve_content_type(&ObjectMetadata::default()),
            DEFAULT_CONTENT_TYPE
        );
        let blank = ObjectMetadata {
            content_type: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(resolve_content_type(&blank), DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_fetch_uses_stored_content_type() {
        let gw = gateway().await;
        let payload = vec![0x89, 0x50, 0x4e, 0x47];
        let resp = gw.fetch(&ContentHash::of(&payload), None).await.unwrap();
        assert_eq!(resp.content_type, "image/png");
        assert_eq!(resp.payload, payload);
    }

    #[tokio::test]
    async fn test_fetch_defaults_to_octet_stream() {
        let gw = gateway().await;
        let resp = gw
            .fetch(&ContentHash::of(b"raw bytes"), None)
            .await
            .unwrap();
        assert_eq!(resp.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(resp.payload, b"raw bytes");
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let gw = gateway().await;
        let err = gw.fetch(&ContentHash::from("Qmxxx"), None).await.unwrap_err();
        match err {
            GatewayError::NotFound(msg) => assert!(msg.contains("Qmxxx")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_metadata_only() {
        let gw = gateway().await;
        let obj = gw
            .fetch_metadata(&ContentHash::of(b"raw bytes"), Some(DEFAULT_INDEX))
            .await
            .unwrap();
        assert!(obj.payload.is_none());
    }

    #[tokio::test]
    async fn test_search_example_page() {
        let gw = gateway().await;
        let params = SearchParams {
            page: 1,
            size: 5,
            sort: Some("title".into()),
            dir: SortDirection::Desc,
            ..Default::default()
        };
        let page = gw
            .search(
                params,
                QueryInput::Text(Some(r#"{"eq":{"type":"doc"}}"#.into())),
            )
            .await
            .unwrap();

        assert_eq!(page.total_count, 7);
        let titles: Vec<&str> = page
            .hits
            .iter()
            .map(|h| h.metadata.attributes["title"].as_str().unwrap())
            .collect();
        // g f e d c | b a
        assert_eq!(titles, vec!["b", "a"]);
        assert!(page
            .hits
            .iter()
            .all(|h| h.metadata.attributes["type"] == json!("doc")));
    }

    #[tokio::test]
    async fn test_search_structured_and_text_identical() {
        let gw = gateway().await;
        let query = Query::eq("type", "doc")
            .unwrap()
            .and(Query::contains("title", "a").unwrap().not());
        let text = query.to_string();
        let params = SearchParams {
            sort: Some("title".into()),
            ..Default::default()
        };

        let by_body = gw
            .search(params.clone(), QueryInput::Structured(query))
            .await
            .unwrap();
        let by_text = gw
            .search(params, QueryInput::Text(Some(text)))
            .await
            .unwrap();
        assert_eq!(by_body, by_text);
        assert_eq!(by_body.total_count, 6);
    }

    #[tokio::test]
    async fn test_search_errors_map_to_kinds() {
        let gw = gateway().await;
        let bad_page = SearchParams {
            size: 0,
            ..Default::default()
        };
        assert!(matches!(
            gw.search(bad_page, QueryInput::Text(None)).await,
            Err(GatewayError::InvalidRequest(_))
        ));

        let bad_index = SearchParams {
            index: Some("missing".into()),
            ..Default::default()
        };
        assert!(matches!(
            gw.search(bad_index, QueryInput::Text(None)).await,
            Err(GatewayError::IndexNotFound(_))
        ));
    }

    struct FailingBackend;

    #[async_trait]
    impl RetrievalService for FailingBackend {
        async fn fetch(
            &self,
            _hash: &ContentHash,
            _index: Option<&str>,
            _load_payload: bool,
        ) -> Result<RetrievedObject, ServiceError> {
            Err(anyhow!("operation timed out").into())
        }
    }

    #[async_trait]
    impl SearchService for FailingBackend {
        async fn search(
            &self,
            _index: Option<&str>,
            _page: &PageRequest,
            _query: Option<&Query>,
        ) -> Result<SearchResultPage, ServiceError> {
            Err(anyhow!("connection reset").into())
        }
    }

    #[tokio::test]
    async fn test_backend_failures_pass_through_unmodified() {
        let gw = Gateway::from_engine(Arc::new(FailingBackend));
        match gw.fetch(&ContentHash::from("x"), None).await {
            Err(GatewayError::Unrecovered(e)) => assert_eq!(e.to_string(), "operation timed out"),
            other => panic!("expected Unrecovered, got {:?}", other.map(|r| r.hash)),
        }
        match gw.search(SearchParams::default(), QueryInput::Text(None)).await {
            Err(GatewayError::Unrecovered(e)) => assert_eq!(e.to_string(), "connection reset"),
            other => panic!("expected Unrecovered, got {:?}", other.map(|p| p.total_count)),
        }
    }
}
