//! HTTP gateway server.
//!
//! Exposes the fetch and search operations of the [`Gateway`] over a small
//! JSON/binary HTTP API. Route prefixes come from `[server]` in the config.
//!
//! # Endpoints
//!
//! | Method | Path (default) | Description |
//! |--------|----------------|-------------|
//! | `GET`  | `/query/fetch/{hash}?index=` | Raw payload with its stored content type |
//! | `POST` | `/query/search?index=&page=&size=&sort=&dir=` | Search; query JSON in the body |
//! | `GET`  | `/query/search?index=&page=&size=&sort=&dir=&query=` | Search; query JSON as a parameter |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Both search entries normalize to the same request and return identical
//! pages for identical effective parameters.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "content not found: Qmxxx" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `index_not_found` (404),
//! `internal` (500).

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use cas_gateway_core::models::{ContentHash, SearchResultPage};
use cas_gateway_core::pagination::SortDirection;
use cas_gateway_core::query::Query as SearchQuery;

use crate::config::{Config, ServerConfig};
use crate::db;
use crate::gateway::{sqlite_gateway, Gateway, GatewayError, QueryInput, SearchParams};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    gateway: Gateway,
}

/// Starts the HTTP server.
///
/// Opens one connection pool for the lifetime of the server, binds to
/// `[server].bind`, and serves until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let gateway = sqlite_gateway(config, pool);
    let app = router(&config.server, gateway);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        bind = %config.server.bind,
        fetch = %config.server.fetch_path,
        search = %config.server.search_path,
        "server listening"
    );
    println!("cas-gateway listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the router for a gateway. Exposed for embedding and tests.
pub fn router(server: &ServerConfig, gateway: Gateway) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(&format!("{}/{{hash}}", server.fetch_path), get(handle_fetch))
        .route(
            &server.search_path,
            get(handle_search_get).post(handle_search_post),
        )
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { gateway })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

/// The one place gateway errors become HTTP statuses.
impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(message) => AppError {
                status: StatusCode::NOT_FOUND,
                code: "not_found",
                message,
            },
            GatewayError::IndexNotFound(message) => AppError {
                status: StatusCode::NOT_FOUND,
                code: "index_not_found",
                message,
            },
            GatewayError::Parse(e) => bad_request(e.to_string()),
            GatewayError::InvalidRequest(message) => bad_request(message),
            GatewayError::Unrecovered(e) => {
                tracing::error!(error = %format!("{:#}", e), "backend failure");
                internal(format!("{:#}", e))
            }
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET {fetch_path}/{hash} ============

#[derive(Debug, Deserialize)]
struct FetchParams {
    index: Option<String>,
}

/// Returns the raw payload with a `Content-Type` taken from the stored
/// metadata, or `application/octet-stream` when none is stored.
async fn handle_fetch(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    params: Result<Query<FetchParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = params?;
    let hash = ContentHash::from(hash);

    let fetched = state
        .gateway
        .fetch(&hash, params.index.as_deref())
        .await?;

    let content_type = HeaderValue::from_str(&fetched.content_type).map_err(|_| {
        internal(format!(
            "stored content type for {} is not a valid header value: {:?}",
            hash, fetched.content_type
        ))
    })?;
    tracing::info!(hash = %hash, content_type = %fetched.content_type, bytes = fetched.payload.len(), "fetched");

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        fetched.payload,
    )
        .into_response())
}

// ============ {search_path} ============

/// Query-string parameters of `GET` search: the shared page parameters
/// plus the query as JSON text.
#[derive(Debug, Deserialize)]
struct SearchGetParams {
    index: Option<String>,
    page: Option<i64>,
    size: Option<i64>,
    sort: Option<String>,
    dir: Option<SortDirection>,
    query: Option<String>,
}

impl SearchGetParams {
    fn split(self) -> (SearchParams, Option<String>) {
        let defaults = SearchParams::default();
        let params = SearchParams {
            index: self.index,
            page: self.page.unwrap_or(defaults.page),
            size: self.size.unwrap_or(defaults.size),
            sort: self.sort,
            dir: self.dir.unwrap_or(defaults.dir),
        };
        (params, self.query)
    }
}

async fn handle_search_get(
    State(state): State<AppState>,
    params: Result<Query<SearchGetParams>, QueryRejection>,
) -> Result<Json<SearchResultPage>, AppError> {
    let Query(params) = params?;
    let (params, query) = params.split();
    let page = state
        .gateway
        .search(params, QueryInput::Text(query))
        .await?;
    Ok(Json(page))
}

async fn handle_search_post(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
    body: Result<Json<SearchQuery>, JsonRejection>,
) -> Result<Json<SearchResultPage>, AppError> {
    let Query(params) = params?;
    let Json(query) = body?;
    let page = state
        .gateway
        .search(params, QueryInput::Structured(query))
        .await?;
    Ok(Json(page))
}
