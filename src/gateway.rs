//! Wires the core [`Gateway`] to the SQLite store.

use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;

pub use cas_gateway_core::gateway::{
    normalize_search, resolve_content_type, FetchResponse, Gateway, GatewayError,
    NormalizedSearch, QueryInput, SearchParams, DEFAULT_CONTENT_TYPE,
};
use cas_gateway_core::engine::Engine;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Build a gateway over an existing pool.
pub fn sqlite_gateway(config: &Config, pool: SqlitePool) -> Gateway {
    let engine = Engine::new(SqliteStore::new(pool), config.storage.engine_settings());
    Gateway::from_engine(Arc::new(engine))
}

/// Connect to the configured database and build a gateway over it.
///
/// The pool is returned so short-lived callers (the CLI) can close it.
pub async fn connect_gateway(config: &Config) -> Result<(Gateway, SqlitePool)> {
    let pool = db::connect(config).await?;
    Ok((sqlite_gateway(config, pool.clone()), pool))
}
