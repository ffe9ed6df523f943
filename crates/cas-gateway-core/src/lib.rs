//! # cas-gateway core
//!
//! Shared, WASM-safe logic for cas-gateway: the data model, the query
//! language, pagination, the store abstraction, the reference engine, and
//! the gateway orchestration layer.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem dependencies.
//! Transports (the `casg` CLI and HTTP server) live in the `cas-gateway`
//! crate and only talk to [`gateway::Gateway`].

pub mod engine;
pub mod error;
pub mod gateway;
pub mod models;
pub mod pagination;
pub mod query;
pub mod service;
pub mod store;
