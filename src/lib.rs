//! # CAS Gateway
//!
//! A content-addressed storage gateway. Objects are stored under the hash of
//! their payload, grouped into named indexes, and served back over HTTP by
//! hash. Object metadata can be searched with a structured JSON query
//! language, with paging and sorting.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────────────┐   ┌──────────┐
//! │   HTTP   │──▶│ Gateway  │──▶│ Retrieval / Search │──▶│  SQLite  │
//! │  (axum)  │   │normalize │   │  Engine<S: Store>  │   │  Store   │
//! └──────────┘   └──────────┘   └────────────────────┘   └──────────┘
//!      ▲              ▲
//!      │         ┌──────────┐
//!      │         │   CLI    │
//!      │         │  (casg)  │
//!      │         └──────────┘
//! ```
//!
//! The query language, pagination, engine, and gateway live in the
//! `cas-gateway-core` crate. This crate adds the SQLite store, config,
//! the HTTP server, and the CLI commands.
//!
//! ## Quick Start
//!
//! ```bash
//! casg init                                   # create database + default index
//! casg put ./docs --meta type=doc             # store files
//! casg search --query '{"eq":{"type":"doc"}}' --sort year --dir DESC
//! casg get <hash> --output out.bin
//! casg serve                                  # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite-backed [`Store`](cas_gateway_core::store::Store) |
//! | [`gateway`] | Gateway wired to the SQLite store |
//! | [`put`] | Storing local files |
//! | [`indexes`] | Index listing and creation |
//! | [`fetch`] | Retrieval by hash |
//! | [`search`] | Structured metadata search |
//! | [`server`] | HTTP server |

pub mod config;
pub mod db;
pub mod fetch;
pub mod gateway;
pub mod indexes;
pub mod migrate;
pub mod put;
pub mod search;
pub mod server;
pub mod sqlite_store;
