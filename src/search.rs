//! Structured metadata search.
//!
//! Application-level entry point for `casg search`. Parameters are
//! normalized exactly like the `GET` search endpoint: the query arrives as
//! optional JSON text and an absent query matches everything. The filter,
//! sort, and pagination algorithm lives in `cas-gateway-core::engine`.

use anyhow::Result;

use cas_gateway_core::models::SearchResultPage;

use crate::config::Config;
use crate::gateway::{connect_gateway, QueryInput, SearchParams};

/// Core search function returning the structured page.
pub async fn search_objects(
    config: &Config,
    params: SearchParams,
    query: Option<String>,
) -> Result<SearchResultPage> {
    let (gateway, pool) = connect_gateway(config).await?;
    let result = gateway.search(params, QueryInput::Text(query)).await;
    pool.close().await;
    Ok(result?)
}

/// CLI entry point for `casg search`. Prints a listing, or the page as JSON.
pub async fn run_search(
    config: &Config,
    params: SearchParams,
    query: Option<String>,
    json: bool,
) -> Result<()> {
    let page = search_objects(config, params, query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.hits.is_empty() {
        println!("No results (total: {}).", page.total_count);
        return Ok(());
    }

    let first = page.page.page_number.saturating_mul(page.page.page_size);
    for (i, hit) in page.hits.iter().enumerate() {
        println!("{}. {} [{}]", first + i as i64 + 1, hit.hash, hit.index_name);
        if let Some(ref ct) = hit.metadata.content_type {
            println!("    content_type: {}", ct);
        }
        for (name, value) in &hit.metadata.attributes {
            println!("    {}: {}", name, value);
        }
        println!("    stored: {}", hit.stored_at);
        println!();
    }
    println!(
        "Showing {} of {} (page {}, size {}).",
        page.hits.len(),
        page.total_count,
        page.page.page_number,
        page.page.page_size
    );

    Ok(())
}
