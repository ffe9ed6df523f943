//! Object retrieval by content hash.
//!
//! Used by the `casg get` CLI command. The HTTP fetch endpoint goes through
//! the same [`Gateway`](crate::gateway::Gateway) calls.
//!
//! # Usage
//!
//! ```bash
//! # Write the payload to stdout
//! casg get 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824 > hello.txt
//!
//! # Show metadata only (payload is not loaded)
//! casg get 2cf24dba... --metadata-only
//! ```

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use cas_gateway_core::models::ContentHash;

use crate::config::Config;
use crate::gateway::{connect_gateway, resolve_content_type, GatewayError};

/// CLI entry point for `casg get <hash>`.
pub async fn run_get(
    config: &Config,
    hash: &str,
    index: Option<&str>,
    metadata_only: bool,
    output: Option<&Path>,
) -> Result<()> {
    let (gateway, pool) = connect_gateway(config).await?;
    let hash = ContentHash::from(hash);

    if metadata_only {
        let result = gateway.fetch_metadata(&hash, index).await;
        pool.close().await;
        let object = exit_on_not_found(result)?;

        println!("--- Object ---");
        println!("hash:         {}", object.hash);
        println!("index:        {}", object.index_name);
        println!("content_type: {}", resolve_content_type(&object.metadata));
        println!(
            "attributes:   {}",
            serde_json::to_string(&object.metadata.attributes)?
        );
        return Ok(());
    }

    let result = gateway.fetch(&hash, index).await;
    pool.close().await;
    let response = exit_on_not_found(result)?;

    match output {
        Some(path) => {
            std::fs::write(path, &response.payload)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "wrote {} bytes ({}) to {}",
                response.payload.len(),
                response.content_type,
                path.display()
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&response.payload)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Not-found is a user error: report it and exit non-zero. Everything else
/// propagates.
fn exit_on_not_found<T>(result: Result<T, GatewayError>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(GatewayError::NotFound(msg)) => {
            eprintln!("Error: {}", msg);
            std::process::exit(1);
        }
        Err(other) => Err(other.into()),
    }
}
