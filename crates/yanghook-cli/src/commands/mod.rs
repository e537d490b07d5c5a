//! Command implementations.

pub mod info;
pub mod run;
pub mod streams;

use anyhow::{Context, Result};

use yanghook_restconf::RestconfClient;

use crate::config::Config;

/// Build a client from the configuration and discover the API root.
pub async fn connect(config: &Config) -> Result<RestconfClient> {
    let base = config.server_url()?;
    let mut client = RestconfClient::new(base, config.client_options())
        .context("failed to build HTTP client")?;
    client
        .discover_root()
        .await
        .with_context(|| format!("failed to discover API root at {}", client.base()))?;
    Ok(client)
}
