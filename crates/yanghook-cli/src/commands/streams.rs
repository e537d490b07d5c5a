//! `streams` command: list the event streams advertised by the server.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::output;

pub async fn run(config: Config) -> Result<()> {
    let client = super::connect(&config).await?;
    let list = client
        .stream_list()
        .await
        .context("failed to fetch the stream list")?;
    output::stream_table(&list);
    Ok(())
}
