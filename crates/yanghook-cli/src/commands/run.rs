//! Default command: subscribe to streams and fire webhooks.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use tracing::info;

use yanghook_restconf::{HandlerRegistry, SubscriberSet, attach_webhooks};

use crate::config::Config;
use crate::output;

pub async fn run(config: Config) -> Result<()> {
    let client = super::connect(&config).await?;

    let mut list = client
        .stream_list()
        .await
        .context("failed to fetch the stream list")?;
    info!(streams = list.count(), "fetched advertised streams");

    attach_webhooks(&mut list, config.webhooks);
    for stream in &list.streams {
        if !stream.webhooks.is_empty() {
            output::stream_summary(stream);
        }
    }

    let registry = HandlerRegistry::default();
    let set = SubscriberSet::build(&config.streams, list, &registry)
        .context("cannot subscribe to the requested streams")?;
    if set.is_empty() {
        bail!("no streams to subscribe to");
    }

    eprintln!(
        "{} {} subscriber{} on {}",
        "starting".green(),
        set.len(),
        output::plural(set.len()),
        client.base(),
    );
    eprintln!("{}", "Press Ctrl+C to stop.".dimmed());

    set.run(&client).await;
    Ok(())
}
