//! `info` command family: server state inventory.

use anyhow::{Context, Result};
use colored::Colorize;

use yanghook_restconf::RestconfClient;

use crate::cli::InfoDetail;
use crate::config::Config;
use crate::output;

pub async fn run(config: Config, detail: Option<InfoDetail>) -> Result<()> {
    let client = super::connect(&config).await?;

    match detail {
        None => summary(&client).await,
        Some(InfoDetail::Models { mounts }) => {
            let state = client
                .server_state()
                .await
                .context("failed to fetch server state")?;
            output::model_table(&state, mounts);
            Ok(())
        }
        Some(InfoDetail::Datastores) => {
            let state = client
                .server_state()
                .await
                .context("failed to fetch server state")?;
            output::datastore_table(&state.datastores);
            Ok(())
        }
        Some(InfoDetail::Callpoints) => {
            let state = client
                .server_state()
                .await
                .context("failed to fetch server state")?;
            output::callpoint_table(&state.callpoints);
            Ok(())
        }
        Some(InfoDetail::Actionpoints) => {
            let state = client
                .server_state()
                .await
                .context("failed to fetch server state")?;
            output::actionpoint_table(&state.actionpoints);
            Ok(())
        }
        Some(InfoDetail::Api { path }) => {
            let body = client
                .resource(&path)
                .await
                .with_context(|| format!("failed to fetch {path}"))?;
            println!("{body}");
            Ok(())
        }
    }
}

async fn summary(client: &RestconfClient) -> Result<()> {
    let state = client
        .server_state()
        .await
        .context("failed to fetch server state")?;
    let streams = client
        .stream_list()
        .await
        .context("failed to fetch the stream list")?;

    println!("server {}", client.base().to_string().yellow());
    println!("API root {}", client.root().yellow());
    println!("version {}", state.version.yellow());
    println!(
        "{} available stream{}",
        streams.count(),
        output::plural(streams.count()),
    );
    print!(
        "{} loaded data model{}",
        state.models.len(),
        output::plural(state.models.len()),
    );
    if state.mounts.is_empty() {
        println!();
    } else {
        println!(
            " with {} mount{}",
            state.mounts.len(),
            output::plural(state.mounts.len()),
        );
    }
    println!(
        "{} callpoint{}, {} actionpoint{}",
        state.callpoints.len(),
        output::plural(state.callpoints.len()),
        state.actionpoints.len(),
        output::plural(state.actionpoints.len()),
    );
    println!(
        "{} datastore{}",
        state.datastores.len(),
        output::plural(state.datastores.len()),
    );
    Ok(())
}
