//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Subscribe to RESTCONF event streams and fire webhooks.
#[derive(Parser, Debug)]
#[command(name = "yanghook")]
#[command(author, about, long_about = None)]
#[command(version = env!("YANGHOOK_VERSION"))]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to the configuration file (default: ./yanghook.yaml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the RESTCONF server
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Username for basic authentication
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Password for basic authentication
    #[arg(short, long, global = true)]
    pub password: Option<String>,

    /// Subscribe to a specific stream (repeatable; default: all advertised)
    #[arg(long = "stream", value_name = "NAME")]
    pub streams: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the event streams advertised by the server
    #[command(alias = "ls")]
    Streams,

    /// Show server state information
    Info {
        #[command(subcommand)]
        detail: Option<InfoDetail>,
    },
}

#[derive(Subcommand, Debug)]
pub enum InfoDetail {
    /// Show loaded data models
    #[command(alias = "m")]
    Models {
        /// Show mount detail per model
        #[arg(short, long)]
        mounts: bool,
    },

    /// Show CDB datastores
    #[command(aliases = ["data", "d"])]
    Datastores,

    /// Show registered callpoints
    #[command(aliases = ["call", "c"])]
    Callpoints,

    /// Show registered actionpoints
    #[command(aliases = ["action", "a"])]
    Actionpoints,

    /// Dump the raw response for a data path under the API root
    Api {
        /// Data path, e.g. /data/ietf-yang-library:modules-state
        path: String,
    },
}
