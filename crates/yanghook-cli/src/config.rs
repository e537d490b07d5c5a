//! Configuration file loading and CLI overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use yanghook_core::{ServerUrl, Webhook};
use yanghook_restconf::ClientOptions;

use crate::cli::Cli;

/// Default config file looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "yanghook.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,

    /// Streams to subscribe to. Empty means all advertised streams.
    pub streams: Vec<String>,

    pub webhooks: Vec<Webhook>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Base URL of the RESTCONF server.
    pub api: String,

    pub user: String,
    pub password: String,

    /// Timeout for webhook deliveries, in seconds.
    pub connect_timeout_secs: u64,

    /// Timeout for metadata requests, in seconds. Event stream reads
    /// are not subject to this.
    pub read_timeout_secs: u64,

    /// Skip TLS certificate verification.
    pub insecure: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api: "http://127.0.0.1:8080".to_string(),
            user: "admin".to_string(),
            password: "admin".to_string(),
            connect_timeout_secs: 3,
            read_timeout_secs: 600,
            insecure: false,
        }
    }
}

impl Config {
    /// Load configuration: the explicit `--config` path if given, else
    /// `./yanghook.yaml` if present, else built-in defaults. Environment
    /// variables and CLI flags are applied on top.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match cli.config.as_deref() {
            Some(path) => Self::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(&default)
                        .with_context(|| format!("failed to load config from {DEFAULT_CONFIG_FILE}"))?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(user) = std::env::var("YANGHOOK_USER") {
            config.server.user = user;
        }
        if let Ok(password) = std::env::var("YANGHOOK_PASSWORD") {
            config.server.password = password;
        }

        if let Some(url) = &cli.url {
            config.server.api = url.clone();
        }
        if let Some(user) = &cli.user {
            config.server.user = user.clone();
        }
        if let Some(password) = &cli.password {
            config.server.password = password.clone();
        }
        if !cli.streams.is_empty() {
            config.streams = cli.streams.clone();
        }

        config.check()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&raw)?;
        Ok(config)
    }

    /// Reject configurations that can never work. A webhook without a
    /// stream or URL is a typo, not a preference.
    fn check(&self) -> Result<()> {
        for (i, hook) in self.webhooks.iter().enumerate() {
            if hook.stream.is_empty() {
                bail!("webhook #{} has no stream", i + 1);
            }
            if hook.url.is_empty() {
                bail!("webhook '{}' has no url", hook.stream);
            }
        }
        Ok(())
    }

    pub fn server_url(&self) -> Result<ServerUrl> {
        ServerUrl::new(&self.server.api)
            .with_context(|| format!("invalid server URL '{}'", self.server.api))
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            user: self.server.user.clone(),
            password: self.server.password.clone(),
            request_timeout: Duration::from_secs(self.server.read_timeout_secs),
            webhook_timeout: Duration::from_secs(self.server.connect_timeout_secs),
            insecure: self.server.insecure,
        }
    }
}
