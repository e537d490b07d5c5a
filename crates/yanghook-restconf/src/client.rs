//! RESTCONF HTTP client.
//!
//! Covers the three server interactions: root-resource discovery via
//! host-meta, stream inventory retrieval, and opening the long-lived
//! event stream connections. All requests use HTTP basic authentication.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use tracing::{debug, instrument, trace};
use url::Url;

use yanghook_core::error::{ProtocolError, TransportError};
use yanghook_core::{Access, Encoding, Error, Result, ServerUrl, Stream, StreamList};

use crate::state::ServerState;
use crate::xml;

/// Well-known path for API root discovery.
const HOST_META_PATH: &str = "/.well-known/host-meta";

/// Stream inventory path, relative to the discovered root.
const STREAM_LIST_PATH: &str = "/data/ietf-restconf-monitoring:restconf-state/streams";

/// Server state path, relative to the discovered root.
const SERVER_STATE_PATH: &str = "/data/tailf-ncs-monitoring:ncs-state";

const YANG_DATA_XML: &str = "application/yang-data+xml";

static RE_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<Link\b[^>]*>").unwrap());
static RE_REL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"rel="([^"]*)""#).unwrap());
static RE_HREF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href="([^"]*)""#).unwrap());

/// Connection options for [`RestconfClient::new`].
#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub user: String,
    pub password: String,
    /// Timeout for metadata requests. Event stream connections are
    /// exempt.
    pub request_timeout: Duration,
    /// Timeout for one webhook delivery, connect through response.
    pub webhook_timeout: Duration,
    /// Accept invalid TLS certificates. Off by default.
    pub insecure: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            user: "admin".to_string(),
            password: "admin".to_string(),
            request_timeout: Duration::from_secs(600),
            webhook_timeout: Duration::from_secs(3),
            insecure: false,
        }
    }
}

/// HTTP client bound to one RESTCONF server.
#[derive(Clone, Debug)]
pub struct RestconfClient {
    http: reqwest::Client,
    base: ServerUrl,
    user: String,
    password: String,
    request_timeout: Duration,
    webhook_timeout: Duration,
    /// Discovered API root path (usually `/restconf`).
    root: String,
}

impl RestconfClient {
    /// Create a new client for the given server.
    pub fn new(base: ServerUrl, options: ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("yanghook/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(options.insecure)
            .build()
            .map_err(|e| TransportError::Http {
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base,
            user: options.user,
            password: options.password,
            request_timeout: options.request_timeout,
            webhook_timeout: options.webhook_timeout,
            root: String::new(),
        })
    }

    /// The server base URL.
    pub fn base(&self) -> &ServerUrl {
        &self.base
    }

    /// The discovered API root path; empty before [`discover_root`](Self::discover_root).
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Set the API root directly, skipping discovery.
    pub fn set_root(&mut self, root: impl Into<String>) {
        self.root = root.into();
    }

    /// The configured metadata request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// The configured webhook delivery timeout.
    pub fn webhook_timeout(&self) -> Duration {
        self.webhook_timeout
    }

    /// The underlying HTTP client, shared with the webhook dispatcher.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Discover the API root resource from `/.well-known/host-meta`.
    ///
    /// The root is the basis for all data requests; it is usually
    /// `/restconf` but is server-configurable.
    #[instrument(skip(self), fields(server = %self.base))]
    pub async fn discover_root(&mut self) -> Result<()> {
        let url = self.base.join(HOST_META_PATH);
        let (body, content_type) = self.fetch(&url, YANG_DATA_XML).await?;

        if !content_type.contains("xml") {
            return Err(ProtocolError::UnexpectedContent {
                expected: "XML".to_string(),
                got: content_type,
            }
            .into());
        }

        for link in RE_LINK.find_iter(&body) {
            let tag = link.as_str();
            let rel = RE_REL.captures(tag).map(|c| c[1].to_string());
            if rel.as_deref() == Some("restconf")
                && let Some(href) = RE_HREF.captures(tag)
            {
                self.root = href[1].to_string();
                debug!(root = %self.root, "discovered API root");
                return Ok(());
            }
        }

        Err(ProtocolError::RootResourceMissing.into())
    }

    /// Retrieve the server's advertised event streams.
    #[instrument(skip(self), fields(server = %self.base))]
    pub async fn stream_list(&self) -> Result<StreamList> {
        let url = self.base.join(&format!("{}{}", self.root, STREAM_LIST_PATH));
        let (body, _) = self.fetch(&url, YANG_DATA_XML).await?;
        trace!(body = %body, "stream list response");

        let mut streams = Vec::new();
        for stream_xml in xml::find_elements(&body, "stream")? {
            let Some(name) = xml::find_text(stream_xml, "name")? else {
                continue;
            };
            let mut stream = Stream {
                name: name.to_string(),
                description: xml::find_text(stream_xml, "description")?
                    .unwrap_or("")
                    .to_string(),
                replay_support: xml::find_text(stream_xml, "replay-support")? == Some("true"),
                ..Default::default()
            };
            for access_xml in xml::find_elements(stream_xml, "access")? {
                let encoding = xml::find_text(access_xml, "encoding")?.unwrap_or("");
                let Some(location) = xml::find_text(access_xml, "location")? else {
                    continue;
                };
                stream.access.push(Access {
                    encoding: Encoding::parse(encoding),
                    location: self.base.rebase(location)?,
                });
            }
            streams.push(stream);
        }

        debug!(count = streams.len(), "retrieved stream list");
        Ok(StreamList { streams })
    }

    /// Retrieve the server's monitoring state snapshot.
    #[instrument(skip(self), fields(server = %self.base))]
    pub async fn server_state(&self) -> Result<ServerState> {
        let url = self.base.join(&format!("{}{}", self.root, SERVER_STATE_PATH));
        let (body, _) = self.fetch(&url, YANG_DATA_XML).await?;
        trace!(body = %body, "server state response");
        ServerState::parse(&body)
    }

    /// Raw GET of an arbitrary data path under the API root.
    pub async fn resource(&self, path: &str) -> Result<String> {
        let url = self.base.join(&format!("{}{}", self.root, path));
        let (body, _) = self.fetch(&url, YANG_DATA_XML).await?;
        Ok(body)
    }

    /// Open a long-lived event stream connection.
    ///
    /// The response body is a chunked SSE-style stream; no read timeout
    /// is applied.
    #[instrument(skip(self))]
    pub async fn open_stream(&self, location: &Url) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(location.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .header(CONNECTION, "keep-alive")
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProtocolError::Status {
                status: status.as_u16(),
                message,
            }
            .into());
        }
        Ok(response)
    }

    /// Raw GET of one resource, returning the body and its content type.
    async fn fetch(&self, url: &str, accept: &str) -> Result<(String, String)> {
        debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .header(ACCEPT, accept)
            .basic_auth(&self.user, Some(&self.password))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.text().await.map_err(map_transport)?;

        if !status.is_success() {
            return Err(ProtocolError::Status {
                status: status.as_u16(),
                message: body,
            }
            .into());
        }
        Ok((body, content_type))
    }
}

/// Map a reqwest error into the transport taxonomy.
pub(crate) fn map_transport(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        TransportError::Timeout.into()
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
        .into()
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
        .into()
    }
}
