//! Stream subscriber: decode loop and dispatch loop.
//!
//! One subscriber owns one long-lived connection to one stream access
//! URL. The decode loop frames the byte stream into notification units
//! and feeds a capacity-1 queue; the dispatch loop drains the queue,
//! classifies each unit, and fans out to matching webhooks. Per-
//! notification work runs on spawned fire-and-forget tasks, so delivery
//! is best-effort and notifications on the same stream may complete out
//! of order.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use url::Url;

use yanghook_core::error::DecodeError;
use yanghook_core::{Error, Notification, Result, Stream};

use crate::classify::Handler;
use crate::client::RestconfClient;
use crate::dispatch;
use crate::xml;

/// Runtime state for one stream subscription.
#[derive(Clone, Debug)]
pub struct Subscriber {
    pub stream: Arc<Stream>,
    pub access: Url,
    pub handler: Handler,
}

impl Subscriber {
    /// Run the subscription until cancellation, connection loss, or a
    /// framing error. Returns the number of events processed and the
    /// terminal outcome; cancellation is a clean shutdown, not an error.
    pub async fn run(
        self,
        client: RestconfClient,
        mut cancel: broadcast::Receiver<()>,
    ) -> (u64, Result<()>) {
        info!(stream = %self.stream.name, url = %self.access, "subscribing");

        let response = match client.open_stream(&self.access).await {
            Ok(response) => response,
            Err(e) => return (0, Err(e)),
        };

        // Capacity 1: the decode loop stays at most one unit ahead
        let (tx, mut rx) = mpsc::channel::<Notification>(1);
        let stream_name = self.stream.name.clone();
        let decode = tokio::spawn(decode_loop(response, tx, stream_name));

        let source = authority(&self.access);
        let mut count: u64 = 0;
        let result = loop {
            tokio::select! {
                _ = cancel.recv() => break Ok(()),
                next = rx.recv() => match next {
                    None => break Err(Error::Decode(DecodeError::ChannelClosed)),
                    Some(notification) => {
                        count += 1;
                        let stream = Arc::clone(&self.stream);
                        let http = client.http().clone();
                        let timeout = client.webhook_timeout();
                        let source = source.clone();
                        let handler = self.handler;
                        tokio::spawn(async move {
                            handle_notification(stream, handler, http, timeout, source, notification)
                                .await;
                        });
                    }
                }
            }
        };

        // Drops the connection along with the decode task
        decode.abort();
        (count, result)
    }
}

/// Classify one notification and fire the matching webhooks.
async fn handle_notification(
    stream: Arc<Stream>,
    handler: Handler,
    http: reqwest::Client,
    timeout: Duration,
    source: String,
    mut notification: Notification,
) {
    let summary = match handler.classify(&mut notification) {
        Ok(summary) => summary,
        Err(e) => {
            // The notification is dropped; the subscriber keeps running
            error!(stream = %stream.name, error = %e, "handler error");
            return;
        }
    };
    info!(
        stream = %stream.name,
        time = %notification.event_time.to_rfc3339(),
        "{}",
        summary
    );

    if stream.webhooks.is_empty() {
        return;
    }

    let enriched = notification.enrich(&source, &stream.name);
    let body = match serde_json::to_vec(&enriched) {
        Ok(body) => body,
        Err(e) => {
            error!(stream = %stream.name, error = %e, "cannot encode webhook payload");
            return;
        }
    };

    for hook in &stream.webhooks {
        if hook.should_fire(&notification, &notification.inner) {
            let hook = Arc::clone(hook);
            let http = http.clone();
            let body = body.clone();
            let stream_name = stream.name.clone();
            tokio::spawn(async move {
                dispatch::fire(&http, &hook, &stream_name, body, timeout).await;
            });
        }
    }
}

/// Frame the response byte stream into notifications and push them onto
/// the queue. Ends on connection loss or a malformed frame; either way
/// the queue closes when this returns.
async fn decode_loop(
    response: reqwest::Response,
    tx: mpsc::Sender<Notification>,
    stream_name: String,
) {
    let mut body = response.bytes_stream();
    let mut bytes: Vec<u8> = Vec::new();
    let mut raw = String::new();
    let mut cleaned = String::new();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!(stream = %stream_name, error = %e, "event stream read failed");
                return;
            }
        };
        bytes.extend_from_slice(&chunk);
        drain_utf8(&mut bytes, &mut raw);
        drain_lines(&mut raw, &mut cleaned);
        if !pump(&mut cleaned, &tx, &stream_name).await {
            return;
        }
    }

    // Connection closed; flush whatever remains
    raw.push_str(&String::from_utf8_lossy(&bytes));
    if !raw.is_empty() {
        cleaned.push_str(strip_data_prefix(&raw));
    }
    pump(&mut cleaned, &tx, &stream_name).await;
    debug!(stream = %stream_name, "event stream closed");
}

/// Move the longest valid UTF-8 prefix of `bytes` into `out`.
///
/// A multi-byte character split across network chunks stays buffered
/// until its remaining bytes arrive; genuinely invalid sequences decode
/// as U+FFFD so the loop always makes progress.
fn drain_utf8(bytes: &mut Vec<u8>, out: &mut String) {
    loop {
        let err = match std::str::from_utf8(bytes) {
            Ok(s) => {
                out.push_str(s);
                bytes.clear();
                return;
            }
            Err(err) => err,
        };
        let valid = err.valid_up_to();
        if let Ok(s) = std::str::from_utf8(&bytes[..valid]) {
            out.push_str(s);
        }
        match err.error_len() {
            Some(bad) => {
                out.push(char::REPLACEMENT_CHARACTER);
                bytes.drain(..valid + bad);
            }
            // Incomplete trailing sequence; wait for the next chunk
            None => {
                bytes.drain(..valid);
                return;
            }
        }
    }
}

/// Extract all complete notification units from the buffer. Returns
/// false when the decode loop should stop.
async fn pump(buffer: &mut String, tx: &mpsc::Sender<Notification>, stream_name: &str) -> bool {
    loop {
        match frame_next(buffer) {
            Ok(None) => return true,
            Ok(Some((notification, consumed))) => {
                buffer.drain(..consumed);
                // Blocks while the dispatch loop is busy (capacity 1)
                if tx.send(notification).await.is_err() {
                    return false;
                }
            }
            Err(e) => {
                // No partial-unit recovery is attempted
                warn!(stream = %stream_name, error = %e, "malformed notification frame");
                return false;
            }
        }
    }
}

/// Frame the next complete notification unit, if the buffer holds one.
///
/// The outer schema is generic: a `<notification>` element whose content
/// starts with the mandatory `<eventTime>` field, followed by one opaque
/// event-specific substructure kept verbatim.
fn frame_next(buffer: &str) -> Result<Option<(Notification, usize)>> {
    let span = match xml::find_span(buffer, "notification") {
        Ok(Some(span)) => span,
        Ok(None) => return pending(buffer),
        // Open tag seen but the unit is still arriving
        Err(Error::Decode(DecodeError::UnterminatedElement { .. })) => return pending(buffer),
        Err(e) => return Err(e),
    };

    let inner = &buffer[span.content_start..span.content_end];
    let event_time = xml::find_text(inner, "eventTime")?.ok_or(DecodeError::MissingEventTime)?;
    let event_time = DateTime::parse_from_rfc3339(event_time)
        .map_err(|e| DecodeError::BadEventTime {
            value: event_time.to_string(),
            reason: e.to_string(),
        })?
        .with_timezone(&Utc);

    Ok(Some((
        Notification::new(event_time, inner.to_string()),
        span.end,
    )))
}

/// A partial unit may never exceed this; a stream that opens a
/// notification and never closes it would otherwise grow the buffer
/// without bound.
const MAX_FRAME_BYTES: usize = 1 << 20;

/// "No complete unit yet", unless the buffer has outgrown the limit.
fn pending(buffer: &str) -> Result<Option<(Notification, usize)>> {
    if buffer.len() > MAX_FRAME_BYTES {
        return Err(DecodeError::FrameTooLarge {
            limit: MAX_FRAME_BYTES,
        }
        .into());
    }
    Ok(None)
}

/// Move complete lines from `raw` to `cleaned`, stripping SSE framing.
fn drain_lines(raw: &mut String, cleaned: &mut String) {
    while let Some(pos) = raw.find('\n') {
        {
            let line = raw[..pos].trim_end_matches('\r');
            cleaned.push_str(strip_data_prefix(line));
            cleaned.push('\n');
        }
        raw.drain(..=pos);
    }
}

/// Strip the SSE `data:` marker from one line.
fn strip_data_prefix(line: &str) -> &str {
    match line.strip_prefix("data:") {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => line,
    }
}

/// `host:port` of the access URL, reported as the event source.
fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
