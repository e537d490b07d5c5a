//! Decoded event notifications.
//!
//! The outer notification format is defined in RFC 7950, section 4.2.10:
//! the only mandatory field is `eventTime`, followed by exactly one
//! event-specific substructure. Everything after the timestamp is kept
//! verbatim in [`Notification::inner`] so filters can match against the
//! raw text and webhooks can carry the original event downstream.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Semantic event classification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EventType {
    #[default]
    Unknown,
    CommitQueueProgress,
    SessionStart,
    ConfigChange,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Unknown => "unknown",
            EventType::CommitQueueProgress => "ncs-commit-queue-progress",
            EventType::SessionStart => "netconf-session-start",
            EventType::ConfigChange => "netconf-config-change",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded configuration change: a target path and the operation
/// applied to it. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Edit {
    pub target: String,
    pub operation: String,
}

/// Group key for edits whose target carries no device name.
pub const UNGROUPED: &str = "none";

/// One decoded unit of the event stream.
///
/// Created fresh per received notification and discarded after dispatch.
/// The flat [`edits`](Self::edits) list and the grouped
/// [`device_edits`](Self::device_edits) view stay consistent: every edit
/// lives in exactly one group, keyed by its device name or [`UNGROUPED`].
#[derive(Clone, Debug)]
pub struct Notification {
    pub event_time: DateTime<Utc>,
    pub event_name: String,
    pub event_type: EventType,
    pub user: Option<String>,
    pub user_host: Option<String>,
    pub datastore: Option<String>,
    /// Affected device names, sorted and de-duplicated.
    pub devices: Vec<String>,
    pub edits: Vec<Edit>,
    pub device_edits: BTreeMap<String, Vec<Edit>>,
    /// The original payload following the outer tag, SSE markers removed.
    pub inner: String,
}

impl Notification {
    pub fn new(event_time: DateTime<Utc>, inner: String) -> Self {
        Self {
            event_time,
            event_name: EventType::Unknown.as_str().to_string(),
            event_type: EventType::Unknown,
            user: None,
            user_host: None,
            datastore: None,
            devices: Vec::new(),
            edits: Vec::new(),
            device_edits: BTreeMap::new(),
            inner,
        }
    }

    /// Set the event type and keep the name in sync.
    pub fn set_event_type(&mut self, event_type: EventType) {
        self.event_type = event_type;
        self.event_name = event_type.as_str().to_string();
    }

    /// Record an affected device, keeping the list sorted and unique.
    pub fn add_device(&mut self, name: &str) {
        if let Err(index) = self.devices.binary_search_by(|d| d.as_str().cmp(name)) {
            self.devices.insert(index, name.to_string());
        }
    }

    /// Record one edit, grouped under `device` (or [`UNGROUPED`]).
    pub fn add_edit(&mut self, device: Option<&str>, edit: Edit) {
        let key = match device {
            Some(name) => {
                self.add_device(name);
                name
            }
            None => UNGROUPED,
        };
        self.device_edits
            .entry(key.to_string())
            .or_default()
            .push(edit.clone());
        self.edits.push(edit);
    }

    /// Build the enriched outbound payload for webhook delivery.
    ///
    /// The full original event body rides along under `event`, wrapped so
    /// downstream consumers get a single well-formed XML document.
    pub fn enrich<'a>(&'a self, source: &'a str, stream: &'a str) -> EnrichedEvent<'a> {
        EnrichedEvent {
            source,
            stream,
            eventname: &self.event_name,
            user: self.user.as_deref(),
            host: self.user_host.as_deref(),
            datastore: self.datastore.as_deref(),
            devices: &self.devices,
            edits: &self.device_edits,
            event: format!("<event>{}</event>", self.inner),
        }
    }
}

/// The enriched JSON document POSTed to webhook targets.
///
/// Serialized with serde_json, which never HTML-escapes `<`, `>`, or `&`,
/// so the embedded XML event stays byte-faithful.
#[derive(Debug, Serialize)]
pub struct EnrichedEvent<'a> {
    pub source: &'a str,
    pub stream: &'a str,
    pub eventname: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datastore: Option<&'a str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub devices: &'a [String],
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub edits: &'a BTreeMap<String, Vec<Edit>>,
    pub event: String,
}
