//! Notification classification.
//!
//! Each stream is bound to one [`Handler`] variant at startup. The
//! handler interprets the opaque inner payload of a notification,
//! fills in the structured fields, and returns a loggable summary.
//!
//! "Event shape not recognized" is a valid outcome, reported with a
//! summary and never as an error. An error only means the inner payload
//! was structurally malformed.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use yanghook_core::{Edit, EventType, Notification, Result};

use crate::xml;

/// First element following the mandatory timestamp; the `/` exclusion
/// keeps self-closing events like `<custom-event/>` clean.
static RE_EVENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</eventTime>\s*<([^\s>/]+)").unwrap());

/// Device name embedded in an edit target path.
static RE_DEVICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ncs:device\[ncs:name='([^']+)'\]").unwrap());

const NO_KNOWN_EVENT: &str = "(handler) no known event data found";

/// The classification strategy bound to a stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Handler {
    /// Extract only the outer event name.
    #[default]
    Default,
    /// The commit-queue progress event stream (`ncs-events`).
    CommitQueue,
    /// The NETCONF notification stream (session start, config change).
    ConfigChange,
}

impl Handler {
    /// Classify a notification in place, returning a loggable summary.
    ///
    /// # Errors
    ///
    /// Returns an error only when the inner payload is structurally
    /// malformed (an unterminated element), never for an unrecognized
    /// event shape.
    pub fn classify(&self, notification: &mut Notification) -> Result<String> {
        match self {
            Handler::Default => classify_default(notification),
            Handler::CommitQueue => classify_commit_queue(notification),
            Handler::ConfigChange => classify_config_change(notification),
        }
    }
}

fn classify_default(n: &mut Notification) -> Result<String> {
    if let Some(caps) = RE_EVENT_NAME.captures(&n.inner) {
        n.event_name = caps[1].to_string();
    }
    Ok(format!("inner structure:\n{}", n.inner))
}

fn classify_commit_queue(n: &mut Notification) -> Result<String> {
    let inner = n.inner.clone();
    let Some(progress) = xml::find_element(&inner, "ncs-commit-queue-progress-event")? else {
        return Ok(NO_KNOWN_EVENT.to_string());
    };

    n.set_event_type(EventType::CommitQueueProgress);
    let id = xml::find_text(progress, "id")?.unwrap_or("0");
    let tag = xml::find_text(progress, "tag")?.unwrap_or("");
    let state = xml::find_text(progress, "state")?.unwrap_or("");

    // Only fully completed devices make the affected list. The scan is
    // limited to direct children: completed-services and failed-services
    // carry their own completed-devices lists which do not count here.
    for completed in xml::find_children(progress, "completed-devices")? {
        if let Some(name) = xml::find_text(completed, "name")? {
            n.add_device(name);
        }
    }

    Ok(format!("[{}] [id {}] {} - {}", n.event_type, id, tag, state))
}

fn classify_config_change(n: &mut Notification) -> Result<String> {
    let inner = n.inner.clone();

    if let Some(start) = xml::find_element(&inner, "netconf-session-start")? {
        n.set_event_type(EventType::SessionStart);
        n.user = xml::find_text(start, "username")?.map(str::to_string);
        n.user_host = xml::find_text(start, "source-host")?.map(str::to_string);
        return Ok(format!(
            "[{}] [user {}@{}]",
            n.event_type,
            n.user.as_deref().unwrap_or(""),
            n.user_host.as_deref().unwrap_or("")
        ));
    }

    let Some(change) = xml::find_element(&inner, "netconf-config-change")? else {
        return Ok(NO_KNOWN_EVENT.to_string());
    };

    n.set_event_type(EventType::ConfigChange);
    if let Some(changed_by) = xml::find_element(change, "changed-by")? {
        n.user = xml::find_text(changed_by, "username")?.map(str::to_string);
        n.user_host = xml::find_text(changed_by, "source-host")?.map(str::to_string);
    }
    n.datastore = xml::find_text(change, "datastore")?.map(str::to_string);

    let mut summary = format!(
        "[{}] [user {}@{}]",
        n.event_type,
        n.user.as_deref().unwrap_or(""),
        n.user_host.as_deref().unwrap_or("")
    );

    for edit_xml in xml::find_elements(change, "edit")? {
        let edit = Edit {
            target: xml::find_text(edit_xml, "target")?.unwrap_or("").to_string(),
            operation: xml::find_text(edit_xml, "operation")?.unwrap_or("").to_string(),
        };
        let device = RE_DEVICE
            .captures(&edit.target)
            .map(|caps| caps[1].to_string());
        write!(summary, "\n{}: {}", edit.operation, edit.target).ok();
        n.add_edit(device.as_deref(), edit);
    }

    Ok(summary)
}

/// Handler registry keyed by exact stream name, consulted once when the
/// subscriber set is built.
#[derive(Clone, Debug)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Handler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        let mut handlers = BTreeMap::new();
        handlers.insert("ncs-events".to_string(), Handler::CommitQueue);
        handlers.insert("NETCONF".to_string(), Handler::ConfigChange);
        Self { handlers }
    }
}

impl HandlerRegistry {
    /// Register (or override) the handler for a stream name.
    pub fn with_handler(mut self, stream_name: impl Into<String>, handler: Handler) -> Self {
        self.handlers.insert(stream_name.into(), handler);
        self
    }

    /// The handler bound to `stream_name`; unknown streams get
    /// [`Handler::Default`].
    pub fn handler_for(&self, stream_name: &str) -> Handler {
        self.handlers.get(stream_name).copied().unwrap_or_default()
    }
}
