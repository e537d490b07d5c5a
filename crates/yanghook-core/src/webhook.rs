//! Webhook definitions and the filter engine.
//!
//! A webhook is an outbound HTTP callback attached to one or more streams
//! by fuzzy name match. Its optional filter restricts which notifications
//! trigger it: an event-name constraint plus an ordered list of node
//! conditions, all of which must hold.

use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::error::{Error, InvalidInputError};
use crate::notification::Notification;

/// One node condition inside a filter.
///
/// A condition with a value requires a `<name>` element whose inner text
/// matches the value (the value is itself a regular expression). A
/// condition without a value only requires the element to be present.
#[derive(Clone, Debug, Deserialize)]
pub struct FilterNode {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl FilterNode {
    /// Evaluate this condition against the raw payload text.
    fn matches(&self, raw: &str) -> bool {
        let pattern = match &self.value {
            Some(value) => format!("<{}[^>]*>{}</{}>", self.name, value, self.name),
            // Node must be present, value irrelevant
            None => format!("<{}[\\s>]", self.name),
        };
        match Regex::new(&pattern) {
            Ok(re) => re.is_match(raw),
            // Uncompilable patterns are caught at validation; a hook that
            // slipped through never fires.
            Err(_) => false,
        }
    }
}

/// A predicate restricting which notifications trigger a webhook.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Filter {
    /// Required classified event name, if any.
    #[serde(default)]
    pub event: Option<String>,
    /// Node conditions, evaluated in order. All must hold.
    #[serde(default)]
    pub nodes: Vec<FilterNode>,
}

impl Filter {
    /// Check that every value pattern compiles.
    pub fn validate(&self) -> Result<(), Error> {
        for node in &self.nodes {
            if let Some(value) = &node.value {
                Regex::new(value).map_err(|e| InvalidInputError::FilterPattern {
                    pattern: value.clone(),
                    reason: e.to_string(),
                })?;
            }
        }
        Ok(())
    }

    /// Evaluate the filter against a classified notification and the raw
    /// payload text. Short-circuits on the first failing condition.
    pub fn matches(&self, notification: &Notification, raw: &str) -> bool {
        if let Some(event) = &self.event
            && *event != notification.event_name
        {
            return false;
        }
        self.nodes.iter().all(|node| node.matches(raw))
    }
}

/// An outbound HTTP callback definition.
#[derive(Clone, Debug, Deserialize)]
pub struct Webhook {
    /// Requested stream name, resolved by fuzzy match at startup.
    /// Defaulted so configuration checks can report the omission
    /// themselves instead of failing inside deserialization.
    #[serde(default)]
    pub stream: String,
    /// Target URL as configured.
    #[serde(default)]
    pub url: String,
    /// Bearer token sent in the `token` header, if any.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub disable: bool,
    #[serde(default)]
    pub filter: Option<Filter>,
    /// Parsed target, set by [`validate`](Self::validate).
    #[serde(skip)]
    pub target: Option<Url>,
}

impl Webhook {
    /// Validate the target URL and filter patterns, filling in
    /// [`target`](Self::target) on success.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or a filter value is
    /// not a valid regular expression. Callers disable the hook on error;
    /// a webhook that fails validation is excluded from every fire
    /// decision.
    pub fn validate(&mut self) -> Result<(), Error> {
        let target = Url::parse(&self.url).map_err(|e| InvalidInputError::WebhookUrl {
            value: self.url.clone(),
            reason: e.to_string(),
        })?;
        if let Some(filter) = &self.filter {
            filter.validate()?;
        }
        self.target = Some(target);
        Ok(())
    }

    /// Should this webhook fire for the given notification?
    pub fn should_fire(&self, notification: &Notification, raw: &str) -> bool {
        if self.disable || self.target.is_none() {
            return false;
        }
        match &self.filter {
            None => true,
            Some(filter) => filter.matches(notification, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::EventType;
    use chrono::Utc;

    fn notification(event_type: EventType, inner: &str) -> Notification {
        let mut n = Notification::new(Utc::now(), inner.to_string());
        n.set_event_type(event_type);
        n
    }

    fn hook(url: &str, filter: Option<Filter>) -> Webhook {
        Webhook {
            stream: "NETCONF".to_string(),
            url: url.to_string(),
            token: None,
            disable: false,
            filter,
            target: None,
        }
    }

    #[test]
    fn no_filter_always_matches() {
        let mut w = hook("http://ci.example.com/hook", None);
        w.validate().unwrap();
        let n = notification(EventType::Unknown, "<anything/>");
        assert!(w.should_fire(&n, &n.inner));
    }

    #[test]
    fn empty_filter_matches_any_payload() {
        let filter = Filter::default();
        let n = notification(EventType::ConfigChange, "<whatever>x</whatever>");
        assert!(filter.matches(&n, &n.inner));
    }

    #[test]
    fn event_name_mismatch_fails_fast() {
        let filter = Filter {
            event: Some("netconf-config-change".to_string()),
            nodes: vec![],
        };
        let n = notification(EventType::SessionStart, "<netconf-session-start/>");
        assert!(!filter.matches(&n, &n.inner));

        let n = notification(EventType::ConfigChange, "<netconf-config-change/>");
        assert!(filter.matches(&n, &n.inner));
    }

    #[test]
    fn presence_only_node_requires_tag() {
        let filter = Filter {
            event: None,
            nodes: vec![FilterNode {
                name: "datastore".to_string(),
                value: None,
            }],
        };
        let n = notification(EventType::Unknown, "<datastore>running</datastore>");
        assert!(filter.matches(&n, &n.inner));

        let n = notification(EventType::Unknown, "<datastore xmlns=\"x\">c</datastore>");
        assert!(filter.matches(&n, &n.inner));

        // Tag name as a prefix of another tag does not count
        let n = notification(EventType::Unknown, "<datastores>running</datastores>");
        assert!(!filter.matches(&n, &n.inner));
    }

    #[test]
    fn value_node_is_a_regex() {
        let filter = Filter {
            event: None,
            nodes: vec![FilterNode {
                name: "datastore".to_string(),
                value: Some("runn.*".to_string()),
            }],
        };
        let n = notification(EventType::Unknown, "<datastore>running</datastore>");
        assert!(filter.matches(&n, &n.inner));

        let n = notification(EventType::Unknown, "<datastore>candidate</datastore>");
        assert!(!filter.matches(&n, &n.inner));
    }

    #[test]
    fn conditions_are_anded() {
        let filter = Filter {
            event: None,
            nodes: vec![
                FilterNode {
                    name: "datastore".to_string(),
                    value: Some("running".to_string()),
                },
                FilterNode {
                    name: "username".to_string(),
                    value: None,
                },
            ],
        };
        let both = "<username>admin</username><datastore>running</datastore>";
        let n = notification(EventType::Unknown, both);
        assert!(filter.matches(&n, &n.inner));

        let n = notification(EventType::Unknown, "<datastore>running</datastore>");
        assert!(!filter.matches(&n, &n.inner));
    }

    #[test]
    fn bad_target_url_fails_validation() {
        let mut w = hook("::not a url::", None);
        assert!(w.validate().is_err());
        w.disable = true;

        let n = notification(EventType::ConfigChange, "<x/>");
        assert!(!w.should_fire(&n, &n.inner));
    }

    #[test]
    fn unvalidated_hook_never_fires() {
        // Even without the disable flag, a hook with no parsed target
        // is excluded from fire decisions.
        let w = hook("http://ci.example.com/hook", None);
        let n = notification(EventType::ConfigChange, "<x/>");
        assert!(!w.should_fire(&n, &n.inner));
    }

    #[test]
    fn bad_filter_pattern_fails_validation() {
        let filter = Filter {
            event: None,
            nodes: vec![FilterNode {
                name: "datastore".to_string(),
                value: Some("[unclosed".to_string()),
            }],
        };
        let mut w = hook("http://ci.example.com/hook", Some(filter));
        assert!(w.validate().is_err());
    }

    #[test]
    fn deserializes_from_yaml_shape() {
        let json = serde_json::json!({
            "stream": "NETCONF",
            "url": "http://ci.example.com/hook",
            "token": "secret",
            "filter": {
                "event": "netconf-config-change",
                "nodes": [
                    { "name": "datastore", "value": "running" },
                    { "name": "username" }
                ]
            }
        });
        let mut w: Webhook = serde_json::from_value(json).unwrap();
        w.validate().unwrap();
        assert!(!w.disable);
        let filter = w.filter.as_ref().unwrap();
        assert_eq!(filter.nodes.len(), 2);
        assert!(filter.nodes[1].value.is_none());
    }
}
