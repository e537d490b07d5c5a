//! Advertised event streams.
//!
//! Model of the `ietf-restconf-monitoring` stream inventory: each stream
//! has a name and one access entry per advertised encoding. The list is
//! built once from the server's answer and is read-only afterwards.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::webhook::Webhook;

/// Encoding of one stream access entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Unknown,
    Json,
    Xml,
}

impl Encoding {
    /// Map the advertised `<encoding>` text.
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Encoding::Json,
            "xml" => Encoding::Xml,
            _ => Encoding::Unknown,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::Unknown => "unknown",
            Encoding::Json => "json",
            Encoding::Xml => "xml",
        };
        write!(f, "{}", name)
    }
}

/// One transport/encoding variant through which a stream can be consumed.
#[derive(Clone, Debug)]
pub struct Access {
    pub encoding: Encoding,
    pub location: Url,
}

/// A named, independently subscribable notification source.
#[derive(Clone, Debug, Default)]
pub struct Stream {
    pub name: String,
    pub description: String,
    pub replay_support: bool,
    pub access: Vec<Access>,
    /// Webhooks attached at startup; read-only once subscribers run.
    pub webhooks: Vec<Arc<Webhook>>,
}

impl Stream {
    /// Attach a webhook to this stream.
    pub fn add_webhook(&mut self, hook: Arc<Webhook>) {
        self.webhooks.push(hook);
    }

    /// The XML-encoded access entries for this stream.
    pub fn xml_access(&self) -> impl Iterator<Item = &Access> {
        self.access
            .iter()
            .filter(|a| a.encoding == Encoding::Xml)
    }
}

/// The server's advertised stream inventory.
#[derive(Clone, Debug, Default)]
pub struct StreamList {
    pub streams: Vec<Stream>,
}

impl StreamList {
    pub fn count(&self) -> usize {
        self.streams.len()
    }

    /// Names of all advertised streams.
    pub fn names(&self) -> Vec<String> {
        self.streams.iter().map(|s| s.name.clone()).collect()
    }

    /// Find streams whose name fuzzily matches `target`.
    pub fn find_by_name(&self, target: &str) -> Vec<&Stream> {
        self.streams
            .iter()
            .filter(|s| fuzzy_name_match(target, &s.name))
            .collect()
    }

    /// Mutable variant of [`find_by_name`](Self::find_by_name), used when
    /// attaching webhooks during startup.
    pub fn find_by_name_mut(&mut self, target: &str) -> Vec<&mut Stream> {
        self.streams
            .iter_mut()
            .filter(|s| fuzzy_name_match(target, &s.name))
            .collect()
    }
}

/// Loose stream-name comparison: a request matches an advertised name if
/// it equals it or is contained within it.
pub fn fuzzy_name_match(request: &str, advertised: &str) -> bool {
    request == advertised || advertised.contains(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(name: &str) -> Stream {
        Stream {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn fuzzy_match_exact_and_substring() {
        assert!(fuzzy_name_match("NETCONF", "NETCONF"));
        assert!(fuzzy_name_match("ncs", "ncs-events"));
        assert!(!fuzzy_name_match("ncs-events", "ncs"));
        assert!(!fuzzy_name_match("snmp", "NETCONF"));
    }

    #[test]
    fn find_by_name_returns_all_matches() {
        let list = StreamList {
            streams: vec![
                stream("ncs-events"),
                stream("ncs-alarms"),
                stream("NETCONF"),
            ],
        };
        let found = list.find_by_name("ncs");
        assert_eq!(found.len(), 2);
        assert!(list.find_by_name("kicker").is_empty());
    }

    #[test]
    fn xml_access_filters_encodings() {
        let mut s = stream("NETCONF");
        s.access = vec![
            Access {
                encoding: Encoding::Json,
                location: Url::parse("http://h/streams/NETCONF/json").unwrap(),
            },
            Access {
                encoding: Encoding::Xml,
                location: Url::parse("http://h/streams/NETCONF/xml").unwrap(),
            },
        ];
        let xml: Vec<_> = s.xml_access().collect();
        assert_eq!(xml.len(), 1);
        assert_eq!(xml[0].encoding, Encoding::Xml);
    }
}
