//! yanghook-core - Types and filter engine for the yanghook event forwarder.

pub mod error;
pub mod notification;
pub mod stream;
pub mod types;
pub mod webhook;

pub use error::Error;
pub use notification::{Edit, EnrichedEvent, EventType, Notification, UNGROUPED};
pub use stream::{Access, Encoding, Stream, StreamList, fuzzy_name_match};
pub use types::ServerUrl;
pub use webhook::{Filter, FilterNode, Webhook};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
