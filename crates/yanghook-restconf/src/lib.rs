//! yanghook-restconf - RESTCONF stream subscription and webhook dispatch.

pub mod classify;
pub mod client;
pub mod dispatch;
pub mod manager;
pub mod state;
pub mod subscriber;
pub mod xml;

pub use classify::{Handler, HandlerRegistry};
pub use client::{ClientOptions, RestconfClient};
pub use manager::{SubscriberSet, attach_webhooks};
pub use state::ServerState;
pub use subscriber::Subscriber;
