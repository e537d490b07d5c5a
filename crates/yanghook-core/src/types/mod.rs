//! Core validated types.

mod server_url;

pub use server_url::ServerUrl;
