//! Error types for yanghook.
//!
//! This module provides a unified error type with explicit variants for
//! transport, protocol, stream decoding, and input validation errors.

use thiserror::Error;

/// The unified error type for yanghook operations.
///
/// Explicit variants allow callers to scope a failure correctly: a decode
/// error ends one subscriber, an input error disables one webhook, and so
/// on. No single failure is meant to take the process down.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Protocol errors (unexpected responses from the RESTCONF server).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Event stream framing and payload decoding errors.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Input validation errors (invalid URL or filter pattern).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// One or more requested streams were not advertised by the server.
    #[error("stream(s) not found: {}", names.join(", "))]
    StreamsNotFound { names: Vec<String> },
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Protocol-level errors from the RESTCONF server.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The server answered with an unexpected content type.
    #[error("expected {expected} response, got {got} - may be an authentication error")]
    UnexpectedContent { expected: String, got: String },

    /// The host-meta document carries no restconf link.
    #[error("unable to determine API root resource from host-meta")]
    RootResourceMissing,

    /// A non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

/// Errors from framing and decoding the notification stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A notification unit without the mandatory eventTime field.
    #[error("notification is missing eventTime")]
    MissingEventTime,

    /// The eventTime field could not be parsed as a timestamp.
    #[error("invalid eventTime '{value}': {reason}")]
    BadEventTime { value: String, reason: String },

    /// An element open tag with no matching close tag.
    #[error("unterminated element <{name}>")]
    UnterminatedElement { name: String },

    /// A partial notification unit exceeded the frame size limit.
    #[error("notification frame exceeds {limit} bytes without completing")]
    FrameTooLarge { limit: usize },

    /// The decode loop closed the notification queue.
    #[error("notification channel closed/unavailable")]
    ChannelClosed,
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid server base URL.
    #[error("invalid server URL '{value}': {reason}")]
    ServerUrl { value: String, reason: String },

    /// Invalid webhook target URL.
    #[error("invalid webhook URL '{value}': {reason}")]
    WebhookUrl { value: String, reason: String },

    /// A filter value that does not compile as a regular expression.
    #[error("invalid filter pattern '{pattern}': {reason}")]
    FilterPattern { pattern: String, reason: String },
}
