//! Crate-wide error type

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RofexError>;

/// Errors raised by the REST and WebSocket clients.
#[derive(Error, Debug)]
pub enum RofexError {
    /// Bad credentials, or a repeated 401 after a token refresh.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// An authenticated operation was attempted before a successful `authenticate`.
    #[error("environment is not initialized")]
    NotInitialized,
    /// A socket operation was attempted before `connect()` or after `close()`.
    #[error("websocket is not connected")]
    NotConnected,
    /// The socket could not be established within the configured timeout.
    #[error("connection error: {0}")]
    Connection(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Malformed or unclassifiable inbound frame. Surfaced through the
    /// exception handler, never raised on the caller thread.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// A user-supplied handler panicked during fan-out.
    #[error("handler panicked: {0}")]
    Callback(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
