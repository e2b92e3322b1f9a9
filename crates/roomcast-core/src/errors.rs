//! Error types shared by the hub and its transport adapters.

use thiserror::Error;

/// A [`Message`](crate::Message) could not be serialized into a frame.
#[derive(Debug, Error)]
#[error("failed to encode {event} message: {source}")]
pub struct EncodeError {
    /// Event tag of the message that failed.
    pub event: String,
    /// Underlying serializer error.
    #[source]
    pub source: serde_json::Error,
}

/// Read or write failure on a session's connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection is already closed.
    #[error("connection closed")]
    Closed,
    /// The peer stopped answering heartbeats.
    #[error("peer unresponsive for {0:?}")]
    Unresponsive(std::time::Duration),
    /// Any other I/O or protocol error reported by the transport.
    #[error("transport error: {0}")]
    Io(String),
}

impl TransportError {
    /// Short classification string for logging/metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Unresponsive(_) => "unresponsive",
            Self::Io(_) => "io",
        }
    }
}
