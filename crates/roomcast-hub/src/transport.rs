//! What the hub needs from a connection.
//!
//! A transport is split once at registration into a writer half, owned by
//! the session's single writer task, and a reader half, owned by its reader
//! task. Most transports forbid concurrent writers, so the hub never writes
//! from anywhere else.

use async_trait::async_trait;
use roomcast_core::{Frame, TransportError};

/// Outcome of one successful read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadEvent {
    /// The peer sent something. Its content is not interpreted.
    Frame,
    /// The peer closed the connection gracefully.
    Closed,
}

/// A bidirectional connection that can be handed to [`Hub::register`](crate::Hub::register).
pub trait Transport: Send + 'static {
    /// Outbound half.
    type Writer: TransportWriter;
    /// Inbound half.
    type Reader: TransportReader;

    /// Split into independently owned halves.
    fn split(self) -> (Self::Writer, Self::Reader);
}

/// Outbound half: pushes one framed message per call.
#[async_trait]
pub trait TransportWriter: Send + 'static {
    /// Write one frame. An error ends the session.
    async fn write_frame(&mut self, frame: &Frame) -> Result<(), TransportError>;

    /// Best-effort close once the session is over.
    async fn close(&mut self) {}
}

/// Inbound half: used only to notice that the peer went away.
#[async_trait]
pub trait TransportReader: Send + 'static {
    /// Wait for the next inbound frame, a close, or an error.
    async fn read_frame(&mut self) -> Result<ReadEvent, TransportError>;
}
