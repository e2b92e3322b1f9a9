//! In-process transport.
//!
//! [`memory_transport`] returns a [`MemoryTransport`] to hand to the hub and
//! a [`MemoryPeer`] playing the remote side: it captures every frame the
//! session writes, can inject inbound frames, errors or a close, and can
//! stall the writer to simulate a slow consumer.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use roomcast_core::{Frame, TransportError};
use tokio::sync::{mpsc, watch};

use crate::transport::{ReadEvent, Transport, TransportReader, TransportWriter};

enum Inbound {
    Frame,
    Error(String),
}

/// Create a connected transport/peer pair.
pub fn memory_transport() -> (MemoryTransport, MemoryPeer) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (stall_tx, stall_rx) = watch::channel(false);
    let attempts = Arc::new(AtomicUsize::new(0));
    let transport = MemoryTransport {
        writer: MemoryWriter {
            frames: out_tx,
            stall: stall_rx,
            attempts: Arc::clone(&attempts),
        },
        reader: MemoryReader { inbound: in_rx },
    };
    let peer = MemoryPeer {
        frames: out_rx,
        inbound: Some(in_tx),
        stall: stall_tx,
        attempts,
    };
    (transport, peer)
}

/// Server side of an in-memory connection.
pub struct MemoryTransport {
    writer: MemoryWriter,
    reader: MemoryReader,
}

impl Transport for MemoryTransport {
    type Writer = MemoryWriter;
    type Reader = MemoryReader;

    fn split(self) -> (MemoryWriter, MemoryReader) {
        (self.writer, self.reader)
    }
}

/// Outbound half of a [`MemoryTransport`].
pub struct MemoryWriter {
    frames: mpsc::UnboundedSender<String>,
    stall: watch::Receiver<bool>,
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl TransportWriter for MemoryWriter {
    async fn write_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        let _ = self.attempts.fetch_add(1, Ordering::SeqCst);
        let released = self.stall.wait_for(|stalled| !*stalled).await.is_ok();
        if !released {
            return Err(TransportError::Closed);
        }
        self.frames
            .send(frame.to_string())
            .map_err(|_| TransportError::Closed)
    }
}

/// Inbound half of a [`MemoryTransport`].
pub struct MemoryReader {
    inbound: mpsc::UnboundedReceiver<Inbound>,
}

#[async_trait]
impl TransportReader for MemoryReader {
    async fn read_frame(&mut self) -> Result<ReadEvent, TransportError> {
        match self.inbound.recv().await {
            Some(Inbound::Frame) => Ok(ReadEvent::Frame),
            Some(Inbound::Error(msg)) => Err(TransportError::Io(msg)),
            None => Ok(ReadEvent::Closed),
        }
    }
}

/// Remote side of an in-memory connection.
pub struct MemoryPeer {
    frames: mpsc::UnboundedReceiver<String>,
    inbound: Option<mpsc::UnboundedSender<Inbound>>,
    stall: watch::Sender<bool>,
    attempts: Arc<AtomicUsize>,
}

impl MemoryPeer {
    /// Next frame written by the session. `None` once the writer is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.frames.recv().await
    }

    /// Next frame, or `None` if nothing arrives within `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<String> {
        tokio::time::timeout(timeout, self.frames.recv())
            .await
            .ok()
            .flatten()
    }

    /// A frame that has already been written, if any.
    pub fn try_recv(&mut self) -> Option<String> {
        self.frames.try_recv().ok()
    }

    /// Whether the writer half has been dropped and every frame consumed.
    pub fn is_closed(&self) -> bool {
        self.frames.is_closed() && self.frames.is_empty()
    }

    /// Send an inbound frame (its content is never looked at).
    pub fn send_frame(&self) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(Inbound::Frame);
        }
    }

    /// Make the session's next read fail.
    pub fn fail(&self, message: impl Into<String>) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(Inbound::Error(message.into()));
        }
    }

    /// Close the connection from the remote side.
    pub fn close(&mut self) {
        self.inbound = None;
    }

    /// Block the session's writer before its next write.
    pub fn stall(&self) {
        let _ = self.stall.send(true);
    }

    /// Let a stalled writer continue.
    pub fn resume(&self) {
        let _ = self.stall.send(false);
    }

    /// Writes started by the session, including one blocked by [`stall`](Self::stall).
    pub fn write_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}
