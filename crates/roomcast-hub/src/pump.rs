//! The two tasks serving each session.

use std::sync::Arc;

use roomcast_core::Frame;
use tokio::sync::mpsc;
use tracing::{debug, instrument, trace};

use crate::hub::{DisconnectReason, Hub};
use crate::session::Session;
use crate::transport::{ReadEvent, TransportReader, TransportWriter};

/// Drain the session's queue into the transport, one frame at a time.
///
/// Ends when the queue is closed, the session is cancelled, or a write
/// fails. Only a write failure unregisters from here, and it does so before
/// the transport is closed. The other two mean the session has already been
/// removed (or the reader will remove it).
#[instrument(skip_all, fields(session_id = %session.id()))]
pub(crate) async fn run_writer<W: TransportWriter>(
    hub: Hub,
    session: Arc<Session>,
    mut writer: W,
    mut queue: mpsc::Receiver<Frame>,
) {
    let cancel = session.cancellation().clone();
    let failed = loop {
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => break false,
            next = queue.recv() => match next {
                Some(frame) => frame,
                None => break false,
            },
        };
        let written = tokio::select! {
            biased;
            () = cancel.cancelled() => break false,
            result = writer.write_frame(&frame) => result,
        };
        if let Err(e) = written {
            debug!(error = %e, kind = e.kind(), "write failed");
            break true;
        }
    };
    // Leave the registry before the close handshake, which may take a while.
    drop(queue);
    if failed {
        hub.unregister(&session, DisconnectReason::WriteError);
    }
    writer.close().await;
    trace!("writer finished");
}

/// Watch the inbound side for closure or errors. Inbound frames are ignored.
#[instrument(skip_all, fields(session_id = %session.id()))]
pub(crate) async fn run_reader<R: TransportReader>(
    hub: Hub,
    session: Arc<Session>,
    mut reader: R,
) {
    let cancel = session.cancellation().clone();
    let reason = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break DisconnectReason::HubClosed,
            read = reader.read_frame() => match read {
                Ok(ReadEvent::Frame) => trace!("inbound frame ignored"),
                Ok(ReadEvent::Closed) => break DisconnectReason::PeerClosed,
                Err(e) => {
                    debug!(error = %e, kind = e.kind(), "read failed");
                    break DisconnectReason::ReadError;
                }
            },
        }
    };
    hub.unregister(&session, reason);
    trace!("reader finished");
}
