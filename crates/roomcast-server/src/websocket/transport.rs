//! Hub transport over an upgraded axum WebSocket.
//!
//! Frames go out as text messages. The reader half also drives the
//! heartbeat: it pings on every interval tick and reports
//! [`TransportError::Unresponsive`] once nothing at all has arrived from the
//! peer for the configured timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use roomcast_core::{Frame, TransportError};
use roomcast_hub::{ReadEvent, Transport, TransportReader, TransportWriter};
use tokio::sync::Mutex;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace};

use crate::config::Heartbeat;

/// Upper bound on the close handshake once a session ends.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

type SharedSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// An upgraded socket ready for [`Hub::register`](roomcast_hub::Hub::register).
pub struct WsTransport {
    socket: WebSocket,
    heartbeat: Option<Heartbeat>,
}

impl WsTransport {
    /// Wrap a socket. `None` disables pings and the silence timeout.
    pub fn new(socket: WebSocket, heartbeat: Option<Heartbeat>) -> Self {
        Self { socket, heartbeat }
    }
}

impl Transport for WsTransport {
    type Writer = WsWriter;
    type Reader = WsReader;

    fn split(self) -> (WsWriter, WsReader) {
        let (sink, stream) = self.socket.split();
        let sink: SharedSink = Arc::new(Mutex::new(sink));
        let pinger = self.heartbeat.map(|hb| {
            let mut ticks = tokio::time::interval_at(Instant::now() + hb.interval, hb.interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Pinger {
                ticks,
                interval: hb.interval,
                timeout: hb.timeout,
            }
        });
        let reader = WsReader {
            stream,
            sink: Arc::clone(&sink),
            pinger,
            last_seen: Instant::now(),
        };
        (WsWriter { sink }, reader)
    }
}

/// Outbound half.
pub struct WsWriter {
    sink: SharedSink,
}

#[async_trait]
impl TransportWriter for WsWriter {
    async fn write_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(frame.to_string().into()))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) {
        let close = async {
            let mut sink = self.sink.lock().await;
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        };
        if tokio::time::timeout(CLOSE_TIMEOUT, close).await.is_err() {
            debug!("close handshake timed out");
        }
    }
}

struct Pinger {
    ticks: Interval,
    interval: Duration,
    timeout: Duration,
}

enum Wake {
    Inbound(Option<Result<Message, axum::Error>>),
    Tick,
}

/// Inbound half.
pub struct WsReader {
    stream: SplitStream<WebSocket>,
    sink: SharedSink,
    pinger: Option<Pinger>,
    last_seen: Instant,
}

impl WsReader {
    async fn on_tick(&mut self) -> Result<(), TransportError> {
        let Some(pinger) = &self.pinger else {
            return Ok(());
        };
        if self.last_seen.elapsed() >= pinger.timeout {
            return Err(TransportError::Unresponsive(pinger.timeout));
        }
        // Skip this ping if a frame write currently holds the sink.
        let Ok(mut sink) = self.sink.try_lock() else {
            trace!("sink busy, ping skipped");
            return Ok(());
        };
        match tokio::time::timeout(pinger.interval, sink.send(Message::Ping(Bytes::new()))).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::Io(e.to_string())),
            Err(_) => {
                trace!("ping write stalled");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl TransportReader for WsReader {
    async fn read_frame(&mut self) -> Result<ReadEvent, TransportError> {
        loop {
            let wake = match self.pinger.as_mut() {
                Some(pinger) => tokio::select! {
                    msg = self.stream.next() => Wake::Inbound(msg),
                    _ = pinger.ticks.tick() => Wake::Tick,
                },
                None => Wake::Inbound(self.stream.next().await),
            };
            match wake {
                Wake::Tick => self.on_tick().await?,
                Wake::Inbound(None) => return Ok(ReadEvent::Closed),
                Wake::Inbound(Some(Err(e))) => return Err(TransportError::Io(e.to_string())),
                Wake::Inbound(Some(Ok(msg))) => {
                    self.last_seen = Instant::now();
                    match msg {
                        Message::Close(_) => return Ok(ReadEvent::Closed),
                        Message::Text(_) | Message::Binary(_) => return Ok(ReadEvent::Frame),
                        Message::Ping(_) | Message::Pong(_) => {}
                    }
                }
            }
        }
    }
}
