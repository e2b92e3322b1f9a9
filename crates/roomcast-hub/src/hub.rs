//! The hub: registration, fan-out and the presence protocol.

use std::sync::Arc;

use ::metrics::{counter, gauge, histogram};
use roomcast_core::{Frame, Identity, Message, RoomCode, SessionId, events};
use serde::Serialize;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::metrics as names;
use crate::pump;
use crate::registry::Registry;
use crate::session::{Enqueue, Session, SessionHandle};
use crate::transport::Transport;

/// Default outbound queue capacity per session.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Hub tuning.
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Frames each session may have queued before it is evicted.
    pub queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Why a session left the hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer closed the connection.
    PeerClosed,
    /// Reading from the connection failed.
    ReadError,
    /// Writing to the connection failed.
    WriteError,
    /// The outbound queue was full when a broadcast reached it.
    Overflow,
    /// The hub closed the session (shutdown).
    HubClosed,
}

impl DisconnectReason {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PeerClosed => "peer_closed",
            Self::ReadError => "read_error",
            Self::WriteError => "write_error",
            Self::Overflow => "overflow",
            Self::HubClosed => "hub_closed",
        }
    }
}

/// What one broadcast call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Sessions the frame was queued for.
    pub recipients: usize,
    /// Sessions evicted because their queue was full.
    pub evicted: usize,
}

/// Result of one pass over a room.
struct FanOut {
    recipients: usize,
    overflowed: Vec<Arc<Session>>,
}

struct HubInner {
    registry: Registry,
    config: HubConfig,
    shutdown: CancellationToken,
    /// Signalled whenever the last session leaves.
    idle: Notify,
}

/// Presence-and-broadcast coordinator.
///
/// Cheap to clone; every clone refers to the same registry. Construct one at
/// startup and hand clones to whatever needs to register connections or
/// broadcast.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    /// Create a hub with the given configuration.
    pub fn new(config: HubConfig) -> Self {
        Self {
            inner: Arc::new(HubInner {
                registry: Registry::new(),
                config,
                shutdown: CancellationToken::new(),
                idle: Notify::new(),
            }),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    /// Attach a connection to a room.
    ///
    /// The new session's first outbound frame is always `online_list` (the
    /// other members present at this moment). The other members receive
    /// `participant_connected`; the new session does not. Must be called
    /// from within a Tokio runtime: it spawns the session's reader and
    /// writer tasks.
    pub fn register<T: Transport>(
        &self,
        identity: Identity,
        room: RoomCode,
        transport: T,
    ) -> SessionHandle {
        let (session, queue) = Session::new(
            identity,
            room,
            self.inner.config.queue_capacity,
            &self.inner.shutdown,
        );

        self.inner
            .registry
            .add_to_room_with(Arc::clone(&session), |others| {
                let members: Vec<&Identity> = others
                    .iter()
                    .filter(|s| s.is_active())
                    .map(|s| s.identity())
                    .collect();
                let online = Message::new(events::ONLINE_LIST, session.room().clone(), members);
                match online.encode() {
                    Ok(frame) => {
                        // The queue is fresh and unreachable by anyone else.
                        let _ = session.try_enqueue(frame);
                    }
                    Err(e) => warn!(session_id = %session.id(), error = %e, "failed to encode online list"),
                }
            });

        info!(
            session_id = %session.id(),
            room = %session.room(),
            user_id = session.identity().id,
            "session registered"
        );
        counter!(names::WS_CONNECTIONS_TOTAL).increment(1);
        gauge!(names::WS_CONNECTIONS_ACTIVE).increment(1.0);
        self.record_room_gauge();

        let connected = Message::new(
            events::PARTICIPANT_CONNECTED,
            session.room().clone(),
            session.identity(),
        );
        match connected.encode() {
            Ok(frame) => {
                let fan = self.fan_out(session.room(), &frame, Some(session.id()));
                self.evict(fan.overflowed);
            }
            Err(e) => warn!(session_id = %session.id(), error = %e, "failed to encode presence"),
        }

        // Pumps start after the announcement so a dead transport can't
        // produce `disconnected` ahead of `connected`.
        let (writer, reader) = transport.split();
        drop(tokio::spawn(pump::run_writer(
            self.clone(),
            Arc::clone(&session),
            writer,
            queue,
        )));
        drop(tokio::spawn(pump::run_reader(
            self.clone(),
            Arc::clone(&session),
            reader,
        )));

        SessionHandle::new(session)
    }

    /// Fan a message out to every Active session in `room`.
    ///
    /// Never blocks. A session whose queue is full is evicted before this
    /// returns. If the message cannot be encoded nothing is delivered.
    pub fn broadcast<P: Serialize>(&self, room: &RoomCode, message: &Message<P>) -> Delivery {
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                error!(room = %room, error = %e, "broadcast abandoned");
                counter!(names::HUB_BROADCAST_FAILURES_TOTAL).increment(1);
                return Delivery::default();
            }
        };
        counter!(names::HUB_BROADCASTS_TOTAL).increment(1);

        let fan = self.fan_out(room, &frame, None);
        let delivery = Delivery {
            recipients: fan.recipients,
            evicted: fan.overflowed.len(),
        };
        debug!(
            event = %message.event,
            room = %room,
            recipients = delivery.recipients,
            evicted = delivery.evicted,
            "broadcast"
        );
        self.evict(fan.overflowed);
        delivery
    }

    /// Identities of the Active sessions in `room`, in no particular order.
    pub fn online_users(&self, room: &RoomCode) -> Vec<Identity> {
        self.inner
            .registry
            .snapshot(room)
            .into_iter()
            .filter(|s| s.is_active())
            .map(|s| s.identity().clone())
            .collect()
    }

    /// Number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.inner.registry.session_count()
    }

    /// Number of rooms with at least one session.
    pub fn room_count(&self) -> usize {
        self.inner.registry.room_count()
    }

    /// Close every session. Sessions registered afterwards close immediately.
    pub fn shutdown(&self) {
        info!(sessions = self.session_count(), "hub shutting down");
        self.inner.shutdown.cancel();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Resolves once no session is registered.
    pub async fn idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.session_count() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Remove a session and announce its departure. Idempotent.
    ///
    /// Evictions triggered by the announcement itself are processed here as
    /// well, iteratively.
    pub(crate) fn unregister(&self, session: &Arc<Session>, reason: DisconnectReason) {
        let mut pending = vec![(Arc::clone(session), reason)];
        while let Some((session, reason)) = pending.pop() {
            let overflowed = self.remove_and_announce(&session, reason);
            pending.extend(
                overflowed
                    .into_iter()
                    .map(|s| (s, DisconnectReason::Overflow)),
            );
        }
    }

    fn remove_and_announce(
        &self,
        session: &Arc<Session>,
        reason: DisconnectReason,
    ) -> Vec<Arc<Session>> {
        let Some(removed) = self
            .inner
            .registry
            .remove_from_room(session.room(), session.id())
        else {
            return Vec::new();
        };
        removed.close_queue();

        info!(
            session_id = %removed.id(),
            room = %removed.room(),
            user_id = removed.identity().id,
            reason = reason.as_str(),
            "session unregistered"
        );
        counter!(names::WS_DISCONNECTIONS_TOTAL, "reason" => reason.as_str()).increment(1);
        gauge!(names::WS_CONNECTIONS_ACTIVE).decrement(1.0);
        histogram!(names::WS_SESSION_DURATION_SECONDS).record(removed.age().as_secs_f64());
        if reason == DisconnectReason::Overflow {
            counter!(names::WS_BROADCAST_DROPS_TOTAL).increment(1);
        }
        self.record_room_gauge();
        if self.session_count() == 0 {
            self.inner.idle.notify_waiters();
        }

        let departed = Message::new(
            events::PARTICIPANT_DISCONNECTED,
            removed.room().clone(),
            removed.identity(),
        );
        let overflowed = match departed.encode() {
            Ok(frame) => self.fan_out(removed.room(), &frame, None).overflowed,
            Err(e) => {
                warn!(session_id = %removed.id(), error = %e, "failed to encode presence");
                Vec::new()
            }
        };
        removed.mark_closed();
        overflowed
    }

    fn evict(&self, overflowed: Vec<Arc<Session>>) {
        for session in overflowed {
            self.unregister(&session, DisconnectReason::Overflow);
        }
    }

    /// Offer `frame` to every Active member of `room` under the read lock.
    fn fan_out(&self, room: &RoomCode, frame: &Frame, exclude: Option<&SessionId>) -> FanOut {
        let mut fan = FanOut {
            recipients: 0,
            overflowed: Vec::new(),
        };
        self.inner.registry.for_each_in_room(room, |session| {
            if exclude == Some(session.id()) || !session.is_active() {
                return;
            }
            match session.try_enqueue(frame.clone()) {
                Enqueue::Queued => fan.recipients += 1,
                Enqueue::Full => {
                    if session.begin_draining() {
                        warn!(
                            session_id = %session.id(),
                            room = %room,
                            capacity = self.inner.config.queue_capacity,
                            "outbound queue full, evicting session"
                        );
                        fan.overflowed.push(Arc::clone(session));
                    }
                }
                // Writer already gone; its pump unregisters the session.
                Enqueue::Closed => trace!(session_id = %session.id(), "queue closed, skipped"),
            }
        });
        fan
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_room_gauge(&self) {
        gauge!(names::HUB_ROOMS_ACTIVE).set(self.inner.registry.room_count() as f64);
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("config", &self.inner.config)
            .field("sessions", &self.session_count())
            .field("rooms", &self.room_count())
            .finish()
    }
}
