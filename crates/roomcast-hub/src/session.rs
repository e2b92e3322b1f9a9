//! Per-connection session state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use roomcast_core::{Frame, Identity, RoomCode, SessionId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Where a session is in its single-use lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Registered; receives broadcasts and shows up in snapshots.
    Active = 0,
    /// Queue closed, leaving the registry. No further enqueue is attempted.
    Draining = 1,
    /// Terminal. The disconnect has been announced.
    Closed = 2,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Active,
            1 => Self::Draining,
            _ => Self::Closed,
        }
    }
}

/// Result of a non-blocking enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Enqueue {
    Queued,
    Full,
    Closed,
}

/// One registered connection inside the hub.
pub struct Session {
    id: SessionId,
    identity: Identity,
    room: RoomCode,
    state: AtomicU8,
    /// Sender side of the bounded outbound queue. `None` once closed.
    queue: Mutex<Option<mpsc::Sender<Frame>>>,
    /// Cancelled when the session leaves the registry or the hub shuts down.
    cancel: CancellationToken,
    connected_at: Instant,
}

impl Session {
    /// Create an Active session with a queue of `capacity` frames.
    ///
    /// Returns the receiver end for the session's writer task.
    pub(crate) fn new(
        identity: Identity,
        room: RoomCode,
        capacity: usize,
        parent: &CancellationToken,
    ) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let session = Arc::new(Self {
            id: SessionId::new(),
            identity,
            room,
            state: AtomicU8::new(SessionState::Active as u8),
            queue: Mutex::new(Some(tx)),
            cancel: parent.child_token(),
            connected_at: Instant::now(),
        });
        (session, rx)
    }

    /// Session id.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Identity supplied at registration.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The one room this session belongs to.
    pub fn room(&self) -> &RoomCode {
        &self.room
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the session still receives broadcasts.
    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Time since registration.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Offer a frame without waiting.
    pub(crate) fn try_enqueue(&self, frame: Frame) -> Enqueue {
        let queue = self.queue.lock();
        let Some(tx) = queue.as_ref() else {
            return Enqueue::Closed;
        };
        match tx.try_send(frame) {
            Ok(()) => Enqueue::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => Enqueue::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => Enqueue::Closed,
        }
    }

    /// `Active → Draining`. Returns `false` if the session already left Active.
    pub(crate) fn begin_draining(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Active as u8,
                SessionState::Draining as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Close the outbound queue and stop both pump tasks.
    pub(crate) fn close_queue(&self) {
        let _ = self.begin_draining();
        drop(self.queue.lock().take());
        self.cancel.cancel();
    }

    pub(crate) fn mark_closed(&self) {
        self.state.store(SessionState::Closed as u8, Ordering::Release);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("room", &self.room)
            .field("user_id", &self.identity.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Caller-side view of a registered session.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    session: Arc<Session>,
}

impl SessionHandle {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Session id.
    pub fn id(&self) -> &SessionId {
        self.session.id()
    }

    /// Identity supplied at registration.
    pub fn identity(&self) -> &Identity {
        self.session.identity()
    }

    /// Room the session joined.
    pub fn room(&self) -> &RoomCode {
        self.session.room()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Whether the session still receives broadcasts.
    pub fn is_active(&self) -> bool {
        self.session.is_active()
    }

    /// Resolves once the session has been removed from the hub.
    pub async fn closed(&self) {
        self.session.cancellation().cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session(capacity: usize) -> (Arc<Session>, mpsc::Receiver<Frame>) {
        Session::new(
            Identity::new(1, "Ana", "participant"),
            RoomCode::new("ROOM"),
            capacity,
            &CancellationToken::new(),
        )
    }

    #[test]
    fn new_session_is_active() {
        let (session, _rx) = make_session(4);
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.is_active());
        assert_eq!(session.room().as_str(), "ROOM");
        assert!(session.id().as_str().starts_with("sess_"));
    }

    #[tokio::test]
    async fn enqueue_until_full() {
        let (session, mut rx) = make_session(2);
        assert_eq!(session.try_enqueue(Frame::from("a")), Enqueue::Queued);
        assert_eq!(session.try_enqueue(Frame::from("b")), Enqueue::Queued);
        assert_eq!(session.try_enqueue(Frame::from("c")), Enqueue::Full);
        assert_eq!(rx.recv().await.unwrap().as_str(), "a");
        assert_eq!(session.try_enqueue(Frame::from("d")), Enqueue::Queued);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let (session, _rx) = make_session(0);
        assert_eq!(session.try_enqueue(Frame::from("a")), Enqueue::Queued);
        assert_eq!(session.try_enqueue(Frame::from("b")), Enqueue::Full);
    }

    #[tokio::test]
    async fn close_queue_ends_receiver_and_cancels() {
        let (session, mut rx) = make_session(4);
        assert_eq!(session.try_enqueue(Frame::from("a")), Enqueue::Queued);
        session.close_queue();

        assert_eq!(session.state(), SessionState::Draining);
        assert!(session.cancellation().is_cancelled());
        assert_eq!(session.try_enqueue(Frame::from("b")), Enqueue::Closed);
        // Already-queued frame is still readable, then the queue ends.
        assert_eq!(rx.recv().await.unwrap().as_str(), "a");
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn dropped_receiver_reports_closed() {
        let (session, rx) = make_session(4);
        drop(rx);
        assert_eq!(session.try_enqueue(Frame::from("a")), Enqueue::Closed);
    }

    #[test]
    fn begin_draining_only_once() {
        let (session, _rx) = make_session(1);
        assert!(session.begin_draining());
        assert!(!session.begin_draining());
        session.mark_closed();
        assert!(!session.begin_draining());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn parent_cancellation_reaches_session() {
        let parent = CancellationToken::new();
        let (session, _rx) = Session::new(
            Identity::new(2, "Leo", "host"),
            RoomCode::new("R"),
            1,
            &parent,
        );
        parent.cancel();
        assert!(session.cancellation().is_cancelled());
    }

    #[tokio::test]
    async fn handle_closed_resolves_after_close_queue() {
        let (session, _rx) = make_session(1);
        let handle = SessionHandle::new(Arc::clone(&session));
        session.close_queue();
        tokio::time::timeout(Duration::from_secs(1), handle.closed())
            .await
            .unwrap();
        assert!(!handle.is_active());
    }
}
