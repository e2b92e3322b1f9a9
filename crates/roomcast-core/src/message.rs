//! The `{event, room, payload}` message and its serialized frame.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::Serialize;

use crate::errors::EncodeError;
use crate::ids::RoomCode;

/// Event tags the hub generates itself.
pub mod events {
    /// A session joined the room. Payload: the joining [`Identity`](crate::Identity).
    pub const PARTICIPANT_CONNECTED: &str = "participant_connected";
    /// A session left the room. Payload: the departing [`Identity`](crate::Identity).
    pub const PARTICIPANT_DISCONNECTED: &str = "participant_disconnected";
    /// Sent once to a new session. Payload: identities of the other members.
    pub const ONLINE_LIST: &str = "online_list";
}

/// One application or presence event addressed to a room.
///
/// The payload is carried as-is; the hub never inspects it.
#[derive(Clone, Debug, Serialize)]
pub struct Message<P> {
    /// Event tag, e.g. `score_update`.
    pub event: String,
    /// Target room.
    pub room: RoomCode,
    /// Event-specific body.
    pub payload: P,
}

impl<P: Serialize> Message<P> {
    /// Build a message.
    pub fn new(event: impl Into<String>, room: RoomCode, payload: P) -> Self {
        Self {
            event: event.into(),
            room,
            payload,
        }
    }

    /// Serialize into one self-contained text frame.
    pub fn encode(&self) -> Result<Frame, EncodeError> {
        serde_json::to_string(self)
            .map(Frame::from)
            .map_err(|source| EncodeError {
                event: self.event.clone(),
                source,
            })
    }
}

/// A serialized message, shared between every queue it is fanned out to.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame(Arc<str>);

impl Frame {
    /// Borrow the frame text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Frame size in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the frame is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Frame {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&str> for Frame {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl Deref for Frame {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frame").field(&&*self.0).finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
