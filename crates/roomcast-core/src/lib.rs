//! # roomcast-core
//!
//! Core types shared by the roomcast crates.
//!
//! - [`ids`]: session ids and room codes
//! - [`identity`]: the already-authenticated identity attached to a session
//! - [`message`]: the `{event, room, payload}` unit of fan-out and its
//!   serialized [`Frame`](message::Frame)
//! - [`errors`]: encode and transport error types

#![deny(unsafe_code)]

pub mod errors;
pub mod identity;
pub mod ids;
pub mod message;

pub use errors::{EncodeError, TransportError};
pub use identity::Identity;
pub use ids::{RoomCode, SessionId};
pub use message::{Frame, Message, events};
