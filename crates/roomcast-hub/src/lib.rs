//! # roomcast-hub
//!
//! The presence-and-broadcast core: which connections are attached to which
//! room, and fan-out of events to every connection in a room.
//!
//! - [`Registry`]: room code → live sessions, behind one reader/writer lock
//! - [`Hub`]: `register`, `broadcast`, `online_users`, plus the presence
//!   protocol (`online_list`, `participant_connected`,
//!   `participant_disconnected`)
//! - [`Session`]: one connection's identity, room and bounded outbound queue
//! - [`transport`]: the two primitives the hub needs from a connection
//! - [`memory`]: an in-process transport for tests and embedding
//!
//! Backpressure is by eviction: a session whose queue is full when a
//! broadcast reaches it is unregistered inside that broadcast call.

#![deny(unsafe_code)]

pub mod hub;
pub mod memory;
pub mod metrics;
mod pump;
pub mod registry;
pub mod session;
pub mod transport;

pub use hub::{Delivery, DisconnectReason, Hub, HubConfig};
pub use memory::{MemoryPeer, MemoryTransport, memory_transport};
pub use registry::Registry;
pub use session::{Session, SessionHandle, SessionState};
pub use transport::{ReadEvent, Transport, TransportReader, TransportWriter};
