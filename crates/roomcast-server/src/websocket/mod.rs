//! WebSocket front end: the `/ws` upgrade handler and the transport adapter
//! that plugs an upgraded socket into the hub.

pub mod handler;
pub mod transport;

pub use handler::{JoinParams, ws_handler};
pub use transport::{WsReader, WsTransport, WsWriter};
