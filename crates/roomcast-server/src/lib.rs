//! # roomcast-server
//!
//! Axum HTTP + WebSocket front end for the roomcast hub.
//!
//! - `GET /ws?room=&token=&name=`: authenticate, upgrade, register with the hub
//! - `GET /rooms/{code}/online`: list who is connected
//! - `POST /rooms/{code}/events`: host-only publish into a room
//! - `GET /health`, `GET /metrics`

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod rooms;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use auth::{AuthUser, Claims, HOST_ROLE, HostUser, JwtVerifier};
pub use config::{Heartbeat, ServerConfig};
pub use error::{ApiError, AuthError, ServerError};
pub use server::{AppState, RoomcastServer};
pub use shutdown::{ShutdownCoordinator, ShutdownReport};
