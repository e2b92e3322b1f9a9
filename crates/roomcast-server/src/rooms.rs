//! Room endpoints for HTTP clients.
//!
//! - `GET /rooms/{code}/online`: who is connected (any valid token)
//! - `POST /rooms/{code}/events`: publish an event to the room (host only)

use axum::Json;
use axum::extract::{Path, State};
use roomcast_core::{Identity, Message, RoomCode, events};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::auth::{AuthUser, HostUser};
use crate::error::ApiError;
use crate::server::AppState;

/// Response of `GET /rooms/{code}/online`.
#[derive(Debug, Serialize)]
pub struct OnlineResponse {
    /// Room code as requested.
    pub room: RoomCode,
    /// Connected identities, in no particular order.
    pub online: Vec<Identity>,
}

/// `GET /rooms/{code}/online`
pub async fn online_handler(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Path(code): Path<String>,
) -> Json<OnlineResponse> {
    let room = RoomCode::new(code);
    let online = state.hub.online_users(&room);
    Json(OnlineResponse { room, online })
}

/// Body of `POST /rooms/{code}/events`.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    /// Event tag, e.g. `new_question`.
    pub event: String,
    /// Opaque payload forwarded as-is.
    #[serde(default)]
    pub payload: Value,
}

/// Response of `POST /rooms/{code}/events`.
#[derive(Debug, Serialize)]
pub struct PublishResponse {
    /// Connections the event was queued for.
    pub recipients: usize,
    /// Connections evicted because they could not keep up.
    pub evicted: usize,
}

/// Event tags only the hub itself may emit.
const RESERVED_EVENTS: [&str; 3] = [
    events::PARTICIPANT_CONNECTED,
    events::PARTICIPANT_DISCONNECTED,
    events::ONLINE_LIST,
];

/// `POST /rooms/{code}/events`
pub async fn publish_handler(
    State(state): State<AppState>,
    HostUser(claims): HostUser,
    Path(code): Path<String>,
    Json(body): Json<PublishRequest>,
) -> Result<Json<PublishResponse>, ApiError> {
    let event = body.event.trim();
    if event.is_empty() {
        return Err(ApiError::BadRequest("event is required".into()));
    }
    if RESERVED_EVENTS.contains(&event) {
        return Err(ApiError::BadRequest(format!("event '{event}' is reserved")));
    }

    let room = RoomCode::new(code);
    let delivery = state
        .hub
        .broadcast(&room, &Message::new(event, room.clone(), body.payload));
    info!(
        room = %room,
        event,
        user_id = claims.user_id,
        recipients = delivery.recipients,
        "event published"
    );
    Ok(Json(PublishResponse {
        recipients: delivery.recipients,
        evicted: delivery.evicted,
    }))
}
