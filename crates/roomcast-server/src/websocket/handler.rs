//! `GET /ws?room=CODE&token=JWT&name=NAME`.
//!
//! The token is checked before the upgrade, so a rejected client gets a
//! plain HTTP error and the hub only ever sees authenticated identities.

use axum::extract::ws::{WebSocketUpgrade, rejection::WebSocketUpgradeRejection};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use roomcast_core::{Identity, RoomCode};
use serde::Deserialize;
use tracing::{debug, info};

use super::transport::WsTransport;
use crate::auth::JwtVerifier;
use crate::error::ApiError;
use crate::server::AppState;

/// Query parameters of the upgrade request.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct JoinParams {
    /// Room to join.
    pub room: Option<String>,
    /// Bearer token, passed in the query since browsers cannot set headers on upgrades.
    pub token: Option<String>,
    /// Display name shown to the other members.
    pub name: Option<String>,
}

/// Resolve who is joining which room, or why they may not.
pub fn authorize(verifier: &JwtVerifier, params: &JoinParams) -> Result<(Identity, RoomCode), ApiError> {
    let present = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let (Some(room), Some(token)) = (present(&params.room), present(&params.token)) else {
        return Err(ApiError::BadRequest("room and token are required".into()));
    };
    let claims = verifier.verify(&token)?;
    let identity = Identity::new(
        claims.user_id,
        params.name.clone().unwrap_or_default(),
        claims.role,
    );
    Ok((identity, RoomCode::new(room)))
}

/// Validate the join request, then upgrade and hand the socket to the hub.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<JoinParams>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let (identity, room) = match authorize(&state.verifier, &params) {
        Ok(joined) => joined,
        Err(e) => {
            debug!(error = %e, "join rejected");
            return e.into_response();
        }
    };
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let hub = state.hub.clone();
    let heartbeat = state.config.heartbeat();
    upgrade
        .max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            let handle = hub.register(identity, room, WsTransport::new(socket, heartbeat));
            info!(session_id = %handle.id(), room = %handle.room(), "websocket joined");
        })
}
