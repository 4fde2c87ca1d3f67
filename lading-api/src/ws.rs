//! WebSocket Transport
//!
//! Upgrades HTTP connections to WebSocket, authenticates the handshake
//! credential, and runs the per-connection loop: inbound frames are parsed
//! into `ClientRequest`s and dispatched to the channel manager, outbound
//! events are drained from the connection's outbox into the socket.
//!
//! ## Protocol
//!
//! 1. Client connects with an optional bearer credential
//!    (`Authorization: Bearer <token>` or `?token=<token>`)
//! 2. No credential ⇒ guest identity; invalid credential ⇒ 401, upgrade
//!    refused
//! 3. Connection upgraded; client issues `join_shipment` / `leave_shipment`
//! 4. Server streams room events as JSON text frames
//! 5. On any exit path the disconnect sweep removes the connection from
//!    every room and notifies the remaining watchers

use crate::auth::{authenticate, ConnectionIdentity};
use crate::channel::ChannelManager;
use crate::error::ApiResult;
use crate::events::{ChannelEvent, ClientRequest};
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// WebSocket upgrade handler.
///
/// Authentication happens before the upgrade so a bad credential refuses
/// the connection attempt itself rather than downgrading it to guest.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let credential = bearer_credential(&headers, &params);
    let identity = authenticate(&state.auth, credential.as_deref())?;

    info!(
        connection_id = %identity.connection_id,
        user_id = ?identity.user_id,
        role = %identity.role,
        "WebSocket connection request"
    );

    let manager = state.manager.clone();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, manager, identity)))
}

/// Pull the bearer credential from the `Authorization` header or, for
/// browser clients that cannot set headers on WebSocket requests, the
/// `token` query parameter.
fn bearer_credential(headers: &HeaderMap, params: &HashMap<String, String>) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
        .or_else(|| params.get("token").cloned())
}

/// Run one WebSocket connection to completion.
async fn handle_socket(socket: WebSocket, manager: Arc<ChannelManager>, identity: ConnectionIdentity) {
    let connection_id = identity.connection_id;
    info!(connection_id = %connection_id, "WebSocket connected");

    let (mut sender, mut receiver) = socket.split();
    let mut outbox = manager.connect(identity);

    // Inbound side: parse client frames and dispatch them.
    let recv_manager = manager.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientRequest>(&text) {
                    Ok(request) => recv_manager.handle_request(connection_id, request),
                    Err(e) => {
                        // Malformed request faults only this connection's
                        // request, never the connection itself.
                        debug!(
                            connection_id = %connection_id,
                            error = %e,
                            "Malformed client request"
                        );
                        recv_manager
                            .send_error(connection_id, format!("Invalid request: {}", e));
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!(connection_id = %connection_id, "Client sent close frame");
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is automatically sent by axum
                    debug!(connection_id = %connection_id, "Received ping");
                }
                Ok(Message::Pong(_)) => {
                    debug!(connection_id = %connection_id, "Received pong");
                }
                Ok(Message::Binary(data)) => {
                    debug!(
                        connection_id = %connection_id,
                        len = data.len(),
                        "Received binary message (ignored)"
                    );
                }
                Err(e) => {
                    warn!(connection_id = %connection_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    // Outbound side: forward outbox events to the client.
    loop {
        tokio::select! {
            event = outbox.recv() => {
                match event {
                    Some(event) => {
                        if let Err(e) = send_event(&mut sender, event).await {
                            warn!(
                                connection_id = %connection_id,
                                error = %e,
                                "Failed to send event, closing connection"
                            );
                            break;
                        }
                    }
                    // Outbox closed: the manager dropped this connection.
                    None => break,
                }
            }

            _ = &mut recv_task => {
                debug!(connection_id = %connection_id, "Receiver task finished");
                break;
            }
        }
    }

    recv_task.abort();

    // Unconditional cleanup: every exit path of the loop above lands here,
    // so abrupt network loss still sweeps the presence maps.
    manager.disconnect(connection_id);
    info!(connection_id = %connection_id, "WebSocket disconnected");
}

/// Serialize an event and send it as a text frame.
async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: ChannelEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(&event).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}
