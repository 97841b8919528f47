//! WebSocket transport bridging a connection to the hub.

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::chat::ClientSession;

use super::handlers::AppState;

/// Query parameters for a WebSocket connection.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// Room to join (created on demand if absent).
    pub room_id: String,
    /// Display name.
    pub name: String,
}

/// WebSocket chat handler.
///
/// GET /ws?room_id={room}&name={display_name}
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> Response {
    if query.room_id.trim().is_empty() || query.name.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "room_id and name are required").into_response();
    }

    tracing::info!(room = %query.room_id, name = %query.name, "WebSocket connection");

    ws.on_upgrade(move |socket| handle_socket(socket, state, query))
}

/// Handle one WebSocket connection for its whole lifetime.
///
/// The session's reader and writer roles run as the two branches of one
/// select loop: inbound frames are fed to the hub, the outbound queue is
/// drained to the socket. Any exit (read error, write error, queue closed by
/// eviction or backpressure disconnect) falls through to a single cleanup.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, query: WsQuery) {
    let (session, mut outbound) = ClientSession::new(query.name.trim(), query.room_id.trim(), false);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    if state.hub.attach_client(session.clone()).await.is_none() {
        // Admission rejected (room full); the hub already closed the session.
        let _ = ws_sender
            .send(WsMessage::Close(Some(axum::extract::ws::CloseFrame {
                code: axum::extract::ws::close_code::POLICY,
                reason: "room is full".into(),
            })))
            .await;
        return;
    }

    loop {
        tokio::select! {
            // Inbound: transport frames to the hub
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        state.hub.process_inbound(&session, text.as_bytes()).await;
                    }
                    Some(Ok(WsMessage::Binary(data))) => {
                        state.hub.process_inbound(&session, &data).await;
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        if ws_sender.send(WsMessage::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        tracing::debug!(session = %session.id(), "WebSocket closed by client");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(session = %session.id(), "WebSocket read error: {e}");
                        break;
                    }
                }
            }

            // Outbound: accepted messages to the transport
            message = outbound.recv() => {
                match message {
                    Some(message) => {
                        let json = match serde_json::to_string(&*message) {
                            Ok(json) => json,
                            Err(e) => {
                                tracing::error!("failed to serialize message: {e}");
                                continue;
                            }
                        };
                        if ws_sender.send(WsMessage::Text(json.into())).await.is_err() {
                            tracing::debug!(session = %session.id(), "WebSocket write failed");
                            break;
                        }
                    }
                    // Queue closed: evicted, disconnected for backpressure,
                    // or the room was removed.
                    None => {
                        tracing::debug!(session = %session.id(), "outbound queue closed");
                        break;
                    }
                }
            }
        }
    }

    // Single cleanup path regardless of which branch ended the loop.
    state.hub.detach_client(&session).await;
    tracing::info!(room = %session.room_id(), name = %session.name(), "client disconnected");
}
