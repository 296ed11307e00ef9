//! Real-time subscription endpoint.
//!
//! `GET /ws` upgrades to a WebSocket. The client drives subscriptions with
//! JSON control frames:
//!
//! ```text
//! {"action":"subscribe","city":"Delhi"}
//! {"action":"unsubscribe","city":"Delhi"}
//! ```
//!
//! Each accepted control frame is acknowledged with
//! `{"kind":"subscribed"|"unsubscribed","city":...}`, then the server pushes
//! `newReading` / `newAlert` messages for subscribed cities (and broadcast
//! alerts regardless of subscriptions). Subscriptions are ephemeral: closing
//! the socket removes the connection from every topic immediately, and a
//! reconnecting client is expected to re-subscribe.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use crate::fabric::ConnId;
use crate::state::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/ws", get(upgrade))
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    // ---
    ws.on_upgrade(move |socket| client_loop(socket, state))
}

/// Inbound control frames.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum ControlMessage {
    Subscribe { city: String },
    Unsubscribe { city: String },
}

/// Acknowledgement for an accepted control frame.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum ControlAck {
    Subscribed { city: String },
    Unsubscribed { city: String },
}

async fn client_loop(socket: WebSocket, state: AppState) {
    // ---
    let (conn, mut pushes) = state.fabric.register().await;
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            push = pushes.recv() => {
                // The fabric dropping our queue means we were reaped.
                let Some(message) = push else { break };
                match serde_json::to_string(&message) {
                    Ok(text) => {
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!(conn = %conn, "push serialization failed: {}", e),
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match handle_control(&state, conn, &text).await {
                            Some(ack) => {
                                // Ack serialization cannot fail for these types.
                                let body = serde_json::to_string(&ack).unwrap_or_default();
                                if sink.send(Message::Text(body.into())).await.is_err() {
                                    break;
                                }
                            }
                            None => {
                                tracing::debug!(conn = %conn, "ignoring malformed control frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong and binary frames are ignored
                    Some(Err(e)) => {
                        tracing::debug!(conn = %conn, "socket error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    // Synchronous teardown: no grace period, no stale topic entries.
    state.fabric.disconnect(conn).await;
}

async fn handle_control(state: &AppState, conn: ConnId, text: &str) -> Option<ControlAck> {
    // ---
    match serde_json::from_str::<ControlMessage>(text).ok()? {
        ControlMessage::Subscribe { city } => {
            state.fabric.subscribe(conn, &city).await;
            Some(ControlAck::Subscribed { city })
        }
        ControlMessage::Unsubscribe { city } => {
            state.fabric.unsubscribe(conn, &city).await;
            Some(ControlAck::Unsubscribed { city })
        }
    }
}
