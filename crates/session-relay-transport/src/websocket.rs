//! WebSocket endpoint lifecycle: connect, replay, live relay, removal.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use session_relay_core::{EventRecord, Session, SessionRegistry};
use tokio::sync::mpsc;

/// WebSocket handler state.
#[derive(Clone)]
pub struct WsState {
    /// Registry the relay endpoints resolve their sessions against.
    pub registry: Arc<SessionRegistry>,
}

/// Router exposing the relay channel at `/{token}/websocket`.
///
/// Merge this into the surrounding application's router.
#[must_use]
pub fn router(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/{token}/websocket", get(ws_handler))
        .with_state(WsState { registry })
}

/// WebSocket upgrade handler for one session token.
///
/// The session is resolved (or lazily created) before the upgrade completes;
/// the token is the connection's only addressing information.
pub async fn ws_handler(
    Path(token): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<WsState>,
) -> impl IntoResponse {
    let session = state.registry.resolve_or_create(&token);
    ws.on_upgrade(move |socket| relay_socket(socket, session))
}

/// Drive one endpoint from connect to close.
async fn relay_socket(socket: WebSocket, session: Arc<Session>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Outbound half of the endpoint. A dedicated task drains the queue into
    // the socket, so a slow receiver never holds up the session.
    let (tx, mut rx) = mpsc::unbounded_channel::<EventRecord>();
    let send_task = tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            if ws_sender
                .send(Message::Text(record.as_str().to_owned().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Replay happens inside join, before the first inbound frame is read.
    let endpoint = session.join(tx);
    tracing::info!(token = %session.token(), %endpoint, "endpoint connected");

    while let Some(frame) = ws_receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s.into(),
                Err(_) => continue,
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::error!(token = %session.token(), %endpoint, "websocket error: {e}");
                break;
            }
        };

        match EventRecord::parse(&text) {
            Ok(record) => {
                session.publish(endpoint, &record);
            }
            // One bad payload is not worth the connection: drop it and move on.
            Err(e) => {
                tracing::warn!(token = %session.token(), %endpoint, "dropping inbound payload: {e}");
            }
        }
    }

    // Any exit path counts as a disconnect; the session itself survives.
    session.leave(endpoint);
    send_task.abort();
    tracing::info!(token = %session.token(), %endpoint, "endpoint disconnected");
}
