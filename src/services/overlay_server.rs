//! Websocket server for the browser overlay.
//!
//! Every client connected to `/ws` gets each [`OverlayUpdate`] as one JSON
//! text frame, starting with the current session if there is one.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::services::broadcast::{OverlayHub, OverlayUpdate};

#[derive(Clone)]
struct OverlayState {
    hub: OverlayHub,
    cancel: CancellationToken,
}

pub fn router(hub: OverlayHub, cancel: CancellationToken) -> Router {
    Router::new()
        .route("/ws", get(upgrade))
        .with_state(OverlayState { hub, cancel })
}

/// Serves until `cancel` fires. Open client streams are closed on the way out.
pub async fn serve(listener: TcpListener, hub: OverlayHub, cancel: CancellationToken) -> std::io::Result<()> {
    info!("overlay listening on ws://{}/ws", listener.local_addr()?);
    let shutdown = cancel.clone();
    axum::serve(listener, router(hub, cancel))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<OverlayState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_updates(socket, state))
}

async fn stream_updates(socket: WebSocket, state: OverlayState) {
    // Subscribe before replaying the session so nothing published in between is missed.
    let mut updates = state.hub.subscribe();
    let (mut sender, mut receiver) = socket.split();
    debug!("overlay client connected");

    if let Some(session) = state.hub.current_session() {
        if send(&mut sender, &session).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            _ = state.cancel.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            update = updates.recv() => match update {
                Ok(update) => {
                    if send(&mut sender, &update).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!("overlay client lagging, skipped {} updates", skipped),
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Clients have nothing to say; pings are answered by axum.
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("overlay client disconnected");
}

async fn send(sender: &mut SplitSink<WebSocket, Message>, update: &OverlayUpdate) -> Result<(), axum::Error> {
    let text = serde_json::to_string(update).map_err(axum::Error::new)?;
    sender.send(Message::Text(text)).await
}
