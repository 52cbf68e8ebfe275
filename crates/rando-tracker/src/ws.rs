//! `WebSocket` handler for tracker clients.
//!
//! Each connection registers with the hub, kicks off its baseline and
//! then drains its outbound queue into the socket until the client goes
//! away or the hub closes it. Frames from the client are ignored.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::hub::{ClientSession, Outbound, TrackerHub};
use crate::source::GameStateSource;

/// Upgrade an HTTP request to a tracker connection.
///
/// # Route
///
/// `GET /`
pub async fn ws_tracker<S: GameStateSource>(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<TrackerHub<S>>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

async fn handle_ws<S: GameStateSource>(socket: WebSocket, hub: Arc<TrackerHub<S>>) {
    let ClientSession { id, mut outbound } = hub.register_client().await;

    // The baseline is queued behind the scenes; the writer below starts
    // draining as soon as the first frame lands.
    let baseline_hub = Arc::clone(&hub);
    tokio::spawn(async move {
        if let Err(e) = baseline_hub.on_client_connected(id).await {
            warn!(client_id = id, error = %e, "Tracker client left without baseline");
        }
    });

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            queued = outbound.recv() => {
                match queued {
                    Some(Outbound::Frame(frame)) => {
                        if sender.send(Message::Binary(frame)).await.is_err() {
                            debug!(client_id = id, "Tracker send failed, client gone");
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        if sender.send(Message::Close(None)).await.is_err() {
                            debug!(client_id = id, "Close frame not delivered");
                        }
                        break;
                    }
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(client_id = id, "Tracker client closed the socket");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(client_id = id, "Tracker socket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Trackers are read-only consumers.
                    }
                }
            }
        }
    }

    hub.disconnect_client(id).await;
}
