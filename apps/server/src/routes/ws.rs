//! # Change Feed WebSocket
//!
//! Pushes every committed change topic to connected clients.
//!
//! ## Connection Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  GET /ws ──▶ upgrade ──▶ subscribe(BroadcastNotifier)                   │
//! │                               │                                         │
//! │          ┌────────────────────┼────────────────────┐                    │
//! │          ▼                    ▼                    ▼                    │
//! │   forward task          ping task            receive loop              │
//! │   topic ──▶ text frame  every 30 s           Ping ──▶ Pong              │
//! │   Lagged ──▶ skip                            Close / error ──▶ stop     │
//! │          │                    │                                         │
//! │          └───────► outgoing mpsc ──▶ socket sink                        │
//! │                                                                         │
//! │  Frame: {"topic":"inventory-changed"}                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Clients re-fetch whatever the topic names. Anything else they send is
//! ignored.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use toolcrib_core::Topic;

use crate::state::AppState;

/// Ping interval to keep connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Clients only send control frames.
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Text frame pushed for each topic.
#[derive(Debug, Serialize)]
struct TopicFrame {
    topic: Topic,
}

/// Encodes `topic` as the JSON text of a frame.
pub fn topic_frame(topic: Topic) -> String {
    serde_json::to_string(&TopicFrame { topic })
        .unwrap_or_else(|_| format!("{{\"topic\":\"{}\"}}", topic))
}

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let connection = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
    info!(connection, "New WebSocket connection");
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, connection))
}

/// Handles one subscriber until it disconnects.
async fn handle_socket(socket: WebSocket, state: AppState, connection: u64) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before anything else so no topic committed from here on is missed
    let mut topics = state.notifier.subscribe();

    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(64);

    // Outgoing message task
    let outgoing_handle = tokio::spawn(async move {
        while let Some(msg) = outgoing_rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Topic forwarding task
    let outgoing_tx_topics = outgoing_tx.clone();
    let forward_handle = tokio::spawn(async move {
        loop {
            match topics.recv().await {
                Ok(topic) => {
                    let frame = Message::Text(topic_frame(topic).into());
                    if outgoing_tx_topics.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(connection, skipped, "Subscriber lagged, topics skipped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Ping task
    let outgoing_tx_ping = outgoing_tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_interval = interval(PING_INTERVAL);
        loop {
            ping_interval.tick().await;
            if outgoing_tx_ping
                .send(Message::Ping(axum::body::Bytes::new()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Main receive loop
    loop {
        match receiver.next().await {
            Some(Ok(Message::Ping(data))) => {
                let _ = outgoing_tx.send(Message::Pong(data)).await;
            }
            Some(Ok(Message::Close(_))) => {
                info!(connection, "Client requested close");
                break;
            }
            Some(Ok(_)) => {
                debug!(connection, "Ignoring client message");
            }
            Some(Err(e)) => {
                warn!(connection, ?e, "WebSocket error");
                break;
            }
            None => {
                info!(connection, "Client disconnected");
                break;
            }
        }
    }

    // Cleanup
    ping_handle.abort();
    forward_handle.abort();
    outgoing_handle.abort();
}
