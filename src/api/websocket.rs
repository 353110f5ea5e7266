//! WebSocket support for real-time transaction updates
//!
//! Relays the session's transaction event stream to connected clients:
//! every record appended to the history is pushed as a JSON event.

use crate::session::{SessionStore, TransactionRecord};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// WebSocket events pushed to clients
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsEvent {
    /// Connection established
    Connected { message: String },
    /// A transaction record was appended to the history
    Transaction { record: TransactionRecord },
}

/// Bridges the store's transaction stream onto WebSocket connections
#[derive(Debug)]
pub struct WsBroadcaster {
    store: Arc<SessionStore>,
}

impl WsBroadcaster {
    /// Create a broadcaster over the given store
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Subscribe to appended transaction records
    pub fn subscribe(&self) -> broadcast::Receiver<TransactionRecord> {
        self.store.subscribe_transactions()
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<crate::api::handlers::ApiState>,
) -> impl IntoResponse {
    let broadcaster = state.ws_broadcaster.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, broadcaster: Arc<WsBroadcaster>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before greeting so no record falls in between
    let mut rx = broadcaster.subscribe();

    let welcome = WsEvent::Connected {
        message: "Connected to contract workbench".to_string(),
    };
    if let Ok(json) = serde_json::to_string(&welcome) {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    // Forward appended records to this client
    let mut send_task = tokio::spawn(async move {
        loop {
            let record = match rx.recv().await {
                Ok(record) => record,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // Slow client: records were skipped, never reordered
                    log::warn!("WebSocket client lagged, {} record(s) skipped", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let event = WsEvent::Transaction { record };
            if let Ok(json) = serde_json::to_string(&event) {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages (for ping/pong and graceful close)
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(data)) => {
                    // Pong is handled automatically by axum
                    log::debug!("Received ping: {:?}", data);
                }
                Ok(Message::Text(text)) => {
                    log::debug!("Received text message: {}", text);
                }
                Err(e) => {
                    log::warn!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    log::info!("WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = WsEvent::Transaction {
            record: TransactionRecord::deploy("Token", "0xme", "0xABC", 21000, "0xdeadbeef"),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Transaction"));
        assert!(json.contains("0xABC"));
        assert!(json.contains(r#""status":"success""#));
    }

    #[tokio::test]
    async fn test_broadcaster_relays_store_appends() {
        let store = Arc::new(SessionStore::new("0xme"));
        let broadcaster = WsBroadcaster::new(store.clone());
        let mut rx = broadcaster.subscribe();

        store.append_history(TransactionRecord::deploy("T", "0xme", "0x1", 1, "0xh"));

        assert_eq!(rx.recv().await.unwrap().to, "0x1");
    }
}
