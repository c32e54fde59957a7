//! Per-tick world state publishing and server message encoding.

use crate::client_manager::ClientManager;
use crate::error::GameResult;
use clap::ValueEnum;
use log::{trace, warn};
use serde::Serialize;
use shared::{GameSnapshot, ServerMessage};
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::Message;

/// How game state frames are put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SnapshotEncoding {
    /// `{"messageType": "gameState", "data": {...}}` text frames
    #[default]
    Json,
    /// The bare snapshot as bincode in a binary frame
    Bincode,
}

/// Borrowing twin of `ServerMessage::GameState`; serializes identically
/// without cloning the snapshot.
#[derive(Serialize)]
struct GameStateFrame<'a> {
    #[serde(rename = "messageType")]
    message_type: &'static str,
    data: &'a GameSnapshot,
}

/// Encodes a control message as a JSON text frame.
pub fn text_message(message: &ServerMessage) -> GameResult<Message> {
    Ok(Message::Text(serde_json::to_string(message)?.into()))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotPublisher {
    encoding: SnapshotEncoding,
}

impl SnapshotPublisher {
    pub fn new(encoding: SnapshotEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> SnapshotEncoding {
        self.encoding
    }

    pub fn encode(&self, snapshot: &GameSnapshot) -> GameResult<Message> {
        match self.encoding {
            SnapshotEncoding::Json => {
                let frame = GameStateFrame {
                    message_type: "gameState",
                    data: snapshot,
                };
                Ok(Message::Text(serde_json::to_string(&frame)?.into()))
            }
            SnapshotEncoding::Bincode => Ok(Message::Binary(bincode::serialize(snapshot)?.into())),
        }
    }

    /// Encodes `snapshot` once and queues it for every connected client.
    /// Returns how many clients it was queued for.
    pub async fn publish(&self, snapshot: &GameSnapshot, clients: &RwLock<ClientManager>) -> usize {
        let message = match self.encode(snapshot) {
            Ok(message) => message,
            Err(err) => {
                warn!("Could not encode snapshot: {}", err);
                return 0;
            }
        };

        let mut clients = clients.write().await;
        let dropped = clients.broadcast(&message);
        if !dropped.is_empty() {
            warn!("Dropped {} unresponsive clients", dropped.len());
        }
        trace!(
            "Published snapshot at t={:.2} to {} clients",
            snapshot.elapsed_time,
            clients.len()
        );
        clients.len()
    }
}
