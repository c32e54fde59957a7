//! Connected client registry and broadcast fan-out
//!
//! This module tracks the WebSocket connections currently attached to the game:
//! - Player slot assignment on connect and release on disconnect
//! - Per-client outbound message channels drained by writer tasks
//! - Non-blocking broadcast that drops clients whose channel is full or closed
//!
//! The tick loop only ever pushes into bounded channels here, so a slow or
//! dead connection can never stall the simulation.

use log::{info, warn};
use shared::PlayerId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

/// Messages buffered per client before it is considered too slow to keep.
pub const OUTBOUND_BUFFER: usize = 64;

/// A connected client and the channel feeding its socket writer
#[derive(Debug)]
pub struct Client {
    /// Unique connection identifier assigned by the server
    pub id: u32,
    /// Player slot this connection controls
    pub player_id: PlayerId,
    /// Remote address, for logging
    pub addr: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
    outbound: mpsc::Sender<Message>,
    removed: oneshot::Sender<()>,
}

impl Client {
    pub fn new(
        id: u32,
        player_id: PlayerId,
        addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
    ) -> (Self, oneshot::Receiver<()>) {
        let (removed, removed_rx) = oneshot::channel();
        let client = Self {
            id,
            player_id,
            addr,
            connected_at: Instant::now(),
            outbound,
            removed,
        };
        (client, removed_rx)
    }

    /// Queues a message without waiting.
    ///
    /// Fails when the writer has fallen `OUTBOUND_BUFFER` messages behind or
    /// the connection is gone.
    pub fn try_send(&self, message: Message) -> Result<(), TrySendError<Message>> {
        self.outbound.try_send(message)
    }
}

/// Handed to a connection that was given a player slot.
#[derive(Debug)]
pub struct Admission {
    pub client_id: u32,
    pub player_id: PlayerId,
    /// Resolves as soon as the manager lets go of this client, whether the
    /// connection left on its own or was dropped by a broadcast.
    pub removed: oneshot::Receiver<()>,
}

/// Manages all connected clients and their player slots
///
/// Slots are numbered `1..=max_players`; a connection takes the lowest free
/// slot and gives it back when it leaves, so a reconnecting player resumes
/// control of the same side.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Next available client ID for new connections
    next_client_id: u32,
    /// Number of player slots in the game
    max_players: u32,
}

impl ClientManager {
    pub fn new(max_players: u32) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_players,
        }
    }

    /// Attempts to attach a new connection
    ///
    /// Returns `None` when every player slot is taken.
    pub fn add_client(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
    ) -> Option<Admission> {
        let player_id = self.free_slot()?;

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!(
            "Client {} connected from {} as player {}",
            client_id, addr, player_id
        );
        let (client, removed) = Client::new(client_id, player_id, addr, outbound);
        self.clients.insert(client_id, client);
        Some(Admission {
            client_id,
            player_id,
            removed,
        })
    }

    /// Removes a client, freeing its player slot
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!(
                "Client {} ({}, player {}) disconnected after {:.1}s",
                client.id,
                client.addr,
                client.player_id,
                client.connected_at.elapsed().as_secs_f64()
            );
            // The connection may already be gone.
            let _ = client.removed.send(());
            true
        } else {
            false
        }
    }

    /// Queues `message` for every client
    ///
    /// Clients whose channel is full or closed are disconnected on the spot.
    /// Returns the IDs of the clients that were dropped.
    pub fn broadcast(&mut self, message: &Message) -> Vec<u32> {
        let mut dropped = Vec::new();
        for (id, client) in &self.clients {
            match client.try_send(message.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("Client {} is not keeping up; dropping it", id);
                    dropped.push(*id);
                }
                Err(TrySendError::Closed(_)) => dropped.push(*id),
            }
        }

        for id in &dropped {
            self.remove_client(id);
        }
        dropped
    }

    pub fn max_players(&self) -> u32 {
        self.max_players
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn free_slot(&self) -> Option<PlayerId> {
        (1..=self.max_players).find(|slot| !self.clients.values().any(|c| c.player_id == *slot))
    }
}
