//! # RTS Game Server Library
//!
//! Authoritative server core for a small real-time strategy game. Players
//! connect over WebSocket, issue commands (move units, place buildings,
//! train units) and receive the full world state after every tick.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server owns the only copy of the world. Every tick it moves units,
//! resolves melee combat, runs the builder gather/deposit cycle, decays
//! production cooldowns and sweeps dead entities. Clients only ever see
//! snapshots of that state.
//!
//! ### Command Processing
//! Commands from every connection go through one FIFO queue that only the
//! tick loop drains. Each submitter waits for its own outcome, and the tick
//! loop stops draining once its time budget is spent so a burst of commands
//! can never stretch a tick.
//!
//! ### State Broadcasting
//! After each tick the world is encoded once (JSON text or bincode binary)
//! and pushed into every client's bounded outbound channel. Clients that
//! fall too far behind are disconnected instead of slowing the loop down.
//!
//! ## Module Organization
//!
//! - `registry`: world-wide entity id allocation and reuse
//! - `game`: players, resource nodes, the tick pass and the death sweep
//! - `movement`, `combat`, `economy`: per-entity systems run by the tick
//! - `production`: catalog-driven building placement and unit training
//! - `commands`: request validation and dispatch
//! - `command_queue`: the single-writer hand-off between connections and the tick
//! - `game_loop`: fixed-rate scheduling, budgeting and shutdown
//! - `snapshot`: per-tick state encoding and publishing
//! - `client_manager`: player slots and outbound channels
//! - `network`: WebSocket accept loop and per-connection tasks
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::client_manager::ClientManager;
//! use server::command_queue::command_channel;
//! use server::game::{Game, GameConfig};
//! use server::game_loop::{GameLoop, GameLoopConfig};
//! use server::network::Server;
//! use server::snapshot::SnapshotPublisher;
//! use std::sync::Arc;
//! use tokio::sync::{oneshot, RwLock};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GameConfig::default();
//!     let clients = Arc::new(RwLock::new(ClientManager::new(config.players)));
//!     let (commands, queue) = command_channel();
//!
//!     let server = Server::bind("127.0.0.1:8080", Arc::clone(&clients), commands).await?;
//!     tokio::spawn(server.run());
//!
//!     let game_loop = GameLoop::new(
//!         Game::new(&config),
//!         queue,
//!         clients,
//!         SnapshotPublisher::default(),
//!         GameLoopConfig::from_tick_rate(30),
//!     );
//!     let (_stop, shutdown) = oneshot::channel();
//!     game_loop.run(shutdown).await;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod combat;
pub mod command_queue;
pub mod commands;
pub mod economy;
pub mod error;
pub mod game;
pub mod game_loop;
pub mod movement;
pub mod network;
pub mod production;
pub mod registry;
pub mod snapshot;

pub use error::{GameError, GameResult};
