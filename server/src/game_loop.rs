//! Fixed-rate tick loop: the single writer of game state.

use crate::client_manager::ClientManager;
use crate::command_queue::CommandQueue;
use crate::game::Game;
use crate::snapshot::SnapshotPublisher;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tokio::time::{interval, Instant, MissedTickBehavior};

#[derive(Debug, Clone, Copy)]
pub struct GameLoopConfig {
    pub tick_interval: Duration,
    /// Part of each tick kept free of command processing for the simulation.
    pub command_reserve: Duration,
    /// Emit tick statistics every this many ticks.
    pub stats_every: u64,
}

impl GameLoopConfig {
    pub fn from_tick_rate(tick_rate: u32) -> Self {
        Self {
            tick_interval: Duration::from_secs_f64(1.0 / f64::from(tick_rate.max(1))),
            command_reserve: Duration::from_millis(2),
            stats_every: 100,
        }
    }

    /// Simulated seconds per tick.
    pub fn dt(&self) -> f64 {
        self.tick_interval.as_secs_f64()
    }
}

impl Default for GameLoopConfig {
    fn default() -> Self {
        Self::from_tick_rate(30)
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub commands_applied: usize,
    pub deceased: usize,
}

pub struct GameLoop {
    game: Game,
    queue: CommandQueue,
    clients: Arc<RwLock<ClientManager>>,
    publisher: SnapshotPublisher,
    config: GameLoopConfig,
    tick: u64,
}

impl GameLoop {
    pub fn new(
        game: Game,
        queue: CommandQueue,
        clients: Arc<RwLock<ClientManager>>,
        publisher: SnapshotPublisher,
        config: GameLoopConfig,
    ) -> Self {
        Self {
            game,
            queue,
            clients,
            publisher,
            config,
            tick: 0,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Applies queued commands until the reserve before `deadline` is reached,
    /// then advances the world by one fixed step.
    pub fn step(&mut self, deadline: Instant) -> TickReport {
        let budget_end = deadline
            .checked_sub(self.config.command_reserve)
            .unwrap_or(deadline);
        let commands_applied = self.queue.drain(&mut self.game, budget_end);
        self.game.update(self.config.dt());
        self.tick += 1;

        TickReport {
            tick: self.tick,
            commands_applied,
            deceased: self.game.deceased.len(),
        }
    }

    /// Ticks until `shutdown` fires (or its sender is dropped), then fails
    /// any commands still queued and hands back the final game state.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> Game {
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Game loop running at {:.1} Hz with {:?} snapshots",
            1.0 / self.config.tick_interval.as_secs_f64(),
            self.publisher.encoding()
        );

        let mut busy = Duration::ZERO;
        let mut commands = 0usize;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Game loop stopping after {} ticks", self.tick);
                    break;
                }
                _ = ticker.tick() => {
                    let started = Instant::now();
                    let report = self.step(started + self.config.tick_interval);
                    let snapshot = self.game.snapshot();
                    self.publisher.publish(&snapshot, &self.clients).await;

                    busy += started.elapsed();
                    commands += report.commands_applied;
                    if report.deceased > 0 {
                        debug!("Tick {}: {} entities removed", report.tick, report.deceased);
                    }
                    if report.tick % self.config.stats_every.max(1) == 0 {
                        let stats = self.queue.stats();
                        debug!(
                            "Tick {}: avg {:.3}ms/tick, {} commands applied, {} submitted / {} serviced total",
                            report.tick,
                            busy.as_secs_f64() * 1000.0 / self.config.stats_every.max(1) as f64,
                            commands,
                            stats.submitted(),
                            stats.serviced()
                        );
                        busy = Duration::ZERO;
                        commands = 0;
                    }
                }
            }
        }

        self.queue.close();
        self.game
    }
}
