//! FIFO hand-off of player commands to the tick loop.
//!
//! Connection tasks hold a cloneable [`CommandSender`] and await the outcome
//! of each submission. The tick loop owns the single [`CommandQueue`] and is
//! the only place commands are applied, so game state has exactly one writer.

use crate::commands::{self, CommandOutcome};
use crate::error::GameError;
use crate::game::Game;
use log::{debug, warn};
use shared::{CommandRequest, PlayerId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

struct QueuedCommand {
    player: PlayerId,
    request: CommandRequest,
    reply: oneshot::Sender<CommandOutcome>,
}

/// Submission and service counters, readable from any task.
#[derive(Debug, Default)]
pub struct QueueStats {
    submitted: AtomicU64,
    serviced: AtomicU64,
}

impl QueueStats {
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    pub fn serviced(&self) -> u64 {
        self.serviced.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<QueuedCommand>,
    stats: Arc<QueueStats>,
}

impl CommandSender {
    /// Enqueues `request` and waits until the tick loop has applied it.
    ///
    /// Resolves with a `GameStopped` failure if the queue is closed before
    /// or while the command is pending.
    pub async fn submit(&self, player: PlayerId, request: CommandRequest) -> CommandOutcome {
        let (reply, outcome) = oneshot::channel();
        self.stats.submitted.fetch_add(1, Ordering::SeqCst);

        let queued = QueuedCommand {
            player,
            request,
            reply,
        };
        if self.tx.send(queued).is_err() {
            self.stats.submitted.fetch_sub(1, Ordering::SeqCst);
            return CommandOutcome::failed(&GameError::GameStopped);
        }

        outcome
            .await
            .unwrap_or_else(|_| CommandOutcome::failed(&GameError::GameStopped))
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }
}

pub struct CommandQueue {
    rx: mpsc::UnboundedReceiver<QueuedCommand>,
    stats: Arc<QueueStats>,
}

pub fn command_channel() -> (CommandSender, CommandQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stats = Arc::new(QueueStats::default());
    (
        CommandSender {
            tx,
            stats: Arc::clone(&stats),
        },
        CommandQueue { rx, stats },
    )
}

impl CommandQueue {
    /// Applies queued commands in arrival order until the queue is empty or
    /// `budget_end` has passed. Whatever is left waits for the next tick.
    pub fn drain(&mut self, game: &mut Game, budget_end: Instant) -> usize {
        let mut applied = 0;
        loop {
            if Instant::now() >= budget_end {
                if applied == 0 {
                    debug!("No time left for commands this tick");
                }
                break;
            }
            let Ok(queued) = self.rx.try_recv() else {
                break;
            };

            let operation = queued.request.operation.clone();
            let outcome = commands::execute(game, queued.player, &queued.request);
            self.stats.serviced.fetch_add(1, Ordering::SeqCst);
            applied += 1;

            if queued.reply.send(outcome).is_err() {
                debug!(
                    "Submitter of {} for player {} went away",
                    operation, queued.player
                );
            }
        }
        applied
    }

    /// Stops accepting commands and fails everything still pending.
    pub fn close(&mut self) -> usize {
        self.rx.close();
        let mut failed = 0;
        while let Ok(queued) = self.rx.try_recv() {
            let _ = queued
                .reply
                .send(CommandOutcome::failed(&GameError::GameStopped));
            failed += 1;
        }
        if failed > 0 {
            warn!("Failed {} pending commands on shutdown", failed);
        }
        failed
    }

    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameConfig;
    use serde_json::json;
    use shared::Resources;
    use std::time::Duration;

    fn cheat_game() -> Game {
        Game::new(&GameConfig {
            resource_nodes: 0,
            seed: Some(4),
            allow_cheats: true,
            starting_stockpile: Resources::ZERO,
            ..GameConfig::default()
        })
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(10)
    }

    fn grant_gold(amount: f64) -> CommandRequest {
        CommandRequest::new("grantResources", json!({ "gold": amount }))
    }

    #[tokio::test]
    async fn test_concurrent_grants_are_all_applied() {
        let (sender, mut queue) = command_channel();
        let mut game = cheat_game();

        let mut handles = Vec::new();
        for task in 0..8 {
            let sender = sender.clone();
            handles.push(tokio::spawn(async move {
                let mut successes = 0;
                for _ in 0..25 {
                    let player = (task % 2) + 1;
                    if sender.submit(player, grant_gold(1.0)).await.success {
                        successes += 1;
                    }
                }
                successes
            }));
        }

        let mut total = 0;
        while total < 200 {
            total += queue.drain(&mut game, far_deadline());
            tokio::task::yield_now().await;
        }

        let mut successes = 0;
        for handle in handles {
            successes += handle.await.unwrap();
        }
        assert_eq!(successes, 200);

        let stats = queue.stats();
        assert_eq!(stats.submitted(), 200);
        assert_eq!(stats.serviced(), 200);
        assert_eq!(game.player(1).unwrap().stockpile.gold, 100.0);
        assert_eq!(game.player(2).unwrap().stockpile.gold, 100.0);
    }

    #[tokio::test]
    async fn test_commands_applied_in_submission_order() {
        let (sender, mut queue) = command_channel();
        let mut game = cheat_game();

        let first = tokio::spawn({
            let sender = sender.clone();
            async move { sender.submit(1, grant_gold(50.0)).await }
        });
        while queue.stats().submitted() < 1 {
            tokio::task::yield_now().await;
        }
        let second = tokio::spawn({
            let sender = sender.clone();
            async move { sender.submit(1, CommandRequest::new("createBuilder", json!({}))).await }
        });
        while queue.stats().submitted() < 2 {
            tokio::task::yield_now().await;
        }

        assert_eq!(queue.drain(&mut game, far_deadline()), 2);
        // The builder is only affordable if the grant landed first.
        assert!(first.await.unwrap().success);
        assert!(second.await.unwrap().success);
        assert_eq!(game.player(1).unwrap().builders.len(), 1);
        assert_eq!(game.player(1).unwrap().stockpile.gold, 0.0);
    }

    #[tokio::test]
    async fn test_close_fails_pending_and_future_submissions() {
        let (sender, mut queue) = command_channel();

        let pending = tokio::spawn({
            let sender = sender.clone();
            async move { sender.submit(1, grant_gold(1.0)).await }
        });
        while queue.stats().submitted() < 1 {
            tokio::task::yield_now().await;
        }

        assert_eq!(queue.close(), 1);
        let outcome = pending.await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, GameError::GameStopped.to_string());

        let late = sender.submit(1, grant_gold(1.0)).await;
        assert!(!late.success);
        assert_eq!(queue.stats().submitted(), 1);
        assert_eq!(queue.stats().serviced(), 0);
    }

    #[tokio::test]
    async fn test_dropped_queue_releases_submitters() {
        let (sender, queue) = command_channel();
        let pending = tokio::spawn({
            let sender = sender.clone();
            async move { sender.submit(2, grant_gold(1.0)).await }
        });
        while sender.stats().submitted() < 1 {
            tokio::task::yield_now().await;
        }

        drop(queue);
        assert!(!pending.await.unwrap().success);
    }

    #[test]
    fn test_submit_after_queue_dropped() {
        let (sender, queue) = command_channel();
        drop(queue);

        let outcome = tokio_test::block_on(sender.submit(1, grant_gold(1.0)));
        assert!(!outcome.success);
        assert_eq!(sender.stats().submitted(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_budget_rolls_commands_over() {
        let (sender, mut queue) = command_channel();
        let mut game = cheat_game();

        let pending = tokio::spawn({
            let sender = sender.clone();
            async move { sender.submit(1, grant_gold(3.0)).await }
        });
        while queue.stats().submitted() < 1 {
            tokio::task::yield_now().await;
        }

        // Budget already spent: nothing is applied.
        assert_eq!(queue.drain(&mut game, Instant::now()), 0);
        assert_eq!(game.player(1).unwrap().stockpile.gold, 0.0);

        assert_eq!(queue.drain(&mut game, far_deadline()), 1);
        assert!(pending.await.unwrap().success);
        assert_eq!(game.player(1).unwrap().stockpile.gold, 3.0);
    }
}
