use clap::Parser;
use log::{error, info};
use server::client_manager::ClientManager;
use server::command_queue::command_channel;
use server::game::{Game, GameConfig};
use server::game_loop::{GameLoop, GameLoopConfig};
use server::network::Server;
use server::snapshot::{SnapshotEncoding, SnapshotPublisher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};

/// Authoritative RTS game server.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Tick rate (updates per second)
    #[clap(short, long, default_value = "30")]
    tick_rate: u32,
    /// Number of player slots
    #[clap(long, default_value = "2")]
    players: u32,
    /// Resource nodes scattered at start
    #[clap(long, default_value = "100")]
    resources: usize,
    /// Seed for world generation and spawn offsets
    #[clap(long)]
    seed: Option<u64>,
    /// Milliseconds of every tick kept free of command processing
    #[clap(long, default_value = "2")]
    command_reserve_ms: u64,
    /// Encoding of per-tick state frames
    #[clap(long, value_enum, default_value_t = SnapshotEncoding::Json)]
    encoding: SnapshotEncoding,
    /// Accept the grantResources command
    #[clap(long)]
    allow_cheats: bool,
}

/// Parses arguments, starts the WebSocket server and the game loop, and runs
/// until Ctrl+C or until either task ends.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let game_config = GameConfig {
        players: args.players.max(1),
        resource_nodes: args.resources,
        seed: args.seed,
        allow_cheats: args.allow_cheats,
        ..GameConfig::default()
    };
    let loop_config = GameLoopConfig {
        command_reserve: Duration::from_millis(args.command_reserve_ms),
        ..GameLoopConfig::from_tick_rate(args.tick_rate)
    };

    let clients = Arc::new(RwLock::new(ClientManager::new(game_config.players)));
    let (commands, queue) = command_channel();

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, Arc::clone(&clients), commands).await?;
    let mut server_handle = tokio::spawn(server.run());

    let game_loop = GameLoop::new(
        Game::new(&game_config),
        queue,
        clients,
        SnapshotPublisher::new(args.encoding),
        loop_config,
    );
    let (stop, shutdown) = oneshot::channel();
    let mut game_handle = tokio::spawn(game_loop.run(shutdown));

    tokio::select! {
        result = &mut server_handle => {
            match result {
                Ok(Err(e)) => error!("Network server failed: {}", e),
                Err(e) => error!("Network task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        result = &mut game_handle => {
            if let Err(e) = result {
                error!("Game loop task panicked: {}", e);
            }
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    let _ = stop.send(());
    match game_handle.await {
        Ok(game) => info!(
            "Game stopped at t={:.1}s with {} players",
            game.elapsed_time,
            game.players.len()
        ),
        Err(e) => error!("Game loop task panicked: {}", e),
    }
    server_handle.abort();
    Ok(())
}
