use clap::Parser;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use shared::{GameSnapshot, ServerMessage};
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Connects to a running server, issues a few commands and prints what
/// comes back.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// WebSocket URL of the server
    #[clap(long, default_value = "ws://127.0.0.1:8080")]
    url: String,
    /// Number of state frames to read before exiting
    #[clap(long, default_value = "30")]
    frames: usize,
}

fn summarize(snapshot: &GameSnapshot) {
    println!(
        "t={:.2}s resources={} deceased={:?}",
        snapshot.elapsed_time,
        snapshot.resources.len(),
        snapshot.deceased
    );
    for player in snapshot.players.values() {
        println!(
            "  player {}: gold={:.0} stone={:.0} wood={:.0} fighters={} builders={} buildings={}",
            player.id,
            player.gold,
            player.stone,
            player.wood,
            player.fighters.len(),
            player.builders.len(),
            player.buildings.len()
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (ws_stream, _) = connect_async(args.url.as_str()).await?;
    println!("Connected to {}", args.url);
    let (mut sink, mut stream) = ws_stream.split();

    let script = json!([
        { "createBuilder": {} },
        { "placeBuilding": { "type": "house", "pos": { "x": 3.0, "z": -4.0 } } },
        { "createKnight": {} }
    ]);
    sink.send(Message::Text(script.to_string().into())).await?;

    let mut frames = 0;
    while frames < args.frames {
        let next = match timeout(Duration::from_secs(5), stream.next()).await {
            Ok(Some(frame)) => frame?,
            Ok(None) => {
                println!("Server closed the connection");
                break;
            }
            Err(_) => {
                println!("No message from server for 5s");
                break;
            }
        };

        match next {
            Message::Text(text) => match serde_json::from_str::<ServerMessage>(text.as_str())? {
                ServerMessage::PlayerNumber { player_number } => {
                    println!("Assigned player {}", player_number);
                }
                ServerMessage::CommandResponse(response) => {
                    println!(
                        "{} -> {} ({})",
                        response.operation,
                        if response.success { "ok" } else { "failed" },
                        response.message
                    );
                }
                ServerMessage::GameState(snapshot) => {
                    frames += 1;
                    if frames % 10 == 0 {
                        summarize(&snapshot);
                    }
                }
                ServerMessage::Disconnected { reason } => {
                    println!("Disconnected: {}", reason);
                    break;
                }
            },
            Message::Binary(bytes) => {
                let snapshot: GameSnapshot = bincode::deserialize(&bytes)?;
                frames += 1;
                if frames % 10 == 0 {
                    summarize(&snapshot);
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    sink.close().await?;
    Ok(())
}
