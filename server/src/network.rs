//! WebSocket front end: accepts players, forwards their commands to the tick
//! loop and streams outbound messages back.

use crate::client_manager::{Admission, ClientManager, OUTBOUND_BUFFER};
use crate::command_queue::CommandSender;
use crate::commands::CommandOutcome;
use crate::error::{GameError, GameResult};
use crate::snapshot::text_message;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{parse_client_frame, PlayerId, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

type WsStream = WebSocketStream<TcpStream>;
type WsSink = SplitSink<WsStream, Message>;
type WsReceiver = SplitStream<WsStream>;

/// Listening socket plus the shared handles every connection needs
pub struct Server {
    listener: TcpListener,
    clients: Arc<RwLock<ClientManager>>,
    commands: CommandSender,
}

impl Server {
    pub async fn bind(
        addr: &str,
        clients: Arc<RwLock<ClientManager>>,
        commands: CommandSender,
    ) -> GameResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            clients,
            commands,
        })
    }

    pub fn local_addr(&self) -> GameResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever, one task per connection.
    pub async fn run(self) -> GameResult<()> {
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let clients = Arc::clone(&self.clients);
            let commands = self.commands.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, clients, commands).await {
                    warn!("Connection from {} ended with error: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    clients: Arc<RwLock<ClientManager>>,
    commands: CommandSender,
) -> GameResult<()> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| GameError::Connection(format!("handshake with {} failed: {}", addr, e)))?;
    let (ws_sink, ws_receiver) = ws_stream.split();

    let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
    let writer = tokio::spawn(write_outbound(ws_sink, outbound_rx));

    let admission = {
        let mut clients = clients.write().await;
        let admission = clients.add_client(addr, outbound.clone());
        if admission.is_none() {
            info!(
                "Rejecting {}: all {} player slots are taken",
                addr,
                clients.max_players()
            );
        }
        admission
    };
    let Some(Admission {
        client_id,
        player_id,
        removed,
    }) = admission
    else {
        let full = text_message(&ServerMessage::Disconnected {
            reason: "Server full".to_string(),
        })?;
        let _ = outbound.send(full).await;
        drop(outbound);
        let _ = writer.await;
        return Ok(());
    };

    let greeting = text_message(&ServerMessage::PlayerNumber {
        player_number: player_id,
    })?;
    if outbound.send(greeting).await.is_ok() {
        read_commands(ws_receiver, player_id, removed, &commands, &outbound).await;
    }

    clients.write().await.remove_client(&client_id);
    // Last sender gone: the writer flushes what is queued and closes the socket.
    drop(outbound);
    let _ = writer.await;
    Ok(())
}

/// Forwards queued messages to the socket until every sender is gone or the
/// socket fails.
async fn write_outbound(mut ws_sink: WsSink, mut outbound_rx: mpsc::Receiver<Message>) {
    while let Some(message) = outbound_rx.recv().await {
        if let Err(e) = ws_sink.send(message).await {
            debug!("Write failed, closing connection: {}", e);
            return;
        }
    }
    let _ = ws_sink.close().await;
}

/// Reads client frames until the socket closes or the client manager drops
/// this connection.
async fn read_commands(
    mut ws_receiver: WsReceiver,
    player_id: PlayerId,
    mut removed: oneshot::Receiver<()>,
    commands: &CommandSender,
    outbound: &mpsc::Sender<Message>,
) {
    loop {
        let frame = tokio::select! {
            _ = &mut removed => {
                info!("Player {} was disconnected by the server", player_id);
                break;
            }
            frame = ws_receiver.next() => frame,
        };
        let Some(frame) = frame else {
            break;
        };

        match frame {
            Ok(Message::Text(text)) => {
                if !handle_text(text.as_str(), player_id, commands, outbound).await {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                debug!("Player {} requested close", player_id);
                break;
            }
            // tungstenite answers pings on its own
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(_) => {
                warn!("Ignoring non-text frame from player {}", player_id);
            }
            Err(e) => {
                warn!("WebSocket error for player {}: {}", player_id, e);
                break;
            }
        }
    }
}

/// Submits every command in a text frame, in order, and answers each one.
/// Returns false once the connection can no longer be written to.
async fn handle_text(
    text: &str,
    player_id: PlayerId,
    commands: &CommandSender,
    outbound: &mpsc::Sender<Message>,
) -> bool {
    let requests = match parse_client_frame(text) {
        Ok(requests) => requests,
        Err(e) => {
            warn!("Bad frame from player {}: {}", player_id, e);
            let outcome = CommandOutcome::failed(&GameError::from(e));
            return respond(outbound, outcome.into_response("unknown")).await;
        }
    };

    for request in requests {
        let operation = request.operation.clone();
        let outcome = commands.submit(player_id, request).await;
        if !respond(outbound, outcome.into_response(operation)).await {
            return false;
        }
    }
    true
}

async fn respond(outbound: &mpsc::Sender<Message>, response: shared::CommandResponse) -> bool {
    match text_message(&ServerMessage::CommandResponse(response)) {
        Ok(message) => outbound.send(message).await.is_ok(),
        Err(e) => {
            error!("Could not encode command response: {}", e);
            true
        }
    }
}
