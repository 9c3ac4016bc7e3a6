//! WebSocket server, connection handling, and room fan-out.

use crate::bus::EventBus;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::{MatchRegistry, RegistryError};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use kotak_core::{match_room, EventEnvelope, MoveRequest, LOBBY_ROOM};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// All live matches
    pub registry: MatchRegistry,
    /// Publish half of the event channel
    pub bus: EventBus,
    /// Mapping from player ID to their connection's outbox
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    /// Room name -> players subscribed to it
    pub rooms: DashMap<String, HashSet<Uuid>>,
}

impl ServerState {
    pub fn new(bus: EventBus) -> Self {
        Self {
            registry: MatchRegistry::new(),
            bus,
            player_senders: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    /// Subscribe a player to a room.
    pub fn subscribe(&self, player_id: Uuid, room: String) {
        self.rooms.entry(room).or_default().insert(player_id);
    }

    /// Remove a player from a room.
    pub fn unsubscribe(&self, player_id: Uuid, room: &str) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.remove(&player_id);
        }
    }

    /// Deliver a published envelope to every subscriber of its room.
    pub fn dispatch(&self, envelope: EventEnvelope) {
        let members: Vec<Uuid> = match self.rooms.get(&envelope.room) {
            Some(members) => members.iter().copied().collect(),
            None => return,
        };

        for player_id in members {
            self.send_to_player(
                player_id,
                ServerMessage::Event {
                    event: envelope.event.clone(),
                    data: envelope.data.clone(),
                    room: envelope.room.clone(),
                },
            );
        }
    }
}

/// Run the server: the event dispatcher plus the accept loop.
pub async fn run_server(
    addr: SocketAddr,
    state: Arc<ServerState>,
    mut events: mpsc::UnboundedReceiver<EventEnvelope>,
) -> anyhow::Result<()> {
    // Fan published envelopes out to room subscribers
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(envelope) = events.recv().await {
                state.dispatch(envelope);
            }
        });
    }

    let listener = TcpListener::bind(addr).await?;
    info!("Kotak server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    // Assign an identity for this connection; upstream authentication is a
    // collaborator, the engine only ever sees this opaque id.
    let player_id = Uuid::new_v4();

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);

    // Send welcome message
    let welcome = ServerMessage::Welcome { player_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // Forward messages from the outbox to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(player_id, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {}", player_id, e);
                    state.send_to_player(
                        player_id,
                        ServerMessage::Error {
                            code: "invalid_input".to_string(),
                            message: format!("malformed message: {}", e),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
        }
    }

    // Clean up on disconnect
    handle_disconnect(player_id, &state);
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(player_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateMatch { grid_size } => {
            match state.registry.create(player_id, grid_size) {
                Ok((snapshot, event)) => {
                    info!(
                        "Player {} created match {} ({})",
                        player_id, snapshot.id, snapshot.code
                    );
                    // The creator follows their own match
                    state.subscribe(player_id, match_room(snapshot.id));
                    state.send_to_player(player_id, ServerMessage::MatchState { state: snapshot });
                    state.bus.publish(&event);
                }
                Err(e) => send_error(state, player_id, &e),
            }
        }

        ClientMessage::JoinMatch { code } => match state.registry.join(&code, player_id) {
            Ok((snapshot, event)) => {
                info!("Player {} joined match {}", player_id, snapshot.id);
                state.subscribe(player_id, match_room(snapshot.id));
                state.send_to_player(player_id, ServerMessage::MatchState { state: snapshot });
                if let Some(event) = event {
                    state.bus.publish(&event);
                }
            }
            Err(e) => send_error(state, player_id, &e),
        },

        ClientMessage::GetMatch { match_id } => match state.registry.get(match_id) {
            Ok(snapshot) => {
                state.send_to_player(player_id, ServerMessage::MatchState { state: snapshot });
            }
            Err(e) => send_error(state, player_id, &e),
        },

        ClientMessage::ListMatches => {
            let matches = state.registry.waiting();
            state.send_to_player(player_id, ServerMessage::MatchList { matches });
        }

        ClientMessage::PlayMove {
            match_id,
            row,
            col,
            orientation,
            idempotency_key,
        } => {
            let request = MoveRequest {
                row,
                col,
                orientation,
                idempotency_key,
            };
            match state.registry.play_move(match_id, player_id, &request) {
                Ok((outcome, event)) => {
                    state.send_to_player(player_id, ServerMessage::MoveResult { outcome });
                    if let Some(event) = event {
                        state.bus.publish(&event);
                    }
                }
                Err(e) => send_error(state, player_id, &e),
            }
        }

        ClientMessage::WatchMatch { match_id } => {
            state.subscribe(player_id, match_room(match_id));
        }

        ClientMessage::UnwatchMatch { match_id } => {
            state.unsubscribe(player_id, &match_room(match_id));
        }

        ClientMessage::JoinLobby => {
            state.subscribe(player_id, LOBBY_ROOM.to_string());
        }

        ClientMessage::LeaveLobby => {
            state.unsubscribe(player_id, LOBBY_ROOM);
        }

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}

fn send_error(state: &ServerState, player_id: Uuid, err: &RegistryError) {
    state.send_to_player(
        player_id,
        ServerMessage::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    );
}

/// Drop a disconnected player's outbox and room subscriptions. Matches they
/// are seated in stay as they are; seats are never vacated.
fn handle_disconnect(player_id: Uuid, state: &Arc<ServerState>) {
    state.player_senders.remove(&player_id);
    for mut members in state.rooms.iter_mut() {
        members.remove(&player_id);
    }
}
