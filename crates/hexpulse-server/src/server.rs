//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, RoomInfo, RoomStatus, ServerMessage};
use crate::room::GameRoom;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use hexpulse_core::GameConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Slowest and fastest session tick rates accepted
pub const MIN_TICK_HZ: f64 = 1.0;
pub const MAX_TICK_HZ: f64 = 1000.0;

/// Keep a tick rate inside a range `tokio::time::interval` can run.
///
/// Non-finite rates fall back to the slowest rate.
pub fn clamp_tick_hz(tick_hz: f64) -> f64 {
    if tick_hz.is_finite() {
        tick_hz.clamp(MIN_TICK_HZ, MAX_TICK_HZ)
    } else {
        MIN_TICK_HZ
    }
}

/// Server state shared across all connections.
pub struct ServerState {
    /// All active rooms
    pub rooms: DashMap<Uuid, GameRoom>,
    /// Mapping from player ID to their room ID
    pub player_rooms: DashMap<Uuid, Uuid>,
    /// Mapping from player ID to their message sender
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    /// Settings every new room starts from
    pub config: GameConfig,
    /// Session ticks per second
    pub tick_hz: f64,
}

impl ServerState {
    pub fn new(config: GameConfig, tick_hz: f64) -> Self {
        Self {
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
            player_senders: DashMap::new(),
            config,
            tick_hz: clamp_tick_hz(tick_hz),
        }
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    /// Broadcast a message to all players in a room.
    pub fn broadcast_to_room(&self, room_id: Uuid, msg: ServerMessage) {
        if let Some(room) = self.rooms.get(&room_id) {
            for player_id in room.players.keys() {
                self.send_to_player(*player_id, msg.clone());
            }
        }
    }

    /// Broadcast a message to all players in a room except one.
    pub fn broadcast_to_room_except(&self, room_id: Uuid, except: Uuid, msg: ServerMessage) {
        if let Some(room) = self.rooms.get(&room_id) {
            for player_id in room.players.keys() {
                if *player_id != except {
                    self.send_to_player(*player_id, msg.clone());
                }
            }
        }
    }

    /// Send addressed game events.
    pub fn deliver(&self, deliveries: Vec<(Uuid, ServerMessage)>) {
        for (player_id, msg) in deliveries {
            self.send_to_player(player_id, msg);
        }
    }

    /// Get list of rooms with a free seat.
    pub fn get_open_rooms(&self) -> Vec<RoomInfo> {
        self.rooms
            .iter()
            .filter(|r| !r.is_full())
            .map(|r| r.to_info())
            .collect()
    }

    fn room_of(&self, player_id: Uuid) -> Option<Uuid> {
        self.player_rooms.get(&player_id).map(|r| *r)
    }

    fn send_error(&self, player_id: Uuid, message: impl Into<String>) {
        self.send_to_player(
            player_id,
            ServerMessage::Error {
                message: message.into(),
            },
        );
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(tick_hz = state.tick_hz, "Hexpulse server listening on {}", addr);

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

/// Tick a room until it is removed.
fn spawn_room_ticker(room_id: Uuid, state: Arc<ServerState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / state.tick_hz));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Instant::now();

        loop {
            interval.tick().await;
            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f64();
            last = now;

            let deliveries = match state.rooms.get_mut(&room_id) {
                Some(mut room) => {
                    room.tick(dt);
                    room.take_deliveries()
                }
                None => break,
            };
            state.deliver(deliveries);
        }

        debug!(room = %room_id, "Room ticker stopped");
    });
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign a player ID
    let player_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);

    // Send welcome message
    let welcome = ServerMessage::Welcome { player_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // Spawn task to forward messages from channel to WebSocket
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
                    state.send_error(player_id, format!("Malformed message: {}", e));
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to_player(player_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect
    handle_disconnect(player_id, &state);
    state.player_senders.remove(&player_id);
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(player_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateRoom {
            player_name,
            max_players,
        } => {
            if state.room_of(player_id).is_some() {
                state.send_error(player_id, "Already in a room");
                return;
            }
            let room_id = Uuid::new_v4();
            let seed = room_id.as_u128() as u64;
            let mut room = match GameRoom::new(
                room_id,
                player_id,
                player_name,
                max_players,
                state.config.clone(),
                seed,
            ) {
                Ok(room) => room,
                Err(e) => {
                    error!("Could not create room: {}", e);
                    state.send_error(player_id, e.to_string());
                    return;
                }
            };
            let room_info = room.to_info();
            let game_id = room.game_id(player_id).unwrap_or_default();
            let board = room.board_snapshot();
            let deliveries = room.take_deliveries();

            state.rooms.insert(room_id, room);
            state.player_rooms.insert(player_id, room_id);
            spawn_room_ticker(room_id, Arc::clone(state));
            info!(room = %room_id, seed, "Room created");

            state.send_to_player(player_id, ServerMessage::RoomCreated { room_id });
            state.send_to_player(
                player_id,
                ServerMessage::JoinedRoom {
                    room: room_info,
                    game_id,
                },
            );
            send_board(state, player_id, board);
            state.deliver(deliveries);
        }

        ClientMessage::JoinRoom {
            room_id,
            player_name,
        } => {
            if state.room_of(player_id).is_some() {
                state.send_error(player_id, "Already in a room");
                return;
            }
            let Some(mut room) = state.rooms.get_mut(&room_id) else {
                state.send_error(player_id, "Room not found");
                return;
            };
            match room.add_player(player_id, player_name) {
                Ok(game_id) => {
                    let room_info = room.to_info();
                    let board = room.board_snapshot();
                    let deliveries = room.take_deliveries();
                    state.player_rooms.insert(player_id, room_id);

                    // Release lock before broadcasting
                    drop(room);
                    state.send_to_player(
                        player_id,
                        ServerMessage::JoinedRoom {
                            room: room_info.clone(),
                            game_id,
                        },
                    );
                    send_board(state, player_id, board);
                    state.deliver(deliveries);
                    state.broadcast_to_room_except(
                        room_id,
                        player_id,
                        ServerMessage::RoomUpdated { room: room_info },
                    );
                }
                Err(e) => state.send_error(player_id, e.to_string()),
            }
        }

        ClientMessage::LeaveRoom => {
            if let Some((_, room_id)) = state.player_rooms.remove(&player_id) {
                leave_room(player_id, room_id, state);
                state.send_to_player(player_id, ServerMessage::LeftRoom);
            }
        }

        ClientMessage::AddBot { difficulty } => {
            let Some(room_id) = state.room_of(player_id) else {
                state.send_error(player_id, "Not in a room");
                return;
            };
            if let Some(mut room) = state.rooms.get_mut(&room_id) {
                match room.add_bot(player_id, difficulty) {
                    Ok(_) => {
                        let room_info = room.to_info();
                        let deliveries = room.take_deliveries();
                        drop(room);
                        state.deliver(deliveries);
                        state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
                    }
                    Err(e) => state.send_error(player_id, e.to_string()),
                }
            }
        }

        ClientMessage::Game { request } => {
            let Some(room_id) = state.room_of(player_id) else {
                state.send_error(player_id, "Not in a room");
                return;
            };
            if let Some(mut room) = state.rooms.get_mut(&room_id) {
                match room.handle_request(player_id, request) {
                    Ok(()) => {
                        let deliveries = room.take_deliveries();
                        drop(room);
                        state.deliver(deliveries);
                    }
                    Err(e) => {
                        drop(room);
                        state.send_error(player_id, e.to_string());
                    }
                }
            }
        }

        ClientMessage::ListRooms => {
            let rooms = state.get_open_rooms();
            state.send_to_player(player_id, ServerMessage::RoomList { rooms });
        }

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}

fn send_board(
    state: &ServerState,
    player_id: Uuid,
    board: Result<serde_json::Value, serde_json::Error>,
) {
    match board {
        Ok(board) => state.send_to_player(player_id, ServerMessage::Board { board }),
        Err(e) => error!("Could not serialize board: {}", e),
    }
}

/// Remove a player from a room, closing the room when no humans remain.
fn leave_room(player_id: Uuid, room_id: Uuid, state: &ServerState) {
    let should_remove = {
        let Some(mut room) = state.rooms.get_mut(&room_id) else {
            return;
        };
        let is_empty =
            room.remove_player(player_id).unwrap_or(false) || !room.has_connected_humans();
        let room_info = room.to_info();
        let deliveries = room.take_deliveries();
        drop(room);

        state.deliver(deliveries);
        if !is_empty {
            state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
        }
        is_empty
    };

    if should_remove {
        state.rooms.remove(&room_id);
        info!(room = %room_id, "Room closed");
    }
}

/// Handle player disconnect.
fn handle_disconnect(player_id: Uuid, state: &Arc<ServerState>) {
    let Some((_, room_id)) = state.player_rooms.remove(&player_id) else {
        return;
    };

    let running = state
        .rooms
        .get(&room_id)
        .map(|r| r.status() == RoomStatus::Running)
        .unwrap_or(false);
    if !running {
        leave_room(player_id, room_id, state);
        return;
    }

    // Keep the player's holdings while the pulse runs
    let should_remove = {
        let Some(mut room) = state.rooms.get_mut(&room_id) else {
            return;
        };
        room.set_player_connected(player_id, false);
        let abandoned = !room.has_connected_humans();
        let room_info = room.to_info();
        drop(room);

        if !abandoned {
            state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
        }
        abandoned
    };

    if should_remove {
        state.rooms.remove(&room_id);
        info!(room = %room_id, "Room closed after last player disconnected");
    }
}
