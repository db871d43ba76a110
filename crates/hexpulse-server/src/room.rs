//! Game room management.
//!
//! A room owns one `GameSession`. Connection IDs (UUIDs) map to in-game
//! player IDs, and events produced by the session collect in an outbox
//! until the server routes them to connections.

use hexpulse_core::{
    BoardError, Bot, BotDifficulty, ClientRequest, Decider, GameConfig, GameSession, Outbound,
    PlayerId, PlayerKind, PulseState, Recipient,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::protocol::{PlayerInfo, RoomInfo, RoomStatus, ServerMessage};

/// Seconds between bot decisions
pub const BOT_THINK_SECONDS: f64 = 1.0;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room is full")]
    RoomFull,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Not the host")]
    NotHost,

    #[error("Could not create game: {0}")]
    Board(#[from] BoardError),
}

/// A player in a game room.
#[derive(Debug, Clone)]
pub struct RoomPlayer {
    pub id: Uuid,
    pub name: String,
    /// ID inside the game session
    pub game_id: PlayerId,
    pub kind: PlayerKind,
    pub connected: bool,
}

impl RoomPlayer {
    pub fn to_info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name.clone(),
            game_id: self.game_id,
            is_bot: self.kind == PlayerKind::Bot,
            connected: self.connected,
        }
    }
}

/// A game room that can hold multiple players.
pub struct GameRoom {
    pub id: Uuid,
    pub name: String,
    pub max_players: u8,
    pub host_id: Uuid,
    pub players: HashMap<Uuid, RoomPlayer>,
    /// Join order
    pub player_order: Vec<Uuid>,
    session: GameSession,
    bots: Vec<Bot>,
    bot_clock: f64,
    outbox: Vec<Outbound>,
}

impl GameRoom {
    /// Create a room with its host already seated
    pub fn new(
        id: Uuid,
        host_id: Uuid,
        host_name: String,
        max_players: u8,
        config: GameConfig,
        seed: u64,
    ) -> Result<Self, RoomError> {
        let mut room = Self {
            id,
            name: format!("{}'s Game", host_name),
            max_players: max_players.clamp(1, 8),
            host_id,
            players: HashMap::new(),
            player_order: Vec::new(),
            session: GameSession::new(config, seed)?,
            bots: Vec::new(),
            bot_clock: 0.0,
            outbox: Vec::new(),
        };
        room.add_player(host_id, host_name)?;
        Ok(room)
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players as usize
    }

    pub fn status(&self) -> RoomStatus {
        match self.session.pulse().state() {
            PulseState::WaitingForPlayers => RoomStatus::Waiting,
            PulseState::Running | PulseState::Rolling => RoomStatus::Running,
        }
    }

    pub fn game_id(&self, player_id: Uuid) -> Option<PlayerId> {
        self.players.get(&player_id).map(|p| p.game_id)
    }

    /// Seat a human player. Returns their in-game ID.
    ///
    /// The outbox gets the live game state for them, so a late joiner sees
    /// owned tiles, collectibles and foundations placed before they arrived.
    pub fn add_player(&mut self, player_id: Uuid, name: String) -> Result<PlayerId, RoomError> {
        let game_id = self.seat(player_id, name, PlayerKind::Human)?;
        self.session.catch_up(game_id, &mut self.outbox);
        Ok(game_id)
    }

    /// Seat a bot on behalf of the host. Returns its in-game ID.
    pub fn add_bot(&mut self, requester: Uuid, difficulty: BotDifficulty) -> Result<PlayerId, RoomError> {
        if requester != self.host_id {
            return Err(RoomError::NotHost);
        }
        let name = format!("Bot {}", self.bots.len() + 1);
        let game_id = self.seat(Uuid::new_v4(), name, PlayerKind::Bot)?;
        let seed = bot_seed(self.session.seed(), game_id);
        self.bots.push(Bot::with_seed(game_id, difficulty, seed));
        debug!(room = %self.id, player = game_id, ?difficulty, "Bot seated");
        Ok(game_id)
    }

    fn seat(&mut self, player_id: Uuid, name: String, kind: PlayerKind) -> Result<PlayerId, RoomError> {
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        let game_id = self.session.join(&name, kind, &mut self.outbox);
        self.players.insert(
            player_id,
            RoomPlayer {
                id: player_id,
                name,
                game_id,
                kind,
                connected: true,
            },
        );
        self.player_order.push(player_id);
        Ok(game_id)
    }

    /// Remove a player from the room and the game.
    ///
    /// Returns true if no human players remain.
    pub fn remove_player(&mut self, player_id: Uuid) -> Result<bool, RoomError> {
        let player = self
            .players
            .remove(&player_id)
            .ok_or(RoomError::PlayerNotInRoom)?;
        self.player_order.retain(|&id| id != player_id);
        self.session.leave(player.game_id, &mut self.outbox);
        self.bots.retain(|b| b.player_id() != player.game_id);

        // If host left, hand the room to the next human
        if player_id == self.host_id {
            let next = self.humans().next().map(|p| p.id);
            if let Some(next) = next {
                self.host_id = next;
            }
        }

        Ok(self.humans().next().is_none())
    }

    pub fn set_player_connected(&mut self, player_id: Uuid, connected: bool) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.connected = connected;
        }
    }

    /// Whether any human is still connected
    pub fn has_connected_humans(&self) -> bool {
        self.humans().any(|p| p.connected)
    }

    /// Run a player's request through the session
    pub fn handle_request(&mut self, player_id: Uuid, request: ClientRequest) -> Result<(), RoomError> {
        let game_id = self.game_id(player_id).ok_or(RoomError::PlayerNotInRoom)?;
        let out = self.session.handle(game_id, request);
        self.outbox.extend(out);
        Ok(())
    }

    /// Let bots act, then advance the session by `dt` seconds
    pub fn tick(&mut self, dt: f64) {
        self.bot_clock += dt;
        if self.bot_clock >= BOT_THINK_SECONDS {
            self.bot_clock -= BOT_THINK_SECONDS;
            for bot in &mut self.bots {
                if let Some(request) = bot.decide(&self.session) {
                    let out = self.session.handle(bot.player_id(), request);
                    self.outbox.extend(out);
                }
            }
        }
        self.session.tick_into(dt, &mut self.outbox);
    }

    pub fn board_snapshot(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self.session.board())
    }

    /// Drain pending events, addressed to connected humans
    pub fn take_deliveries(&mut self) -> Vec<(Uuid, ServerMessage)> {
        let outbox = std::mem::take(&mut self.outbox);
        let mut deliveries = Vec::new();
        for Outbound { to, event } in outbox {
            match to {
                Recipient::All => {
                    for player in self.humans().filter(|p| p.connected) {
                        deliveries.push((player.id, ServerMessage::Game { event: event.clone() }));
                    }
                }
                Recipient::Player(game_id) => {
                    if let Some(player) = self
                        .humans()
                        .find(|p| p.game_id == game_id && p.connected)
                    {
                        deliveries.push((player.id, ServerMessage::Game { event }));
                    }
                }
            }
        }
        deliveries
    }

    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            players: self
                .player_order
                .iter()
                .filter_map(|id| self.players.get(id).map(|p| p.to_info()))
                .collect(),
            max_players: self.max_players,
            host_id: self.host_id,
            status: self.status(),
        }
    }

    fn humans(&self) -> impl Iterator<Item = &RoomPlayer> {
        self.player_order
            .iter()
            .filter_map(|id| self.players.get(id))
            .filter(|p| p.kind == PlayerKind::Human)
    }
}

/// Bots replay identically for a given session seed and seat
fn bot_seed(session_seed: u64, game_id: PlayerId) -> u64 {
    session_seed ^ u64::from(game_id).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
