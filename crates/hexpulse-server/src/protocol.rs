//! WebSocket protocol messages for Hexpulse multiplayer.
//!
//! Game traffic is wrapped, not redefined: `Game { request }` carries a core
//! `ClientRequest` and `Game { event }` carries a core `ServerEvent`.

use hexpulse_core::{BotDifficulty, ClientRequest, PlayerId, ServerEvent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new game room
    CreateRoom { player_name: String, max_players: u8 },

    /// Join an existing room
    JoinRoom { room_id: Uuid, player_name: String },

    /// Leave current room
    LeaveRoom,

    /// Add a synthetic player (host only)
    AddBot { difficulty: BotDifficulty },

    /// Submit a game request
    Game { request: ClientRequest },

    /// Request room list
    ListRooms,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned connection ID
    Welcome { player_id: Uuid },

    /// Room created successfully
    RoomCreated { room_id: Uuid },

    /// Joined room successfully, with the player's in-game ID
    JoinedRoom { room: RoomInfo, game_id: PlayerId },

    /// Left room successfully
    LeftRoom,

    /// Room membership or status changed
    RoomUpdated { room: RoomInfo },

    /// An event from the room's game session
    Game { event: ServerEvent },

    /// Full board snapshot, sent on join
    Board { board: serde_json::Value },

    /// List of rooms that can be joined
    RoomList { rooms: Vec<RoomInfo> },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

/// Room information for clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: Uuid,
    pub name: String,
    pub players: Vec<PlayerInfo>,
    pub max_players: u8,
    pub host_id: Uuid,
    pub status: RoomStatus,
}

/// Player information in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: Uuid,
    pub name: String,
    pub game_id: PlayerId,
    pub is_bot: bool,
    pub connected: bool,
}

/// Room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    /// Pulse is waiting for every player's first settlement
    Waiting,
    /// Pulse countdown is running
    Running,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_request_envelope() {
        let json = r#"{"type":"Game","payload":{"request":{"type":"GetInventory"}}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Game {
                request: ClientRequest::GetInventory
            }
        ));
    }

    #[test]
    fn test_game_event_envelope() {
        let msg = ServerMessage::Game {
            event: ServerEvent::TimerEvent {
                seconds_remaining: 12,
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "Game");
        assert_eq!(json["payload"]["event"]["type"], "TimerEvent");
        assert_eq!(json["payload"]["event"]["payload"]["seconds_remaining"], 12);
    }
}
