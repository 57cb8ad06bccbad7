use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        identity: Identity,
    },
    JoinRoom {
        room_code: RoomCode,
        identity: Identity,
    },
    LeaveRoom {
        room_code: RoomCode,
        identity: Identity,
    },
    /// Host-only: choose a seeker and enter the first round
    StartGame {
        room_code: RoomCode,
        identity: Identity,
    },
    /// Any client observing `round` acknowledges it; idempotent
    AckRoundStart {
        room_code: RoomCode,
    },
    /// Reset a finished game back into a fresh round
    RestartGame {
        room_code: RoomCode,
    },
    SendMessage {
        room_code: RoomCode,
        from: Identity,
        to: Identity,
        text: String,
    },
    /// Seeker's accusation: the identity they believe is the AI
    Guess {
        room_code: RoomCode,
        identity: Identity,
        target: Identity,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        server_now: String,
    },
    RoomCreated {
        room: RoomView,
    },
    /// Full room view, broadcast on every mutation
    RoomState {
        room: RoomView,
    },
    MessageAppended {
        message: ChatMessage,
    },
    /// The round's transcripts were discarded
    MessagesCleared {
        room_code: RoomCode,
    },
    /// The host left; every other client exits exactly once
    RoomDeleted {
        room_code: RoomCode,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// Client-facing snapshot of a room. Internal bookkeeping fields
/// (message sequence, idle timer) stay server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomView {
    pub code: RoomCode,
    pub host: Option<Identity>,
    pub players: HashMap<String, Player>,
    pub seeker: Option<Identity>,
    pub game_state: GamePhase,
    pub winner: Option<Identity>,
    pub room_deleted: bool,
    pub roster: Vec<Player>,
    pub version: u64,
    pub config: GameConfig,
}

impl From<&Room> for RoomView {
    fn from(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            host: room.host.clone(),
            players: room.players.clone(),
            seeker: room.seeker.clone(),
            game_state: room.game_state,
            winner: room.winner.clone(),
            room_deleted: room.room_deleted,
            roster: room.roster.clone(),
            version: room.version,
            config: room.config,
        }
    }
}
