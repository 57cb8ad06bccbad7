use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque ID types for type safety
pub type RoomCode = String;
pub type Identity = String;
pub type MessageId = String;

/// Reserved identity of the scripted respondent. Never a real, joinable
/// participant; deliberately not email-shaped so `identity::is_ai_identity`
/// can tell it apart from players.
pub const AI_IDENTITY: &str = "chatgpt";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    /// Pre-game: players gathering, no seeker chosen yet
    Lobby,
    /// A seeker was just chosen; clients reset their local chat view and
    /// acknowledge by writing `start`
    Round,
    /// Round acknowledged, free chat in progress until a guess lands
    Start,
    /// Terminal per game; `winner` is set
    Over,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    Alive,
    Dead,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    /// Stable identity from the external identity provider, immutable once set
    pub email: Identity,
    /// Connectivity flag, not game-relevant
    pub status: PlayerStatus,
    /// Game-relevant: a player only becomes `dead` via elimination
    pub state: PlayerState,
}

impl Player {
    pub fn new(identity: impl Into<Identity>) -> Self {
        Self {
            email: identity.into(),
            status: PlayerStatus::Connected,
            state: PlayerState::Alive,
        }
    }

    /// The synthetic AI participant spliced into round rosters
    pub fn ai() -> Self {
        Self::new(AI_IDENTITY)
    }

    pub fn is_alive(&self) -> bool {
        self.state == PlayerState::Alive
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GameConfig {
    /// Hard cap on a single chat message, in characters
    pub max_message_chars: usize,
    /// Seeker-authored messages allowed per conversation per round
    pub seeker_quota: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_message_chars: 60,
            seeker_quota: 5,
        }
    }
}

/// Canonical room document. One instance per room code, owned by `AppState`;
/// every mutation goes through a state operation under the write lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub code: RoomCode,
    /// First player to join; only the host may start the game, and the room
    /// dies with them
    pub host: Option<Identity>,
    /// Participants keyed by sanitized identity (path-safe form)
    pub players: HashMap<String, Player>,
    /// The player hunting the AI this round; empty before the first round
    pub seeker: Option<Identity>,
    pub game_state: GamePhase,
    /// Set only when `game_state` is `over`
    pub winner: Option<Identity>,
    /// Latched when the host leaves so every other client exits exactly once
    pub room_deleted: bool,
    /// Visible participant order for the current round: shuffled live players
    /// with the AI spliced in at a random position
    pub roster: Vec<Player>,
    /// Bumped on every round entry; AI replies carry the value they were
    /// spawned under and are dropped if it has moved on
    pub round_seq: u64,
    /// Bumped on every mutation, lets clients discard stale views
    pub version: u64,
    pub config: GameConfig,
    pub created_at: String,
    /// Unix seconds of the last mutation, drives idle-room disposal
    pub touched_at: i64,
    /// Per-room message sequence; assigned at append so ordering never
    /// depends on wall-clock resolution
    pub message_seq: u64,
}

impl Room {
    pub fn new(code: RoomCode) -> Self {
        let now = chrono::Utc::now();
        Self {
            code,
            host: None,
            players: HashMap::new(),
            seeker: None,
            game_state: GamePhase::Lobby,
            winner: None,
            room_deleted: false,
            roster: Vec::new(),
            round_seq: 0,
            version: 1,
            config: GameConfig::default(),
            created_at: now.to_rfc3339(),
            touched_at: now.timestamp(),
            message_seq: 0,
        }
    }

    pub fn touch(&mut self) {
        self.version += 1;
        self.touched_at = chrono::Utc::now().timestamp();
    }

    pub fn is_host(&self, identity: &str) -> bool {
        self.host.as_deref() == Some(identity)
    }

    /// Live human players, excluding the given identity. The AI is never a
    /// member of `players`, so it can't show up here.
    pub fn live_humans_except(&self, excluded: &str) -> Vec<&Player> {
        self.players
            .values()
            .filter(|p| p.is_alive() && !p.email.eq_ignore_ascii_case(excluded))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub room_code: RoomCode,
    pub from: Identity,
    pub to: Identity,
    pub message: String,
    /// Symmetric conversation address: both directions of a two-party thread
    /// share one chat key
    pub chat_key: String,
    /// Server-assigned, monotonic within the room; the only ordering source
    pub seq: u64,
    pub timestamp: String,
}

/// One scored submission on the standalone question leaderboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionEntry {
    pub id: String,
    pub username: String,
    pub fingerprint: String,
    pub input: String,
    pub scores: ScoredAnswer,
    pub total_points: u32,
    pub timestamp: String,
}

/// Rubric scores returned by the question evaluator. Field names are part of
/// the wire contract with the front end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredAnswer {
    pub relevance: u32,
    pub clarity: u32,
    pub originality: u32,
    pub human_likeness: u32,
    pub engagement: u32,
    pub total_points: u32,
    pub short_explanation: String,
}
