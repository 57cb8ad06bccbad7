mod game;
mod guess;
mod message;
mod room;

pub use guess::GuessOutcome;
pub use message::spawn_ai_reply;
pub use room::LeaveOutcome;

use crate::llm::{LlmProvider, RespondentConfig};
use crate::protocol::{RoomView, ServerMessage};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Shared application state. Rooms are keyed by room code and constructed on
/// demand; there is no process-wide singleton game. Each room owns a
/// broadcast channel that fans mutations out to its connected clients.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<RoomCode, Room>>>,
    pub messages: Arc<RwLock<HashMap<MessageId, ChatMessage>>>,
    pub channels: Arc<RwLock<HashMap<RoomCode, broadcast::Sender<ServerMessage>>>>,
    /// System prompt for the in-game respondent, admin-editable at runtime
    pub persona_prompt: Arc<RwLock<String>>,
    /// Standalone question-leaderboard entries
    pub question_entries: Arc<RwLock<Vec<QuestionEntry>>>,
    pub respondent: Option<Arc<dyn LlmProvider>>,
    pub respondent_config: RespondentConfig,
}

impl AppState {
    pub fn new() -> Self {
        Self::new_with_respondent(None, RespondentConfig::default())
    }

    pub fn new_with_respondent(
        respondent: Option<Arc<dyn LlmProvider>>,
        respondent_config: RespondentConfig,
    ) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            messages: Arc::new(RwLock::new(HashMap::new())),
            channels: Arc::new(RwLock::new(HashMap::new())),
            persona_prompt: Arc::new(RwLock::new(
                crate::llm::DEFAULT_PERSONA_PROMPT.to_string(),
            )),
            question_entries: Arc::new(RwLock::new(Vec::new())),
            respondent,
            respondent_config,
        }
    }

    pub async fn get_room(&self, code: &str) -> Option<Room> {
        self.rooms.read().await.get(code).cloned()
    }

    /// Subscribe to a room's update stream. `None` if the room is gone.
    pub async fn subscribe(&self, code: &str) -> Option<broadcast::Receiver<ServerMessage>> {
        self.channels.read().await.get(code).map(|tx| tx.subscribe())
    }

    /// Send a message to every client connected to the room. Send errors mean
    /// no receivers, which is fine.
    pub async fn broadcast_to_room(&self, code: &str, msg: ServerMessage) {
        if let Some(tx) = self.channels.read().await.get(code) {
            let _ = tx.send(msg);
        }
    }

    /// Push the room's current view to all of its clients.
    pub async fn broadcast_room_state(&self, code: &str) {
        if let Some(room) = self.get_room(code).await {
            self.broadcast_to_room(code, ServerMessage::RoomState {
                room: RoomView::from(&room),
            })
            .await;
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn room_with_players(state: &AppState, identities: &[&str]) -> RoomCode {
        let room = state.create_room(identities[0]).await;
        for identity in &identities[1..] {
            state.join_room(&room.code, identity).await.unwrap();
        }
        room.code
    }

    #[tokio::test]
    async fn test_create_room_elects_creator_as_host() {
        let state = AppState::new();
        let room = state.create_room("alice@example.com").await;

        assert_eq!(room.host.as_deref(), Some("alice@example.com"));
        assert_eq!(room.game_state, GamePhase::Lobby);
        assert_eq!(room.players.len(), 1);
        assert!(state.get_room(&room.code).await.is_some());
        assert!(state.subscribe(&room.code).await.is_some());
    }

    #[tokio::test]
    async fn test_join_room_keeps_existing_host() {
        let state = AppState::new();
        let code = room_with_players(&state, &["alice@example.com", "bob@example.com"]).await;

        let room = state.get_room(&code).await.unwrap();
        assert_eq!(room.host.as_deref(), Some("alice@example.com"));
        assert_eq!(room.players.len(), 2);
        let bob = &room.players[&crate::identity::sanitize_identity("bob@example.com")];
        assert_eq!(bob.status, PlayerStatus::Connected);
        assert_eq!(bob.state, PlayerState::Alive);
    }

    #[tokio::test]
    async fn test_join_unknown_room_fails() {
        let state = AppState::new();
        let result = state.join_room("ZZZZZ", "alice@example.com").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_start_game_requires_host() {
        let state = AppState::new();
        let code = room_with_players(&state, &["alice@example.com", "bob@example.com"]).await;

        let result = state.start_game(&code, "bob@example.com").await;
        assert!(result.unwrap_err().contains("host"));

        let room = state.start_game(&code, "alice@example.com").await.unwrap();
        assert_eq!(room.game_state, GamePhase::Round);
    }

    #[tokio::test]
    async fn test_start_game_picks_seeker_and_builds_roster() {
        let state = AppState::new();
        let code = room_with_players(
            &state,
            &["a@example.com", "b@example.com", "c@example.com"],
        )
        .await;

        let room = state.start_game(&code, "a@example.com").await.unwrap();

        let seeker = room.seeker.clone().expect("seeker must be chosen");
        assert!(room.players.values().any(|p| p.email == seeker));
        assert!(room.players.values().all(|p| p.is_alive()));
        assert!(room.winner.is_none());
        // Roster: the three humans plus the AI, each exactly once
        assert_eq!(room.roster.len(), 4);
        assert_eq!(
            room.roster
                .iter()
                .filter(|p| p.email == AI_IDENTITY)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_ack_round_start_is_idempotent() {
        let state = AppState::new();
        let code = room_with_players(&state, &["a@example.com", "b@example.com"]).await;
        state.start_game(&code, "a@example.com").await.unwrap();

        let room = state.ack_round_start(&code).await.unwrap();
        assert_eq!(room.game_state, GamePhase::Start);
        let version = room.version;

        // A second ack from another client changes nothing
        let room = state.ack_round_start(&code).await.unwrap();
        assert_eq!(room.game_state, GamePhase::Start);
        assert_eq!(room.version, version);
    }

    #[tokio::test]
    async fn test_guessing_the_ai_wins_and_clears_messages() {
        let state = AppState::new();
        let code = room_with_players(&state, &["a@example.com", "b@example.com"]).await;
        state.start_game(&code, "a@example.com").await.unwrap();
        state.ack_round_start(&code).await.unwrap();

        let seeker = state.get_room(&code).await.unwrap().seeker.unwrap();
        state
            .append_message(&code, &seeker, AI_IDENTITY, "you a bot?")
            .await
            .unwrap();
        assert_eq!(state.room_messages(&code).await.len(), 1);

        let outcome = state.resolve_guess(&code, &seeker, "chatgpt").await.unwrap();
        let room = match outcome {
            GuessOutcome::SeekerWon(room) => room,
            other => panic!("expected SeekerWon, got {other:?}"),
        };
        assert_eq!(room.winner.as_deref(), Some(seeker.as_str()));
        assert_eq!(room.game_state, GamePhase::Over);
        assert!(state.room_messages(&code).await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_guess_eliminates_seeker_and_reseats() {
        let state = AppState::new();
        let code = room_with_players(
            &state,
            &["a@example.com", "b@example.com", "c@example.com"],
        )
        .await;
        state.start_game(&code, "a@example.com").await.unwrap();
        state.ack_round_start(&code).await.unwrap();

        let seeker = state.get_room(&code).await.unwrap().seeker.unwrap();
        let victim = ["a@example.com", "b@example.com", "c@example.com"]
            .into_iter()
            .find(|email| *email != seeker)
            .unwrap();

        let outcome = state.resolve_guess(&code, &seeker, victim).await.unwrap();
        let room = match outcome {
            GuessOutcome::NewRound(room) => room,
            other => panic!("expected NewRound, got {other:?}"),
        };

        // The seeker, not the accused, dies
        let dead = room
            .players
            .values()
            .find(|p| p.email == seeker)
            .unwrap();
        assert_eq!(dead.state, PlayerState::Dead);
        let accused = room.players.values().find(|p| p.email == victim).unwrap();
        assert_eq!(accused.state, PlayerState::Alive);

        // New seeker is a live human other than the eliminated one
        let new_seeker = room.seeker.clone().unwrap();
        assert_ne!(new_seeker, seeker);
        assert!(!crate::identity::is_ai_identity(&new_seeker));
        assert_eq!(room.game_state, GamePhase::Round);
        assert!(state.room_messages(&code).await.is_empty());

        // Eliminated players are off the new roster
        assert!(room.roster.iter().all(|p| p.email != seeker));
    }

    #[tokio::test]
    async fn test_wrong_guess_with_two_players_crowns_survivor() {
        let state = AppState::new();
        let code = room_with_players(&state, &["a@example.com", "b@example.com"]).await;
        state.start_game(&code, "a@example.com").await.unwrap();
        state.ack_round_start(&code).await.unwrap();

        let seeker = state.get_room(&code).await.unwrap().seeker.unwrap();
        let other = if seeker == "a@example.com" {
            "b@example.com"
        } else {
            "a@example.com"
        };

        let outcome = state.resolve_guess(&code, &seeker, other).await.unwrap();
        let room = match outcome {
            GuessOutcome::LastHumanWon(room) => room,
            other => panic!("expected LastHumanWon, got {other:?}"),
        };
        assert_eq!(room.winner.as_deref(), Some(other));
        assert_eq!(room.game_state, GamePhase::Over);
    }

    #[tokio::test]
    async fn test_guess_rejected_for_non_seeker() {
        let state = AppState::new();
        let code = room_with_players(
            &state,
            &["a@example.com", "b@example.com", "c@example.com"],
        )
        .await;
        state.start_game(&code, "a@example.com").await.unwrap();

        let seeker = state.get_room(&code).await.unwrap().seeker.unwrap();
        let bystander = ["a@example.com", "b@example.com", "c@example.com"]
            .into_iter()
            .find(|email| *email != seeker)
            .unwrap();

        let result = state.resolve_guess(&code, bystander, "chatgpt").await;
        assert!(result.unwrap_err().contains("seeker"));
        // Nothing changed
        let room = state.get_room(&code).await.unwrap();
        assert!(room.players.values().all(|p| p.is_alive()));
    }

    #[tokio::test]
    async fn test_empty_guess_is_a_no_op() {
        let state = AppState::new();
        let code = room_with_players(&state, &["a@example.com", "b@example.com"]).await;
        state.start_game(&code, "a@example.com").await.unwrap();

        let seeker = state.get_room(&code).await.unwrap().seeker.unwrap();
        let outcome = state.resolve_guess(&code, &seeker, "").await.unwrap();
        assert!(matches!(outcome, GuessOutcome::Ignored));
    }

    #[tokio::test]
    async fn test_restart_resets_players_and_reseats() {
        let state = AppState::new();
        let code = room_with_players(&state, &["a@example.com", "b@example.com"]).await;
        state.start_game(&code, "a@example.com").await.unwrap();
        state.ack_round_start(&code).await.unwrap();

        let seeker = state.get_room(&code).await.unwrap().seeker.unwrap();
        let other = if seeker == "a@example.com" {
            "b@example.com"
        } else {
            "a@example.com"
        };
        state.resolve_guess(&code, &seeker, other).await.unwrap();

        let room = state.restart_game(&code).await.unwrap();
        assert!(room.players.values().all(|p| p.is_alive()));
        assert!(room.winner.is_none());
        assert!(room.seeker.is_some());
        assert_eq!(room.game_state, GamePhase::Round);
    }

    #[tokio::test]
    async fn test_host_leaving_deletes_the_room() {
        let state = AppState::new();
        let code = room_with_players(&state, &["a@example.com", "b@example.com"]).await;

        let outcome = state.leave_room(&code, "a@example.com").await.unwrap();
        assert!(matches!(outcome, LeaveOutcome::HostLeft));

        state.dispose_room(&code).await;
        assert!(state.get_room(&code).await.is_none());
        assert!(state.subscribe(&code).await.is_none());
        assert!(state.room_messages(&code).await.is_empty());
    }

    #[tokio::test]
    async fn test_non_host_leaving_keeps_the_room() {
        let state = AppState::new();
        let code = room_with_players(&state, &["a@example.com", "b@example.com"]).await;

        let outcome = state.leave_room(&code, "b@example.com").await.unwrap();
        let room = match outcome {
            LeaveOutcome::Left(room) => room,
            other => panic!("expected Left, got {other:?}"),
        };
        assert_eq!(room.players.len(), 1);
        assert!(state.get_room(&code).await.is_some());
    }
}
