use super::AppState;
use crate::identity::is_ai_identity;
use crate::roster;
use crate::types::*;

/// How a seeker's accusation resolved
#[derive(Debug)]
pub enum GuessOutcome {
    /// Empty target: logged no-op, nothing mutated
    Ignored,
    /// The accused really was the AI: seeker wins, game over
    SeekerWon(Room),
    /// Wrong accusation, enough humans left: next round with a new seeker
    NewRound(Room),
    /// Wrong accusation with one live human left: they win, game over
    LastHumanWon(Room),
    /// Wrong accusation and nobody left to play. Unreached under normal
    /// preconditions; the game ends with no winner. The AI never counts
    /// toward the win-by-elimination check.
    NobodyLeft(Room),
}

impl AppState {
    /// Resolve the seeker's accusation. The round's transcripts are always
    /// discarded first; then either the seeker wins (accused the AI) or the
    /// seeker is eliminated and the room continues or ends.
    pub async fn resolve_guess(
        &self,
        code: &str,
        guesser: &str,
        target: &str,
    ) -> Result<GuessOutcome, String> {
        {
            let rooms = self.rooms.read().await;
            let room = rooms.get(code).ok_or("Room not found.")?;
            if room.seeker.as_deref() != Some(guesser) {
                return Err("Only the seeker can make guesses.".to_string());
            }
        }

        if target.is_empty() {
            tracing::info!("Empty guess target in {}, ignoring", code);
            return Ok(GuessOutcome::Ignored);
        }

        self.clear_room_messages(code).await;

        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(code).ok_or("Room not found.")?;

        if is_ai_identity(target) {
            tracing::info!("Seeker {} found the AI in {}", guesser, code);
            room.winner = Some(guesser.to_string());
            room.game_state = GamePhase::Over;
            room.touch();
            return Ok(GuessOutcome::SeekerWon(room.clone()));
        }

        // Wrong accusation: the seeker is the one who dies
        for player in room.players.values_mut() {
            if player.email == guesser {
                player.state = PlayerState::Dead;
            }
        }

        let remaining: Vec<Player> = room
            .live_humans_except(guesser)
            .into_iter()
            .cloned()
            .collect();

        match remaining.len() {
            0 => {
                tracing::warn!("No live players left in {} after elimination", code);
                room.winner = None;
                room.game_state = GamePhase::Over;
                room.touch();
                Ok(GuessOutcome::NobodyLeft(room.clone()))
            }
            1 => {
                room.winner = Some(remaining[0].email.clone());
                room.game_state = GamePhase::Over;
                room.touch();
                Ok(GuessOutcome::LastHumanWon(room.clone()))
            }
            _ => {
                let mut rng = rand::rng();
                let pool: Vec<&Player> = remaining.iter().collect();
                room.seeker = roster::pick_seeker(&pool, &mut rng);
                room.roster = roster::build_round_roster(remaining, &mut rng);
                room.round_seq += 1;
                room.game_state = GamePhase::Round;
                room.touch();
                Ok(GuessOutcome::NewRound(room.clone()))
            }
        }
    }
}
