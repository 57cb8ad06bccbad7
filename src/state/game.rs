use super::AppState;
use crate::roster;
use crate::types::*;

impl AppState {
    /// Start the game: pick a seeker uniformly at random, revive everyone,
    /// build the round roster and enter `round`. Host-only.
    pub async fn start_game(&self, code: &str, requester: &str) -> Result<Room, String> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(code).ok_or("Room not found.")?;

        if !room.is_host(requester) {
            return Err("Only the host can start the game.".to_string());
        }
        if room.players.is_empty() {
            tracing::error!("Start requested for empty room {}", code);
            return Err("No players in the lobby to start the game.".to_string());
        }

        Self::enter_round(room);
        let room = room.clone();
        drop(rooms);

        self.clear_room_messages(code).await;
        Ok(room)
    }

    /// Acknowledge a freshly started round by advancing `round` to `start`.
    /// Every client observing `round` sends this; the write is constant, so
    /// concurrent acknowledgements are harmless.
    pub async fn ack_round_start(&self, code: &str) -> Result<Room, String> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(code).ok_or("Room not found.")?;

        match room.game_state {
            GamePhase::Round => {
                room.game_state = GamePhase::Start;
                room.touch();
            }
            GamePhase::Start => {} // already acknowledged by another client
            _ => return Err("No round in progress.".to_string()),
        }

        Ok(room.clone())
    }

    /// Reset a finished game: everyone back alive, winner cleared, fresh
    /// seeker and roster, back into `round`.
    pub async fn restart_game(&self, code: &str) -> Result<Room, String> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(code).ok_or("Room not found.")?;

        if room.players.is_empty() {
            tracing::error!("Restart requested for empty room {}", code);
            return Err("No players in the lobby to start the game.".to_string());
        }

        Self::enter_round(room);
        let room = room.clone();
        drop(rooms);

        self.clear_room_messages(code).await;
        Ok(room)
    }

    /// Shared round entry: revive all players, reseat the seeker, rebuild the
    /// roster, bump the round sequence.
    fn enter_round(room: &mut Room) {
        let mut rng = rand::rng();

        for player in room.players.values_mut() {
            player.state = PlayerState::Alive;
        }
        room.winner = None;

        let pool: Vec<&Player> = room.players.values().collect();
        room.seeker = roster::pick_seeker(&pool, &mut rng);

        let live: Vec<Player> = room.players.values().cloned().collect();
        room.roster = roster::build_round_roster(live, &mut rng);

        room.round_seq += 1;
        room.game_state = GamePhase::Round;
        room.touch();
    }
}
