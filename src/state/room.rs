use super::AppState;
use crate::identity::sanitize_identity;
use crate::types::*;
use rand::Rng;
use tokio::sync::broadcast;

/// Safe character set for room codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;

/// Generate a random short room code (5 characters)
fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// What happened when a player left
#[derive(Debug)]
pub enum LeaveOutcome {
    /// An ordinary player left; the room lives on
    Left(Room),
    /// The host left: the room is flagged deleted and must be disposed after
    /// the deletion has been broadcast
    HostLeft,
}

impl AppState {
    /// Create a room with the given identity as first player and host.
    pub async fn create_room(&self, identity: &str) -> Room {
        let mut rooms = self.rooms.write().await;

        // Collision check against live rooms (extremely rare with ~28M codes)
        let code = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
        };

        let mut room = Room::new(code.clone());
        room.host = Some(identity.to_string());
        room.players
            .insert(sanitize_identity(identity), Player::new(identity));

        rooms.insert(code.clone(), room.clone());
        drop(rooms);

        let (tx, _rx) = broadcast::channel(100);
        self.channels.write().await.insert(code, tx);

        room
    }

    /// Join (or re-join) a room. The player record is written fresh with
    /// `connected`/`alive`; if no host is recorded yet the joiner becomes
    /// host. Election happens under the write lock, so first-join-wins is
    /// exact rather than a read-then-write race.
    pub async fn join_room(&self, code: &str, identity: &str) -> Result<Room, String> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(code).ok_or("Room not found.")?;

        room.players
            .insert(sanitize_identity(identity), Player::new(identity));
        if room.host.is_none() {
            room.host = Some(identity.to_string());
        }
        room.touch();

        Ok(room.clone())
    }

    /// Remove a player. When the host leaves the room is torn down: flag it
    /// deleted so other clients exit exactly once, and let the caller
    /// broadcast before calling `dispose_room`.
    pub async fn leave_room(&self, code: &str, identity: &str) -> Result<LeaveOutcome, String> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(code).ok_or("Room not found.")?;

        room.players.remove(&sanitize_identity(identity));

        if room.is_host(identity) {
            room.room_deleted = true;
            room.touch();
            return Ok(LeaveOutcome::HostLeft);
        }

        room.touch();
        Ok(LeaveOutcome::Left(room.clone()))
    }

    /// Flip a player's connectivity flag (e.g. on socket drop). Game-relevant
    /// state is untouched.
    pub async fn set_player_status(&self, code: &str, identity: &str, status: PlayerStatus) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(code) {
            if let Some(player) = room.players.get_mut(&sanitize_identity(identity)) {
                player.status = status;
                room.touch();
            }
        }
    }

    /// Drop the room subtree: the document, its messages, and its channel.
    pub async fn dispose_room(&self, code: &str) {
        self.rooms.write().await.remove(code);
        self.messages
            .write()
            .await
            .retain(|_, m| m.room_code != code);
        self.channels.write().await.remove(code);
        tracing::info!("Disposed room {}", code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_codes_use_safe_alphabet() {
        for _ in 0..50 {
            let code = generate_room_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_CHARS.contains(&b)));
        }
    }

    #[tokio::test]
    async fn test_rejoin_overwrites_player_record() {
        let state = AppState::new();
        let room = state.create_room("alice@example.com").await;
        state
            .set_player_status(&room.code, "alice@example.com", PlayerStatus::Disconnected)
            .await;

        let room = state.join_room(&room.code, "alice@example.com").await.unwrap();
        let alice = &room.players[&sanitize_identity("alice@example.com")];
        assert_eq!(alice.status, PlayerStatus::Connected);
        assert_eq!(room.players.len(), 1);
    }

    #[tokio::test]
    async fn test_host_election_on_join_when_unset() {
        let state = AppState::new();
        let room = state.create_room("alice@example.com").await;

        // Simulate a room that lost its host record
        state.rooms.write().await.get_mut(&room.code).unwrap().host = None;

        let room = state.join_room(&room.code, "bob@example.com").await.unwrap();
        assert_eq!(room.host.as_deref(), Some("bob@example.com"));
    }
}
