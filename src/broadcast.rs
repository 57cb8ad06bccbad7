use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;

/// How long an empty room may linger before it is disposed
const EMPTY_ROOM_TTL_SECS: i64 = 15 * 60;

/// Spawn a background task that disposes rooms nobody is playing in anymore.
/// Host departure tears a room down immediately; this sweeper covers rooms
/// whose players all drifted away without a clean leave.
pub fn spawn_room_sweeper(state: Arc<AppState>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;

            let now = chrono::Utc::now().timestamp();
            let expired: Vec<String> = {
                let rooms = state.rooms.read().await;
                rooms
                    .values()
                    .filter(|room| {
                        room.players.is_empty() && now - room.touched_at > EMPTY_ROOM_TTL_SECS
                    })
                    .map(|room| room.code.clone())
                    .collect()
            };

            for code in expired {
                tracing::info!("Sweeping idle room {}", code);
                state.dispose_room(&code).await;
            }
        }
    });
}
