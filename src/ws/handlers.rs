//! WebSocket message dispatch
//!
//! The main entry point for handling client messages. There is no privileged
//! socket role in this game: host-only operations are authorized against the
//! room document inside the state layer.

use crate::identity::is_ai_identity;
use crate::protocol::{ClientMessage, RoomView, ServerMessage};
use crate::state::{spawn_ai_reply, AppState, GuessOutcome, LeaveOutcome};
use std::sync::Arc;

/// Handle a client message and return an optional direct response. Room-wide
/// effects go out over the room's broadcast channel.
pub async fn handle_message(msg: ClientMessage, state: &Arc<AppState>) -> Option<ServerMessage> {
    match msg {
        ClientMessage::CreateRoom { identity } => {
            let room = state.create_room(&identity).await;
            tracing::info!("Room {} created by {}", room.code, identity);
            Some(ServerMessage::RoomCreated {
                room: RoomView::from(&room),
            })
        }

        ClientMessage::JoinRoom {
            room_code,
            identity,
        } => match state.join_room(&room_code, &identity).await {
            Ok(room) => {
                tracing::info!("{} joined {}", identity, room_code);
                state.broadcast_room_state(&room_code).await;
                Some(ServerMessage::RoomState {
                    room: RoomView::from(&room),
                })
            }
            Err(e) => Some(ServerMessage::Error {
                code: "JOIN_FAILED".to_string(),
                msg: e,
            }),
        },

        ClientMessage::LeaveRoom {
            room_code,
            identity,
        } => match state.leave_room(&room_code, &identity).await {
            Ok(LeaveOutcome::HostLeft) => {
                tracing::info!("Host {} left, deleting room {}", identity, room_code);
                state
                    .broadcast_to_room(&room_code, ServerMessage::RoomDeleted {
                        room_code: room_code.clone(),
                    })
                    .await;
                state.dispose_room(&room_code).await;
                None
            }
            Ok(LeaveOutcome::Left(_)) => {
                tracing::info!("{} left {}", identity, room_code);
                state.broadcast_room_state(&room_code).await;
                None
            }
            Err(e) => Some(ServerMessage::Error {
                code: "LEAVE_FAILED".to_string(),
                msg: e,
            }),
        },

        ClientMessage::StartGame {
            room_code,
            identity,
        } => match state.start_game(&room_code, &identity).await {
            Ok(room) => {
                tracing::info!(
                    "Game started in {}: seeker={:?}",
                    room_code,
                    room.seeker
                );
                state.broadcast_room_state(&room_code).await;
                None
            }
            Err(e) => Some(ServerMessage::Error {
                code: "START_FAILED".to_string(),
                msg: e,
            }),
        },

        ClientMessage::AckRoundStart { room_code } => {
            match state.ack_round_start(&room_code).await {
                Ok(_) => {
                    state.broadcast_room_state(&room_code).await;
                    None
                }
                Err(e) => Some(ServerMessage::Error {
                    code: "ACK_FAILED".to_string(),
                    msg: e,
                }),
            }
        }

        ClientMessage::RestartGame { room_code } => match state.restart_game(&room_code).await {
            Ok(_) => {
                tracing::info!("Game restarted in {}", room_code);
                state
                    .broadcast_to_room(&room_code, ServerMessage::MessagesCleared {
                        room_code: room_code.clone(),
                    })
                    .await;
                state.broadcast_room_state(&room_code).await;
                None
            }
            Err(e) => Some(ServerMessage::Error {
                code: "RESTART_FAILED".to_string(),
                msg: e,
            }),
        },

        ClientMessage::SendMessage {
            room_code,
            from,
            to,
            text,
        } => match state.append_message(&room_code, &from, &to, &text).await {
            Ok(message) => {
                state
                    .broadcast_to_room(&room_code, ServerMessage::MessageAppended { message })
                    .await;
                // A message into the AI's conversation holds the turn until
                // the respondent pipeline writes the reply back
                if is_ai_identity(&to) {
                    spawn_ai_reply(state.clone(), room_code, from, text);
                }
                None
            }
            Err(e) => Some(ServerMessage::Error {
                code: "SEND_FAILED".to_string(),
                msg: e,
            }),
        },

        ClientMessage::Guess {
            room_code,
            identity,
            target,
        } => match state.resolve_guess(&room_code, &identity, &target).await {
            Ok(GuessOutcome::Ignored) => None,
            Ok(_) => {
                tracing::info!("Guess resolved in {}", room_code);
                state
                    .broadcast_to_room(&room_code, ServerMessage::MessagesCleared {
                        room_code: room_code.clone(),
                    })
                    .await;
                state.broadcast_room_state(&room_code).await;
                None
            }
            Err(e) => Some(ServerMessage::Error {
                code: "GUESS_FAILED".to_string(),
                msg: e,
            }),
        },
    }
}
