pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::{Identity, PlayerStatus, RoomCode};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub identity: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: identity={:?}", params.identity);

    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// What a just-dispatched message means for this connection's room
/// subscription
enum SubscriptionIntent {
    Create(Identity),
    Join(RoomCode, Identity),
    Leave,
    None,
}

impl SubscriptionIntent {
    fn of(msg: &ClientMessage) -> Self {
        match msg {
            ClientMessage::CreateRoom { identity } => Self::Create(identity.clone()),
            ClientMessage::JoinRoom {
                room_code,
                identity,
            } => Self::Join(room_code.clone(), identity.clone()),
            ClientMessage::LeaveRoom { .. } => Self::Leave,
            _ => Self::None,
        }
    }
}

/// Handle an individual WebSocket connection. Each connection follows at most
/// one room at a time; its subscription moves with create/join/leave.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let welcome = ServerMessage::Welcome {
        protocol: "1.0".to_string(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if let Ok(msg) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    let mut room_rx: Option<broadcast::Receiver<ServerMessage>> = None;
    let mut joined: Option<(RoomCode, Identity)> = None;

    loop {
        tokio::select! {
            // Updates for the room this connection follows
            room_msg = async {
                match &mut room_rx {
                    Some(rx) => rx.recv().await.ok(),
                    None => {
                        // Not in a room: wait forever
                        std::future::pending::<Option<ServerMessage>>().await
                    }
                }
            } => {
                if let Some(msg) = room_msg {
                    if let Ok(json) = serde_json::to_string(&msg) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }

            // Client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                let intent = SubscriptionIntent::of(&client_msg);
                                let response = handlers::handle_message(client_msg, &state).await;
                                let failed =
                                    matches!(response, Some(ServerMessage::Error { .. }));

                                if !failed {
                                    match intent {
                                        SubscriptionIntent::Create(identity) => {
                                            if let Some(ServerMessage::RoomCreated { room }) =
                                                &response
                                            {
                                                room_rx = state.subscribe(&room.code).await;
                                                joined =
                                                    Some((room.code.clone(), identity));
                                            }
                                        }
                                        SubscriptionIntent::Join(code, identity) => {
                                            room_rx = state.subscribe(&code).await;
                                            joined = Some((code, identity));
                                        }
                                        SubscriptionIntent::Leave => {
                                            room_rx = None;
                                            joined = None;
                                        }
                                        SubscriptionIntent::None => {}
                                    }
                                }

                                if let Some(response) = response {
                                    if let Ok(json) = serde_json::to_string(&response) {
                                        if sender.send(Message::Text(json.into())).await.is_err() {
                                            tracing::error!("Failed to send response");
                                            break;
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                let error = ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                };
                                if let Ok(json) = serde_json::to_string(&error) {
                                    let _ = sender.send(Message::Text(json.into())).await;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // Dropping without leaving only flips the connectivity flag; the player
    // stays in the game
    if let Some((code, identity)) = joined {
        state
            .set_player_status(&code, &identity, PlayerStatus::Disconnected)
            .await;
        state.broadcast_room_state(&code).await;
        tracing::info!("Connection for {} in {} closed", identity, code);
    }
}
