use super::AppState;
use crate::identity::{chat_key, is_ai_identity, sanitize_identity};
use crate::llm;
use crate::protocol::ServerMessage;
use crate::turn::{self, TurnState};
use crate::types::*;
use std::sync::Arc;

impl AppState {
    /// Append a chat message on behalf of a human sender, enforcing the
    /// length cap and the derived turn/quota state at the boundary. The
    /// original client only advised on these; the server now rejects.
    pub async fn append_message(
        &self,
        code: &str,
        from: &str,
        to: &str,
        text: &str,
    ) -> Result<ChatMessage, String> {
        if text.trim().is_empty() {
            return Err("Empty message.".to_string());
        }

        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(code).ok_or("Room not found.")?;

        if room.game_state != GamePhase::Start {
            return Err("No active round.".to_string());
        }
        if text.chars().count() > room.config.max_message_chars {
            return Err("Message too long.".to_string());
        }

        let seeker = room.seeker.clone().ok_or("No active round.")?;
        if from != seeker && to != seeker {
            return Err("Conversations always involve the seeker.".to_string());
        }
        if !room.players.contains_key(&sanitize_identity(from)) {
            return Err("Sender is not in this room.".to_string());
        }
        if !is_ai_identity(to) && !room.players.contains_key(&sanitize_identity(to)) {
            return Err("Recipient is not in this room.".to_string());
        }

        let key = chat_key(from, to);
        let conversation = {
            let messages = self.messages.read().await;
            let mut conv: Vec<ChatMessage> = messages
                .values()
                .filter(|m| m.room_code == code && m.chat_key == key)
                .cloned()
                .collect();
            conv.sort_by_key(|m| m.seq);
            conv
        };

        match turn::derive_turn_state(&conversation, &seeker, room.config.seeker_quota) {
            TurnState::WaitingForAiReply => return Err("Waiting for a reply.".to_string()),
            TurnState::QuotaExhausted if from == seeker => {
                return Err("Message quota exhausted.".to_string())
            }
            state if !turn::may_send(&conversation, &seeker, from, room.config.seeker_quota) => {
                tracing::debug!("Send rejected in {} ({:?}): not {}'s turn", code, state, from);
                return Err("Not your turn.".to_string());
            }
            _ => {}
        }

        room.message_seq += 1;
        room.touch();
        let message = ChatMessage {
            id: ulid::Ulid::new().to_string(),
            room_code: code.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            message: text.to_string(),
            chat_key: key,
            seq: room.message_seq,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        drop(rooms);

        self.messages
            .write()
            .await
            .insert(message.id.clone(), message.clone());
        Ok(message)
    }

    /// Append the respondent's reply. Bypasses the turn check (the reply *is*
    /// the held turn being released) but is discarded if the round moved on
    /// while the reply was being generated.
    pub async fn store_ai_reply(
        &self,
        code: &str,
        to: &str,
        text: &str,
        round_seq: u64,
    ) -> Result<Option<ChatMessage>, String> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(code).ok_or("Room not found.")?;

        if room.round_seq != round_seq || room.game_state != GamePhase::Start {
            return Ok(None);
        }

        room.message_seq += 1;
        room.touch();
        let message = ChatMessage {
            id: ulid::Ulid::new().to_string(),
            room_code: code.to_string(),
            from: "ChatGPT".to_string(),
            to: to.to_string(),
            message: text.to_string(),
            chat_key: chat_key(AI_IDENTITY, to),
            seq: room.message_seq,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        drop(rooms);

        self.messages
            .write()
            .await
            .insert(message.id.clone(), message.clone());
        Ok(Some(message))
    }

    /// All of a room's messages in send order.
    pub async fn room_messages(&self, code: &str) -> Vec<ChatMessage> {
        let messages = self.messages.read().await;
        let mut list: Vec<ChatMessage> = messages
            .values()
            .filter(|m| m.room_code == code)
            .cloned()
            .collect();
        list.sort_by_key(|m| m.seq);
        list
    }

    /// One conversation's messages in send order.
    pub async fn conversation(&self, code: &str, a: &str, b: &str) -> Vec<ChatMessage> {
        let key = chat_key(a, b);
        let messages = self.messages.read().await;
        let mut list: Vec<ChatMessage> = messages
            .values()
            .filter(|m| m.room_code == code && m.chat_key == key)
            .cloned()
            .collect();
        list.sort_by_key(|m| m.seq);
        list
    }

    /// Discard the round's transcripts. No history carries across rounds.
    pub async fn clear_room_messages(&self, code: &str) {
        self.messages
            .write()
            .await
            .retain(|_, m| m.room_code != code);
    }
}

/// Run the respondent pipeline for a message addressed to the AI and write
/// the reply back into the room. No retry on failure: the error is logged and
/// the conversation's pending turn stays stuck until a new round supersedes
/// it. A reply finishing after the round moved on is dropped.
pub fn spawn_ai_reply(state: Arc<AppState>, code: String, user: String, text: String) {
    tokio::spawn(async move {
        let Some(respondent) = state.respondent.clone() else {
            tracing::warn!("No respondent configured; AI reply for {} not generated", code);
            return;
        };
        let Some(room) = state.get_room(&code).await else {
            return;
        };
        let round_seq = room.round_seq;
        let persona = state.persona_prompt.read().await.clone();

        let reply = match llm::respond(
            respondent.as_ref(),
            &persona,
            &text,
            &state.respondent_config,
        )
        .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("AI reply failed for {}: {}", code, e);
                return;
            }
        };

        match state.store_ai_reply(&code, &user, &reply, round_seq).await {
            Ok(Some(message)) => {
                state
                    .broadcast_to_room(&code, ServerMessage::MessageAppended { message })
                    .await;
            }
            Ok(None) => {
                tracing::info!("Dropped stale AI reply for {} (round moved on)", code);
            }
            Err(e) => tracing::error!("Failed to store AI reply for {}: {}", code, e),
        }
    });
}
