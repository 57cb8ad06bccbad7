//! HTTP endpoints: the respondent bridge, prompt administration, and the
//! standalone question leaderboard.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::llm;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::QuestionEntry;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "roomCode")]
    pub room_code: String,
}

#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub reply: String,
}

/// Run the respondent pipeline for a message addressed to the AI and write
/// the reply into the room's message log.
///
/// POST /sendMessageToGPT
///
/// Blocks for the full simulated typing/thinking latency before returning
/// `{reply}` — the reply is only "said" once it has been typed out.
pub async fn send_message_to_gpt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> Response {
    if req.message.is_empty() || req.user_id.is_empty() || req.room_code.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing required fields: message, userId, or roomCode" })),
        )
            .into_response();
    }

    let Some(room) = state.get_room(&req.room_code).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Room not found" })),
        )
            .into_response();
    };
    let round_seq = room.round_seq;

    let Some(respondent) = state.respondent.clone() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "No respondent configured" })),
        )
            .into_response();
    };

    let persona = state.persona_prompt.read().await.clone();
    let reply = match llm::respond(
        respondent.as_ref(),
        &persona,
        &req.message,
        &state.respondent_config,
    )
    .await
    {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!("Respondent call failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal Server Error", "details": e.to_string() })),
            )
                .into_response();
        }
    };

    match state
        .store_ai_reply(&req.room_code, &req.user_id, &reply, round_seq)
        .await
    {
        Ok(Some(message)) => {
            state
                .broadcast_to_room(&req.room_code, ServerMessage::MessageAppended { message })
                .await;
        }
        Ok(None) => {
            tracing::info!(
                "Reply for {} finished after the round moved on; not stored",
                req.room_code
            );
        }
        Err(e) => {
            tracing::error!("Failed to store reply for {}: {}", req.room_code, e);
        }
    }

    Json(ReplyResponse { reply }).into_response()
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub prompt: String,
}

/// Read the respondent's current persona prompt.
///
/// GET /getPrompt
pub async fn get_prompt(State(state): State<Arc<AppState>>) -> Json<PromptResponse> {
    let prompt = state.persona_prompt.read().await.clone();
    Json(PromptResponse { prompt })
}

#[derive(Debug, Deserialize)]
pub struct UpdatePromptRequest {
    #[serde(rename = "newPrompt")]
    pub new_prompt: String,
}

/// Replace the respondent's persona prompt. Admin only (gated by the auth
/// middleware in the router).
///
/// POST /updatePrompt
pub async fn update_prompt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdatePromptRequest>,
) -> Response {
    if req.new_prompt.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing newPrompt field" })),
        )
            .into_response();
    }

    *state.persona_prompt.write().await = req.new_prompt;
    tracing::info!("Persona prompt updated");
    Json(json!({ "message": "Prompt updated successfully" })).into_response()
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub input: String,
    pub email: String,
    pub fingerprint: String,
    pub username: String,
}

/// Score a leaderboard submission against a randomly chosen rubric variant
/// and record it.
///
/// POST /theQuestionGPT
pub async fn the_question_gpt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuestionRequest>,
) -> Response {
    if req.input.is_empty()
        || req.email.is_empty()
        || req.fingerprint.is_empty()
        || req.username.is_empty()
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Missing required fields: input, email, fingerprint, or username"
            })),
        )
            .into_response();
    }

    let Some(respondent) = state.respondent.clone() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "No respondent configured" })),
        )
            .into_response();
    };

    let scores =
        match llm::score_question(respondent.as_ref(), &req.input, &state.respondent_config).await
        {
            Ok(scores) => scores,
            Err(e) => {
                tracing::error!("Question scoring failed: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error", "details": e.to_string() })),
                )
                    .into_response();
            }
        };

    // The public leaderboard copy keeps everything except the email
    let entry = QuestionEntry {
        id: ulid::Ulid::new().to_string(),
        username: req.username,
        fingerprint: req.fingerprint,
        input: req.input,
        total_points: scores.total_points,
        scores: scores.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    state.question_entries.write().await.push(entry);

    Json(scores).into_response()
}

/// Best scored submissions, highest first.
///
/// GET /api/leaderboard
pub async fn get_leaderboard(State(state): State<Arc<AppState>>) -> Json<Vec<QuestionEntry>> {
    let mut entries = state.question_entries.read().await.clone();
    entries.sort_by(|a, b| b.total_points.cmp(&a.total_points));
    entries.truncate(50);
    Json(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_message_requires_fields() {
        let state = Arc::new(AppState::new());
        let response = send_message_to_gpt(
            State(state),
            Json(SendMessageRequest {
                message: String::new(),
                user_id: "alice@example.com".to_string(),
                room_code: "ABCDE".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_send_message_unknown_room_is_404() {
        let state = Arc::new(AppState::new());
        let response = send_message_to_gpt(
            State(state),
            Json(SendMessageRequest {
                message: "hi".to_string(),
                user_id: "alice@example.com".to_string(),
                room_code: "ZZZZZ".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_send_message_without_respondent_is_503() {
        let state = Arc::new(AppState::new());
        let room = state.create_room("alice@example.com").await;
        let response = send_message_to_gpt(
            State(state),
            Json(SendMessageRequest {
                message: "hi".to_string(),
                user_id: "alice@example.com".to_string(),
                room_code: room.code,
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_prompt_roundtrip() {
        let state = Arc::new(AppState::new());

        let response = update_prompt(
            State(state.clone()),
            Json(UpdatePromptRequest {
                new_prompt: "be mysterious".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let Json(PromptResponse { prompt }) = get_prompt(State(state)).await;
        assert_eq!(prompt, "be mysterious");
    }

    #[tokio::test]
    async fn test_update_prompt_rejects_empty() {
        let state = Arc::new(AppState::new());
        let response = update_prompt(
            State(state),
            Json(UpdatePromptRequest {
                new_prompt: "   ".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_question_requires_fields() {
        let state = Arc::new(AppState::new());
        let response = the_question_gpt(
            State(state),
            Json(QuestionRequest {
                input: "is water wet?".to_string(),
                email: String::new(),
                fingerprint: "fp".to_string(),
                username: "u".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
