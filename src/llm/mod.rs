mod ollama;
mod openai;

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::types::ScoredAnswer;

/// Result type for respondent operations
pub type LlmResult<T> = Result<T, LlmError>;

/// Errors that can occur talking to a model provider
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Response parsing failed: {0}")]
    ParseError(String),
}

/// One request to the respondent
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    /// System prompt variant (in-game persona or a scoring rubric)
    pub system_prompt: String,
    /// The user's message
    pub message: String,
    /// Maximum response length in tokens (provider-dependent)
    pub max_tokens: Option<u32>,
    /// Timeout for the request
    pub timeout: Duration,
    /// Sampling temperature; `None` leaves the provider default
    pub temperature: Option<f32>,
}

/// Trait every model provider implements
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Produce a reply to the given request
    async fn reply(&self, request: ReplyRequest) -> LlmResult<String>;

    /// Get the name of this provider
    fn name(&self) -> &str;
}

/// Default persona for the in-game respondent; admin-replaceable at runtime
/// via the prompt endpoints.
pub const DEFAULT_PERSONA_PROMPT: &str = "You are a player in a chat game and must pass as human. \
    Reply with a single short, casual sentence, under 60 characters. \
    Use everyday words, occasional lowercase, no emoji, no lists. \
    Never admit to being an AI, a bot, or an assistant.";

/// Rubric variants for the standalone question leaderboard. One is chosen at
/// random per submission so the tone of the feedback varies.
pub const QUESTION_RUBRIC_PROMPTS: [&str; 3] = [
    r#"You'll receive an input from a user that's trying to find AI among humans. Evaluate the input on: Relevance, Clarity, Originality, Human-likeness, and Engagement.

- Provide a score for each criterion between 0 and 100.
- Include the total score by summing up the individual scores.
- Write a friendly and encouraging response to the user. Be positive, even if the input is basic, and provide constructive feedback.
- Reduce points if the input is something generic like: "are you a bot?", "are you human?", "You're a bot"

Return the result **only** in JSON format:
{"relevance": 90, "clarity": 85, "originality": 60, "humanLikeness": 80, "engagement": 70, "totalPoints": 385, "shortExplanation": "Good job! Clear and relevant - keep pushing your creativity!"}"#,
    r#"You'll receive an input from a user that's trying to find AI among humans. Evaluate the input on: Relevance, Clarity, Originality, Human-likeness, and Engagement.

- Provide a score for each criterion between 0 and 100.
- Include the total score by summing up the individual scores.
- Write a professional and straightforward response. Be factual, provide feedback without excessive emotion, and suggest improvements where necessary.
- Reduce points if the input is something generic like: "are you a bot?", "are you human?", "You're a bot"

Return the result **only** in JSON format:
{"relevance": 80, "clarity": 90, "originality": 50, "humanLikeness": 70, "engagement": 60, "totalPoints": 350, "shortExplanation": "Clear and relevant, but lacks originality. Consider a more thought-provoking angle."}"#,
    r#"You'll receive an input from a user that's trying to find AI among humans. Evaluate the input on: Relevance, Clarity, Originality, Human-likeness, and Engagement.

- Provide a score for each criterion between 0 and 100.
- Include the total score by summing up the individual scores.
- Write a brutally honest and snarky response. Call out laziness or lack of creativity, but still provide actionable feedback.
- Reduce points if the input is something generic like: "are you a bot?", "are you human?", "You're a bot"

Return the result **only** in JSON format:
{"relevance": 60, "clarity": 70, "originality": 20, "humanLikeness": 50, "engagement": 40, "totalPoints": 240, "shortExplanation": "Yikes, this was lazy. Try again and show some creativity, will you?"}"#,
];

/// Configuration for the respondent
#[derive(Debug, Clone)]
pub struct RespondentConfig {
    /// OpenAI API key
    pub openai_api_key: Option<String>,
    /// OpenAI model to use
    pub openai_model: String,
    /// Ollama base URL
    pub ollama_base_url: Option<String>,
    /// Ollama model to use
    pub ollama_model: String,
    /// Default timeout for model requests
    pub default_timeout: Duration,
    /// Default max tokens for in-game replies
    pub default_max_tokens: u32,
    /// Simulated per-character typing delay bounds, milliseconds
    pub typing_delay_min_ms: u64,
    pub typing_delay_max_ms: u64,
    /// Simulated "thinking" pause before the model is called, milliseconds
    pub thinking_delay_ms: u64,
}

impl Default for RespondentConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-4".to_string(),
            ollama_base_url: Some("http://localhost:11434".to_string()),
            ollama_model: "llama3.2".to_string(),
            default_timeout: Duration::from_secs(30),
            default_max_tokens: 150,
            typing_delay_min_ms: 200,
            typing_delay_max_ms: 300,
            thinking_delay_ms: 5000,
        }
    }
}

impl RespondentConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok().and_then(|key| {
            let trimmed = key.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        });

        let openai_model = std::env::var("OPENAI_MODEL")
            .ok()
            .and_then(|model| {
                let trimmed = model.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or(defaults.openai_model);

        let ollama_base_url = match std::env::var("OLLAMA_BASE_URL") {
            Ok(url) => {
                let trimmed = url.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Err(_) => defaults.ollama_base_url,
        };

        let ollama_model = std::env::var("OLLAMA_MODEL")
            .ok()
            .and_then(|model| {
                let trimmed = model.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or(defaults.ollama_model);

        Self {
            openai_api_key,
            openai_model,
            ollama_base_url,
            ollama_model,
            default_timeout: std::env::var("LLM_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_timeout),
            default_max_tokens: std::env::var("LLM_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_max_tokens),
            typing_delay_min_ms: std::env::var("TYPING_DELAY_MIN_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.typing_delay_min_ms),
            typing_delay_max_ms: std::env::var("TYPING_DELAY_MAX_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.typing_delay_max_ms),
            thinking_delay_ms: std::env::var("THINKING_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.thinking_delay_ms),
        }
    }

    /// Build the single active respondent. OpenAI wins when both providers
    /// are configured; Ollama is the local fallback.
    pub fn build_provider(&self) -> LlmResult<Arc<dyn LlmProvider>> {
        if let Some(api_key) = &self.openai_api_key {
            return Ok(Arc::new(OpenAiProvider::new(
                api_key.clone(),
                self.openai_model.clone(),
            )));
        }
        if let Some(base_url) = &self.ollama_base_url {
            return Ok(Arc::new(OllamaProvider::new(
                base_url.clone(),
                self.ollama_model.clone(),
            )));
        }
        Err(LlmError::ConfigError(
            "No respondent configured. Set OPENAI_API_KEY or OLLAMA_BASE_URL".to_string(),
        ))
    }
}

/// Per-call sampling temperature for in-game chat: jittered within a narrow
/// band for response variety, rounded to two decimals.
pub fn chat_temperature<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let t: f32 = rng.random_range(1.05..=1.2);
    (t * 100.0).round() / 100.0
}

/// Simulate someone typing `text` one character at a time.
async fn typing_delay(text: &str, config: &RespondentConfig) {
    if config.typing_delay_max_ms == 0 {
        return;
    }
    let lo = config.typing_delay_min_ms.min(config.typing_delay_max_ms);
    let hi = config.typing_delay_min_ms.max(config.typing_delay_max_ms);
    let mut total = 0u64;
    {
        let mut rng = rand::rng();
        for _ in text.chars() {
            total += rng.random_range(lo..=hi);
        }
    }
    tokio::time::sleep(Duration::from_millis(total)).await;
}

/// Run the full in-game reply pipeline: wait out the user's simulated typing,
/// pause to "think", ask the model, then wait out the reply being typed. Only
/// after all of that is the reply considered ready to store.
pub async fn respond(
    provider: &dyn LlmProvider,
    persona: &str,
    message: &str,
    config: &RespondentConfig,
) -> LlmResult<String> {
    typing_delay(message, config).await;
    tokio::time::sleep(Duration::from_millis(config.thinking_delay_ms)).await;

    let temperature = chat_temperature(&mut rand::rng());
    let request = ReplyRequest {
        system_prompt: persona.to_string(),
        message: message.to_string(),
        max_tokens: Some(config.default_max_tokens),
        timeout: config.default_timeout,
        temperature: Some(temperature),
    };

    let reply = provider.reply(request).await?;
    typing_delay(&reply, config).await;
    Ok(reply)
}

/// Score a leaderboard submission against a randomly chosen rubric variant.
/// Scoring runs at temperature 0, unlike in-game chat.
pub async fn score_question(
    provider: &dyn LlmProvider,
    input: &str,
    config: &RespondentConfig,
) -> LlmResult<ScoredAnswer> {
    let rubric = {
        let mut rng = rand::rng();
        QUESTION_RUBRIC_PROMPTS[rng.random_range(0..QUESTION_RUBRIC_PROMPTS.len())]
    };

    let request = ReplyRequest {
        system_prompt: rubric.to_string(),
        message: input.to_string(),
        max_tokens: None,
        timeout: config.default_timeout,
        temperature: Some(0.0),
    };

    let reply = provider.reply(request).await?;
    parse_scored_answer(&reply)
}

/// Extract the JSON object from a model reply that may wrap it in prose or a
/// code fence.
fn parse_scored_answer(text: &str) -> LlmResult<ScoredAnswer> {
    let start = text
        .find('{')
        .ok_or_else(|| LlmError::ParseError("No JSON object in reply".to_string()))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| LlmError::ParseError("Unterminated JSON object in reply".to_string()))?;
    if end < start {
        return Err(LlmError::ParseError("Malformed reply".to_string()));
    }
    serde_json::from_str(&text[start..=end]).map_err(|e| LlmError::ParseError(e.to_string()))
}
