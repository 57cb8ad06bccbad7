use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aiseek::{api, auth, broadcast, llm, state::AppState, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aiseek=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting AIseek...");

    // Initialize admin authentication config
    let admin_config = Arc::new(auth::AdminConfig::from_env());

    // Initialize the AI respondent
    let respondent_config = llm::RespondentConfig::from_env();
    let respondent = match respondent_config.build_provider() {
        Ok(provider) => {
            tracing::info!("Respondent initialized: {}", provider.name());
            Some(provider)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize respondent: {}. AI replies will not be available.",
                e
            );
            None
        }
    };

    let state = Arc::new(AppState::new_with_respondent(respondent, respondent_config));

    // Dispose rooms that everyone has drifted away from
    broadcast::spawn_room_sweeper(state.clone());

    // Prompt administration behind HTTP Basic Auth
    let admin_routes = Router::new()
        .route("/updatePrompt", post(api::update_prompt))
        .layer(middleware::from_fn_with_state(
            admin_config.clone(),
            auth::admin_auth_middleware,
        ));

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/sendMessageToGPT", post(api::send_message_to_gpt))
        .route("/getPrompt", get(api::get_prompt))
        .route("/theQuestionGPT", post(api::the_question_gpt))
        .route("/api/leaderboard", get(api::get_leaderboard))
        .merge(admin_routes)
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    tracing::info!("Listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
