//! gemini-chat server
//!
//! Serves the chat API for a single conversation backed by Gemini.

use gemini_chat::api::{create_router, AppState};
use gemini_chat::config::ChatConfig;
use gemini_chat::llm::build_service;
use gemini_chat::TurnOrchestrator;
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    // Configuration
    let config = ChatConfig::from_env()?;
    tracing::info!(
        model = %config.llm.model,
        gateway = ?config.llm.gateway,
        timeout_secs = config.request_timeout.as_secs(),
        "Configuration loaded"
    );

    let service = build_service(&config.llm)?;
    let orchestrator = TurnOrchestrator::new(service, config.generation, config.request_timeout);
    let state = AppState::new(orchestrator);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("gemini-chat listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
