use anyhow::{Context, Result};
use second_brain_assistant::{provider_from_config, ChatComposer, NoteAnalyzer};
use second_brain_server::{router, AppConfig, AppState};
use second_brain_store::MemoryStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Second Brain Service v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_env()?;

    let store = MemoryStore::open(&config.db_path)
        .with_context(|| format!("Failed to open memory store at {}", config.db_path.display()))?;

    let provider = provider_from_config(&config.llm)?;
    info!(
        "Summarization service: {} ({} at {})",
        provider.name(),
        config.llm.model,
        config.llm.base_url
    );

    let state = AppState {
        store: Arc::new(Mutex::new(store)),
        analyzer: Arc::new(NoteAnalyzer::new(provider.clone())),
        chat: Arc::new(ChatComposer::new(provider)),
        chat_history_limit: config.chat_history_limit,
    };

    // CORS layer for browser front-ends
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    info!("Starting HTTP server on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
