//! pico server - JSON API for the search strategy steps

mod handlers;
mod types;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use pico::LlmConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use handlers::{
    boolean_query, concepts_from_pico, health, pico_from_title, refine_pico, search_terms, AppState,
};

/// pico server - build search strategies over HTTP
#[derive(Parser, Debug)]
#[command(name = "pico-server")]
#[command(about = "Run the search strategy assistant as a JSON API server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Model to use for completions
    #[arg(short, long, default_value = "gpt-4o")]
    model: String,

    /// Backend LLM URL (e.g., http://localhost:11434/v1 for Ollama)
    #[arg(short = 'u', long)]
    backend_url: Option<String>,

    /// Backend API key (optional, uses OPENAI_API_KEY env var if not provided)
    #[arg(short = 'k', long)]
    backend_key: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = LlmConfig::new(&args.model);
    if let Some(url) = &args.backend_url {
        config = config.with_base_url(url);
    }
    // Resolve the key once so a missing credential stops startup
    match args.backend_key.clone().map(Ok).unwrap_or_else(|| config.resolve_api_key()) {
        Ok(key) => config = config.with_api_key(key),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }

    let state = match AppState::connect(config).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    // CORS configuration for browser clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/v1/pico", post(pico_from_title))
        .route("/v1/pico/refine", post(refine_pico))
        .route("/v1/concepts", post(concepts_from_pico))
        .route("/v1/search-terms", post(search_terms))
        .route("/v1/query", post(boolean_query))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::clone(&state));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!("pico server starting on {}", addr);
    tracing::info!("Model: {}", args.model);
    tracing::info!(
        "Backend URL: {}",
        args.backend_url.as_deref().unwrap_or("https://api.openai.com/v1")
    );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", e);
    }

    // The client's runtime cannot be dropped on an async worker
    let _ = tokio::task::spawn_blocking(move || drop(state)).await;
}
