use axum::{extract::State, routing::get, Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_clash::{
    artifact::{ArtifactConfig, ArtifactProducer},
    state::AppState,
    types::GameConfig,
    ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_clash=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting image clash...");

    let game_config = GameConfig::from_env();
    tracing::info!(
        "Games collect for {}s, vote for {}s, {}-{} submissions",
        game_config.collection_seconds,
        game_config.voting_seconds,
        game_config.min_submissions,
        game_config.max_submissions
    );

    let producer: Option<Arc<dyn ArtifactProducer>> =
        match ArtifactConfig::from_env().build_producer() {
            Ok(producer) => {
                tracing::info!("Image generation via {}", producer.name());
                Some(Arc::new(producer))
            }
            Err(e) => {
                tracing::warn!("{}. Image generation will not be available.", e);
                None
            }
        };

    let state = Arc::new(AppState::with_producer(game_config, producer));

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "games": state.registry.len(),
    }))
}
