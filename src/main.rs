//! Fraud Detection API
//!
//! Serves a pretrained gradient-boosted fraud classifier over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     FRAUD DETECTION API                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  POST /predict                                               │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  ┌────────────┐   ┌──────────────┐   ┌─────────────────────┐ │
//! │  │ Reconciler │──▶│ Preprocessor │──▶│ Tree ensemble       │ │
//! │  │ (7 fields) │   │ (encoding)   │   │ (proba + TreeSHAP)  │ │
//! │  └────────────┘   └──────────────┘   └──────────┬──────────┘ │
//! │                                                 ▼            │
//! │                                     risk tier + attributions │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both artifacts are loaded once at startup and shared read-only.

mod artifacts;
mod config;
mod error;
mod explain;
mod handlers;
mod models;
mod scoring;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artifacts::ArtifactInfo;
use scoring::ScoringEngine;

pub use error::AppResult;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    init_tracing(&config);

    tracing::info!("{} starting...", handlers::health::SERVICE_NAME);
    tracing::info!(
        "Artifacts: preprocessor={} model={}",
        config.preprocessor_path,
        config.model_path
    );

    // Artifacts must load before the listener is bound
    let loaded = artifacts::load(&config).context("Failed to load model artifacts")?;

    let state = AppState {
        engine: ScoringEngine::from_artifacts(&loaded),
        artifacts: Arc::new(loaded.info),
    };

    tracing::info!("Scoring {} encoded features", state.engine.feature_names().len());

    let app = create_router(state);

    let addr = config.bind_addr();
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &config::Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fraud_risk_api=debug,tower_http=debug".into());

    if config.use_json_logs() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: ScoringEngine,
    pub artifacts: Arc<ArtifactInfo>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict))
        .route("/explain", post(handlers::predict::explain_prediction))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
