use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use moodwire_common::{Config, MonitoredScopes};

mod db;
mod rest;
mod stats;

use db::ApiStore;
use rest::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("moodwire=info".parse()?))
        .init();

    let config = Config::api_from_env();

    let scopes = MonitoredScopes::load(&config.boards_file, &config.subreddits_file)?;
    let db = ApiStore::connect(&config.database_url).await?;

    let state = Arc::new(AppState { db, scopes });

    let app = Router::new()
        .route("/", get(rest::health))
        .route("/api/trend-data", get(rest::trend_data))
        .route("/api/platforms-metadata", get(rest::platforms_metadata))
        .route("/api/subreddits", get(rest::subreddits))
        .route("/api/toxicity-engagement", get(rest::toxicity_engagement))
        .route("/api/sentiment-distribution", get(rest::sentiment_distribution))
        .route("/api/media-metrics", get(rest::media_metrics))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!(addr = %addr, "Moodwire API listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
