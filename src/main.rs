//! # Scribe API - Main Application Entry Point
//!
//! Boots the HTTP server: loads configuration, sets up structured logging,
//! ensures the staging directory exists, opens the SQLite store, wires the
//! external transcription client, and serves the API under `/api/v1`.
//!
//! The companion `sweep-uploads` binary handles staged-file retention; it
//! is expected to run on a schedule alongside this server.

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scribe_api::config::AppConfig;
use scribe_api::middleware::RateLimit;
use scribe_api::state::AppState;
use scribe_api::storage::TranscriptStore;
use scribe_api::transcription::{Transcriber, WhisperClient};
use scribe_api::{handlers, health};

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing();

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting scribe-api v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: {}:{}",
        config.server.host, config.server.port
    );

    // Staging directory must exist before the first upload or sweep.
    std::fs::create_dir_all(&config.uploads.dir)
        .with_context(|| format!("creating uploads directory {}", config.uploads.dir))?;

    let store = TranscriptStore::open(Path::new(&config.database.path))
        .with_context(|| format!("opening database {}", config.database.path))?;
    let transcriber: Arc<dyn Transcriber> =
        Arc::new(WhisperClient::new(&config.transcription).context("building whisper client")?);

    let state = AppState::new(config.clone(), store, transcriber);

    // Constructed once so every worker shares the same request windows.
    let rate_limit = RateLimit::new(&config.ratelimit);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(TracingLogger::default())
            .service(handlers::api_scope(&state.config, rate_limit.clone()))
            // Health check at root level for load balancers
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    info!("Server stopped gracefully");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scribe_api=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
