//! Retention sweep for staged upload files.
//!
//! Runs one sweep of the uploads directory, deleting files older than 24
//! hours, then exits. Intended to be scheduled (cron or similar) alongside
//! the API server; safe to run concurrently with live uploads.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scribe_api::config::AppConfig;
use scribe_api::sweeper::{self, MAX_STAGED_AGE};

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scribe_api=info,sweep_uploads=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    let dir = Path::new(&config.uploads.dir);
    let stats = sweeper::sweep(dir, MAX_STAGED_AGE)
        .with_context(|| format!("sweeping uploads directory {}", dir.display()))?;

    info!(
        scanned = stats.scanned,
        deleted = stats.deleted,
        failed = stats.failed,
        "sweep complete"
    );

    Ok(())
}
