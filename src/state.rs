//! # Application State
//!
//! Shared state handed to every HTTP request handler via `web::Data`. The
//! configuration is immutable after startup, so a plain clone is shared;
//! the store serializes its writes internally and the transcriber is a
//! trait object so tests can substitute a stub.

use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::storage::TranscriptStore;
use crate::transcription::Transcriber;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: TranscriptStore,
    pub transcriber: Arc<dyn Transcriber>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, store: TranscriptStore, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            config,
            store,
            transcriber,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
