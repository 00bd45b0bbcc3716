//! # Transcription Pipeline
//!
//! Orchestrates one transcription: probe the staged file's duration, submit
//! it to the external speech-to-text service, persist the combined result,
//! and remove the staged file.
//!
//! The duration probe and the upstream call have no data dependency and run
//! concurrently; both complete before anything is persisted. A record is
//! created only after a successful upstream call, and the staged file is
//! removed whether the pipeline succeeds or fails, so a failed request
//! never leaves either a record or a staged file behind.

pub mod whisper;

use std::path::Path;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::audio;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::{NewTranscript, TranscriptRecord};
use crate::upload::StagedUpload;

pub use whisper::WhisperClient;

/// Seam for the external speech-to-text service. The production
/// implementation is [`WhisperClient`]; tests substitute stubs.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Submit the audio file and await the transcript text.
    async fn transcribe(&self, audio_path: &Path, file_name: &str) -> AppResult<String>;
}

/// Run the full pipeline for one staged upload. Whatever happens inside,
/// the staged file is gone by the time this returns.
pub async fn run_pipeline(state: &AppState, staged: &StagedUpload) -> AppResult<TranscriptRecord> {
    let result = transcribe_staged(state, staged).await;

    if let Err(e) = tokio::fs::remove_file(&staged.path).await {
        // The sweeper will pick up anything left behind.
        warn!(path = %staged.path.display(), error = %e, "failed to remove staged file");
    }

    result
}

async fn transcribe_staged(state: &AppState, staged: &StagedUpload) -> AppResult<TranscriptRecord> {
    let probe_path = staged.path.clone();
    let duration_task = tokio::task::spawn_blocking(move || audio::probe_duration_seconds(&probe_path));
    let transcribe_task = state
        .transcriber
        .transcribe(&staged.path, &staged.original_name);

    let (duration, text) = tokio::join!(duration_task, transcribe_task);

    let duration = duration
        .map_err(|e| AppError::Internal(format!("duration probe task failed: {e}")))??;
    let text = text?;

    let record = state.store.insert(NewTranscript {
        text,
        file_name: staged.original_name.clone(),
        duration_seconds: duration,
    })?;

    info!(
        id = record.id,
        file_name = %record.file_name,
        duration_seconds = record.duration_seconds,
        "transcription completed"
    );

    Ok(record)
}
