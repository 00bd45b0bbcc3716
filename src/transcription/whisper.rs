//! Whisper-compatible transcription client.
//!
//! Posts the staged audio file as a multipart form to an OpenAI-style
//! `audio/transcriptions` endpoint and returns the transcript text. There
//! is no retry logic: a single failed attempt fails the whole request.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::TranscriptionConfig;
use crate::error::{AppError, AppResult};

use super::Transcriber;

/// Response body of a successful `audio/transcriptions` call.
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

/// reqwest-backed client for the external transcription service.
pub struct WhisperClient {
    http: reqwest::Client,
    url: String,
    key: String,
    model: String,
}

impl WhisperClient {
    pub fn new(config: &TranscriptionConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| AppError::Config(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            url: config.url.clone(),
            key: config.key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio_path: &Path, file_name: &str) -> AppResult<String> {
        let bytes = tokio::fs::read(audio_path).await.map_err(|e| {
            AppError::Internal(format!("reading staged file {}: {e}", audio_path.display()))
        })?;

        debug!(
            file_name = %file_name,
            bytes = bytes.len(),
            model = %self.model,
            "submitting audio to transcription service"
        );

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "transcription service returned {status}: {body}"
            )));
        }

        let parsed: WhisperResponse = response.json().await.map_err(|e| {
            AppError::Upstream(format!("decoding transcription response: {e}"))
        })?;

        Ok(parsed.text)
    }
}
