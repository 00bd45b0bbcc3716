//! # Upload Intake
//!
//! Receives the multipart `audio` field, validates its name and declared
//! content type against the audio allow-lists, and streams it to the staging
//! directory under a collision-resistant generated name. The 25 MB size cap
//! is enforced while streaming: an oversized upload is aborted and its
//! partial file removed before the limit-exceeded error is returned.

use std::path::{Path, PathBuf};

use actix_multipart::Multipart;
use chrono::Utc;
use futures_util::StreamExt as _;
use tokio::io::AsyncWriteExt as _;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Maximum accepted upload size: 25 MB.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// File extensions accepted for transcription.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["mp3", "wav", "m4a", "ogg"];

/// Declared content types accepted for transcription, including the common
/// vendor variants browsers and CLIs send for the allowed extensions.
pub const ALLOWED_MIME_TYPES: [&str; 9] = [
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/x-wav",
    "audio/wave",
    "audio/m4a",
    "audio/x-m4a",
    "audio/mp4",
    "audio/ogg",
];

/// An uploaded file staged on disk, awaiting transcription.
#[derive(Debug, Clone)]
pub struct StagedUpload {
    /// Path to the staged copy in the uploads directory
    pub path: PathBuf,
    /// The client's original file name, kept for the persisted record
    pub original_name: String,
}

/// Reject file names whose extension is not in the allow-list.
pub fn validate_extension(file_name: &str) -> AppResult<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        _ => Err(AppError::Validation(
            "only audio files (mp3, wav, m4a, ogg) are allowed".to_string(),
        )),
    }
}

/// Reject declared content types outside the audio allow-list. A missing
/// declaration is tolerated; the extension check and the duration probe
/// still gate what gets transcribed.
pub fn validate_content_type(content_type: Option<&str>) -> AppResult<()> {
    match content_type {
        None => Ok(()),
        Some(ct) if ALLOWED_MIME_TYPES.contains(&ct.to_ascii_lowercase().as_str()) => Ok(()),
        Some(ct) => Err(AppError::Validation(format!(
            "unsupported content type: {ct}"
        ))),
    }
}

/// Collision-resistant staged name: millisecond timestamp + random suffix +
/// the original extension.
fn staged_file_name(extension: &str) -> String {
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple(),
        extension
    )
}

/// Consume the multipart payload and stage the `audio` field to disk.
///
/// Error conditions: no `audio` field or no file name → validation error;
/// disallowed extension or content type → validation error; payload larger
/// than [`MAX_UPLOAD_BYTES`] → validation error with the partial file
/// removed.
pub async fn receive_audio(mut payload: Multipart, staging_dir: &Path) -> AppResult<StagedUpload> {
    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::Validation(format!("malformed multipart payload: {e}")))?;

        if field.name() != Some("audio") {
            debug!(field = ?field.name(), "skipping unexpected multipart field");
            continue;
        }

        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned)
            .ok_or_else(|| AppError::Validation("uploaded file has no file name".to_string()))?;

        let extension = validate_extension(&original_name)?;
        validate_content_type(field.content_type().map(|m| m.essence_str()))?;

        let path = staging_dir.join(staged_file_name(&extension));
        let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
            AppError::Internal(format!("creating staged file {}: {e}", path.display()))
        })?;

        let mut written: usize = 0;
        while let Some(chunk) = field.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    discard_partial(&path).await;
                    return Err(AppError::Validation(format!("reading upload body: {e}")));
                }
            };

            written += chunk.len();
            if written > MAX_UPLOAD_BYTES {
                discard_partial(&path).await;
                return Err(AppError::Validation(format!(
                    "file exceeds the {} MB upload limit",
                    MAX_UPLOAD_BYTES / (1024 * 1024)
                )));
            }

            if let Err(e) = file.write_all(&chunk).await {
                discard_partial(&path).await;
                return Err(AppError::Internal(format!(
                    "writing staged file {}: {e}",
                    path.display()
                )));
            }
        }

        file.flush()
            .await
            .map_err(|e| AppError::Internal(format!("flushing staged file: {e}")))?;
        drop(file);

        debug!(
            path = %path.display(),
            original_name = %original_name,
            bytes = written,
            "staged uploaded audio file"
        );

        return Ok(StagedUpload {
            path,
            original_name,
        });
    }

    Err(AppError::Validation("no file uploaded".to_string()))
}

async fn discard_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "failed to remove partial staged file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_extensions_case_insensitively() {
        for name in ["a.mp3", "b.WAV", "notes.m4a", "talk.OGG"] {
            assert!(validate_extension(name).is_ok(), "{name} should pass");
        }
    }

    #[test]
    fn rejects_disallowed_extensions() {
        for name in ["notes.txt", "archive.zip", "noext", "audio.mp3.exe"] {
            assert!(matches!(
                validate_extension(name),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn content_type_allow_list() {
        assert!(validate_content_type(Some("audio/mpeg")).is_ok());
        assert!(validate_content_type(Some("audio/x-wav")).is_ok());
        assert!(validate_content_type(None).is_ok());
        assert!(matches!(
            validate_content_type(Some("video/mp4")),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_content_type(Some("text/plain")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn staged_names_are_unique_and_keep_extension() {
        let a = staged_file_name("mp3");
        let b = staged_file_name("mp3");
        assert_ne!(a, b);
        assert!(a.ends_with(".mp3"));
    }
}
