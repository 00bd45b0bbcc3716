//! # Scribe API
//!
//! Backend service that accepts uploaded audio files, forwards them to an
//! external speech-to-text service, persists the resulting transcript
//! metadata in SQLite, and exposes CRUD/listing endpoints with pagination
//! and filtering.
//!
//! ## Application Architecture:
//! - **config**: Application configuration (TOML file + environment variables)
//! - **state**: Shared application state handed to every request handler
//! - **error**: Error taxonomy and HTTP error responses
//! - **storage**: SQLite-backed transcript store (create, list, get, delete)
//! - **upload**: Multipart intake, validation, and file staging
//! - **audio**: Audio duration probing
//! - **transcription**: External transcription client and pipeline orchestration
//! - **sweeper**: Retention sweep for stale staged files
//! - **middleware**: Bearer-token guard and rate limiting
//! - **handlers**: HTTP request handlers
//! - **health**: Health check endpoint

pub mod audio;
pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod state;
pub mod storage;
pub mod sweeper;
pub mod transcription;
pub mod upload;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use state::AppState;
pub use storage::{TranscriptRecord, TranscriptStore};
pub use transcription::Transcriber;
