//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - TOML configuration file (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Special-cased deployment variables (HOST, PORT, OPENAI_API_KEY, DATABASE_URL)
//! 2. Environment variables (APP_SERVER_HOST, APP_SERVER_PORT, ...)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! The resulting [`AppConfig`] is constructed once at startup and passed
//! explicitly to the components that need it.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub transcription: TranscriptionConfig,
    pub uploads: UploadsConfig,
    pub ratelimit: RateLimitConfig,
}

/// Server-specific configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Persistence settings. The store is a single SQLite database file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Bearer-token settings for the `/api/v1` surface.
///
/// An empty token disables authentication, which is only acceptable for
/// local development; `validate()` warns about it at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token: String,
}

/// External transcription service settings.
///
/// The defaults target OpenAI's `audio/transcriptions` endpoint with the
/// `whisper-1` model; any compatible service can be substituted via the
/// `url` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub url: String,
    pub key: String,
    pub model: String,
    /// Upper bound on a single upstream call, in seconds. There are no
    /// retries; a timed-out call fails the whole request.
    pub timeout: u64,
}

/// Staging directory for uploaded audio files awaiting transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadsConfig {
    pub dir: String,
}

/// Fixed-window rate limiting applied uniformly to the API surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per client within one window
    pub requests: u32,
    /// Window length in seconds
    pub window: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                path: "transcriptions.db".to_string(),
            },
            auth: AuthConfig {
                token: String::new(),
            },
            transcription: TranscriptionConfig {
                url: "https://api.openai.com/v1/audio/transcriptions".to_string(),
                key: String::new(),
                model: "whisper-1".to_string(),
                timeout: 120,
            },
            uploads: UploadsConfig {
                dir: "./uploads".to_string(),
            },
            ratelimit: RateLimitConfig {
                requests: 100,
                window: 15 * 60, // 15 minutes
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config.toml, and the environment.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER_HOST=0.0.0.0`: Override server host
    /// - `APP_SERVER_PORT=8080`: Override server port
    /// - `APP_AUTH_TOKEN=secret`: Set the API bearer token
    /// - `HOST` / `PORT`: Special cases for deployment platforms
    /// - `OPENAI_API_KEY`: Credential for the external transcription service
    /// - `DATABASE_URL`: Path to the SQLite database file
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms commonly inject these without the APP_ prefix.
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            settings = settings.set_override("transcription.key", key)?;
        }

        if let Ok(path) = env::var("DATABASE_URL") {
            settings = settings.set_override("database.path", path)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - The staging directory and database path are non-empty
    /// - The rate-limit window admits at least one request
    /// - The upstream timeout is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.uploads.dir.trim().is_empty() {
            return Err(anyhow::anyhow!("Uploads directory cannot be empty"));
        }

        if self.database.path.trim().is_empty() {
            return Err(anyhow::anyhow!("Database path cannot be empty"));
        }

        if self.ratelimit.requests == 0 {
            return Err(anyhow::anyhow!("Rate limit must allow at least one request"));
        }

        if self.ratelimit.window == 0 {
            return Err(anyhow::anyhow!("Rate limit window cannot be 0 seconds"));
        }

        if self.transcription.timeout == 0 {
            return Err(anyhow::anyhow!("Transcription timeout cannot be 0 seconds"));
        }

        if self.auth.token.is_empty() {
            tracing::warn!("auth token is empty; API authentication is disabled");
        }

        if self.transcription.key.is_empty() {
            tracing::warn!("transcription service key is empty; upstream calls will be rejected");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.ratelimit.requests, 100);
        assert_eq!(config.ratelimit.window, 900);
    }

    #[test]
    fn zero_port_fails_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_uploads_dir_fails_validation() {
        let mut config = AppConfig::default();
        config.uploads.dir = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_rate_limit_fails_validation() {
        let mut config = AppConfig::default();
        config.ratelimit.requests = 0;
        assert!(config.validate().is_err());
    }
}
