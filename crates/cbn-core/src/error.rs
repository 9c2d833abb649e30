//! Error types for CBN Core
//!
//! Turn failures never surface here: the ingestion pipeline and the
//! orchestrator turn them into conversation entries. What remains is:
//! - Configuration that cannot be read or parsed
//! - Construction failures (no credentials, HTTP client setup)

use std::path::PathBuf;

pub use cbn_ingest::TransportError;

/// Configuration loading failed
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for the config shape
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Orchestrator could not be constructed
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// No API key configured
    #[error("no API key configured (set CBN_API_KEY or OPENROUTER_API_KEY)")]
    MissingApiKey,

    /// HTTP client setup failed
    #[error("http client error: {0}")]
    Client(String),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl OrchestratorError {
    /// Check if the fix is a credential
    #[inline]
    #[must_use]
    pub fn is_missing_credentials(&self) -> bool {
        matches!(self, Self::MissingApiKey)
    }
}
