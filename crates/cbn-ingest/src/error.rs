//! Error types for reply ingestion
//!
//! Provides the failure taxonomy for one agent exchange:
//! - Transport failures (the call itself did not produce text)
//! - Malformed payloads (text without a usable reply object)
//! - Malformed updates (reply object whose network breaks the model)
//!
//! None of these escape the pipeline; each one selects the fallback result.

use cbn_model::ModelError;

/// The agent call failed before producing a reply
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection or protocol failure
    #[error("request failed: {0}")]
    Request(String),

    /// No reply within the configured window
    #[error("agent call timed out after {secs}s")]
    Timeout {
        /// Configured timeout in seconds
        secs: u64,
    },

    /// Non-success HTTP status
    #[error("agent returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// Response envelope could not be read
    #[error("unreadable response envelope: {0}")]
    Envelope(String),

    /// Envelope carried no text
    #[error("agent returned an empty reply")]
    EmptyReply,

    /// Request could not be encoded
    #[error("request could not be encoded: {0}")]
    Encode(String),
}

impl TransportError {
    /// Check if retrying the same request may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::Timeout { .. } | Self::EmptyReply => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Envelope(_) | Self::Encode(_) => false,
        }
    }
}

/// Why a reply was not accepted
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The agent call failed
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// No reply object could be recovered from the text
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The reply's network failed shape or invariant checks
    #[error("malformed update: {0}")]
    MalformedUpdate(String),
}

impl IngestError {
    /// Create malformed payload error
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::MalformedPayload(message.into())
    }

    /// Create malformed update error
    pub fn malformed_update(message: impl Into<String>) -> Self {
        Self::MalformedUpdate(message.into())
    }

    /// Short machine-friendly label
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::MalformedUpdate(_) => "malformed_update",
        }
    }
}

impl From<ModelError> for IngestError {
    fn from(err: ModelError) -> Self {
        Self::MalformedUpdate(err.to_string())
    }
}
