//! Application configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! environment variables.
//!
//! ```toml
//! [agent]
//! model = "openai/gpt-4o-mini"
//! temperature = 0.3
//!
//! [view]
//! spring_length = 150.0
//!
//! [narration]
//! report_removals = true
//! ```

use crate::error::ConfigError;
use cbn_diff::DiffPolicy;
use cbn_ingest::PipelineConfig;
use cbn_view::ViewConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default chat-completions endpoint
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Agent exchange settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Chat-completions URL
    pub endpoint: String,
    /// Model identifier
    pub model: String,
    /// Bearer key (never serialized back out)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Sampling temperature
    pub temperature: f64,
    /// Reply budget for a turn
    pub max_tokens: u32,
    /// Reply budget for an interpretation
    pub interpretation_max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 2500,
            interpretation_max_tokens: 150,
            timeout_secs: 120,
        }
    }
}

/// Narration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Also narrate removed nodes and edges
    pub report_removals: bool,
    /// Mention feedback loops a replacement introduces
    pub announce_feedback_loops: bool,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            report_removals: false,
            announce_feedback_loops: true,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Agent exchange
    pub agent: AgentConfig,
    /// Layout tuning
    pub view: ViewConfig,
    /// Narration
    pub narration: NarrationConfig,
    /// Reply ingestion
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Create with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from an optional file, then apply process environment overrides
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.apply_overrides(|key| std::env::var(key).ok()))
    }

    /// Read a TOML file
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML text
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on invalid TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply environment overrides through `lookup`
    ///
    /// `CBN_*` names win over the legacy `OPENROUTER_API_KEY` and
    /// `AI_MODEL`. Blank values are ignored.
    #[must_use]
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(*key))
                .find(|value| !value.trim().is_empty())
        };

        if let Some(key) = get(&["CBN_API_KEY", "OPENROUTER_API_KEY"]) {
            self.agent.api_key = Some(key);
        }
        if let Some(model) = get(&["CBN_MODEL", "AI_MODEL"]) {
            self.agent.model = model;
        }
        if let Some(endpoint) = get(&["CBN_ENDPOINT"]) {
            self.agent.endpoint = endpoint;
        }
        self
    }

    /// With agent settings
    #[inline]
    #[must_use]
    pub fn with_agent(mut self, agent: AgentConfig) -> Self {
        self.agent = agent;
        self
    }

    /// With layout tuning
    #[inline]
    #[must_use]
    pub fn with_view(mut self, view: ViewConfig) -> Self {
        self.view = view;
        self
    }

    /// With removal reporting
    #[inline]
    #[must_use]
    pub fn with_report_removals(mut self, enabled: bool) -> Self {
        self.narration.report_removals = enabled;
        self
    }

    /// Diff policy implied by the narration settings
    #[must_use]
    pub fn diff_policy(&self) -> DiffPolicy {
        if self.narration.report_removals {
            DiffPolicy::Audit
        } else {
            DiffPolicy::Narrative
        }
    }
}
