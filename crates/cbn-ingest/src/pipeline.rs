//! The total ingestion pipeline
//!
//! [`Pipeline::ingest`] never fails and never panics: every rejected reply
//! becomes the fallback result, which keeps the last known-good network.

use crate::error::{IngestError, TransportError};
use crate::extract::{locate_object, strip_fences};
use crate::schema::{validate_reply, ValidatedReply};
use cbn_model::Network;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Sole suggestion of the fallback result
pub const FALLBACK_SUGGESTION: &str = "Error: Invalid or incomplete JSON response from AI model";

/// Sole reflection prompt of the fallback result
pub const RETRY_PROMPT: &str = "Please try again";

/// What happened to the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Reply carried a valid replacement network
    Replaced,
    /// Reply was valid but carried no network
    NoUpdate,
    /// Reply was rejected
    Fallback,
}

/// Result of one ingestion, always populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestResult {
    /// Network to adopt (the fallback unless replaced)
    pub updated_network: Network,
    /// Tentative suggestions
    pub tentative_suggestions: Vec<String>,
    /// Reflection prompts
    pub reflection_prompts: Vec<String>,
    /// Subclaims
    pub subclaims: Vec<String>,
    /// Prose preceding the reply object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    /// How the network was decided
    pub disposition: Disposition,
}

impl IngestResult {
    /// The fixed fallback result over `network`
    #[must_use]
    pub fn fallback(network: &Network) -> Self {
        Self {
            updated_network: network.clone(),
            tentative_suggestions: vec![FALLBACK_SUGGESTION.to_string()],
            reflection_prompts: vec![RETRY_PROMPT.to_string()],
            subclaims: Vec::new(),
            preamble: None,
            disposition: Disposition::Fallback,
        }
    }

    /// Check if the reply was rejected
    #[inline]
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.disposition == Disposition::Fallback
    }

    /// Check if the network was replaced
    #[inline]
    #[must_use]
    pub fn is_replaced(&self) -> bool {
        self.disposition == Disposition::Replaced
    }

    /// Suggestions as narrated, preamble first
    #[must_use]
    pub fn suggestions_with_preamble(&self) -> Vec<String> {
        self.preamble
            .iter()
            .chain(&self.tentative_suggestions)
            .cloned()
            .collect()
    }
}

/// Outcome of schema validation
#[derive(Debug)]
pub enum IngestOutcome {
    /// Reply accepted
    Validated(ValidatedReply),
    /// Reply rejected, with the reason
    Fallback(IngestError),
}

impl IngestOutcome {
    /// Check if the reply was accepted
    #[inline]
    #[must_use]
    pub fn is_validated(&self) -> bool {
        matches!(self, Self::Validated(_))
    }

    /// Materialise the result against the last known-good network
    #[must_use]
    pub fn into_result(self, fallback: &Network) -> IngestResult {
        match self {
            Self::Validated(reply) => {
                let (updated_network, disposition) = match reply.network {
                    Some(network) => (network, Disposition::Replaced),
                    None => (fallback.clone(), Disposition::NoUpdate),
                };
                IngestResult {
                    updated_network,
                    tentative_suggestions: reply.tentative_suggestions,
                    reflection_prompts: reply.reflection_prompts,
                    subclaims: reply.subclaims,
                    preamble: reply.preamble,
                    disposition,
                }
            }
            Self::Fallback(_) => IngestResult::fallback(fallback),
        }
    }
}

/// Pipeline tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Opening braces tried by the scanning stage
    pub max_scan_candidates: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_scan_candidates: 64,
        }
    }
}

impl PipelineConfig {
    /// With scan candidate limit
    #[must_use]
    pub fn with_max_scan_candidates(mut self, limit: usize) -> Self {
        self.max_scan_candidates = limit;
        self
    }
}

/// Reply ingestion pipeline
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create with default config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with explicit config
    #[must_use]
    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Current config
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run extraction and schema validation without materialising
    #[must_use]
    pub fn evaluate(&self, raw: &str) -> IngestOutcome {
        let cleaned = strip_fences(raw);
        debug!(raw_bytes = raw.len(), cleaned_bytes = cleaned.len(), "ingesting reply");

        if cleaned.is_empty() {
            return IngestOutcome::Fallback(IngestError::malformed_payload("empty reply"));
        }

        let Some(located) = locate_object(&cleaned, self.config.max_scan_candidates) else {
            return IngestOutcome::Fallback(IngestError::malformed_payload(
                "no JSON object found in reply",
            ));
        };
        debug!(
            stage = ?located.stage,
            preamble = located.preamble.is_some(),
            "located reply object"
        );

        match validate_reply(&located.object, located.preamble) {
            Ok(reply) => IngestOutcome::Validated(reply),
            Err(err) => IngestOutcome::Fallback(err),
        }
    }

    /// Ingest reply text against the last known-good network
    #[must_use]
    pub fn ingest(&self, raw: &str, fallback: &Network) -> IngestResult {
        let outcome = self.evaluate(raw);
        if let IngestOutcome::Fallback(err) = &outcome {
            warn!(kind = err.kind(), error = %err, "agent reply rejected, keeping previous network");
        }
        outcome.into_result(fallback)
    }

    /// Ingest the result of an agent call
    #[must_use]
    pub fn ingest_reply(
        &self,
        reply: Result<String, TransportError>,
        fallback: &Network,
    ) -> IngestResult {
        match reply {
            Ok(text) => self.ingest(&text, fallback),
            Err(err) => {
                let err = IngestError::from(err);
                warn!(kind = err.kind(), error = %err, "agent call failed, keeping previous network");
                IngestOutcome::Fallback(err).into_result(fallback)
            }
        }
    }
}

/// Ingest with the default pipeline
#[must_use]
pub fn ingest(raw: &str, fallback: &Network) -> IngestResult {
    Pipeline::new().ingest(raw, fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbn_model::seed_network;
    use pretty_assertions::assert_eq;

    #[test]
    fn prose_before_object_becomes_preamble() {
        let fallback = seed_network();
        let raw = "Water Quality affects Seagrass Biomass.\n{\"updated_cbn\": null, \"tentative_suggestions\": [\"ok\"], \"reflection_prompts\": [], \"subclaims\": []}";

        let result = ingest(raw, &fallback);

        assert_eq!(result.updated_network, fallback);
        assert_eq!(result.tentative_suggestions, vec!["ok"]);
        assert!(result.reflection_prompts.is_empty());
        assert!(result.subclaims.is_empty());
        assert_eq!(result.disposition, Disposition::NoUpdate);
        assert_eq!(
            result.suggestions_with_preamble(),
            vec!["Water Quality affects Seagrass Biomass.", "ok"]
        );
    }

    #[test]
    fn plain_text_falls_back() {
        let fallback = seed_network();
        let result = ingest("not json at all", &fallback);

        assert_eq!(result, IngestResult::fallback(&fallback));
        assert_eq!(result.tentative_suggestions, vec![FALLBACK_SUGGESTION]);
        assert_eq!(result.reflection_prompts, vec![RETRY_PROMPT]);
        assert!(result.subclaims.is_empty());
    }

    #[test]
    fn fenced_reply_replaces_network() {
        let raw = "```json\n{\"updated_network\": {\"nodes\": [{\"id\": \"a\", \"name\": \"Rain\"}]}}\n```";
        let result = ingest(raw, &seed_network());

        assert!(result.is_replaced());
        assert_eq!(result.updated_network.node_count(), 1);
        assert!(result.preamble.is_none());
    }

    #[test]
    fn transport_error_falls_back() {
        let fallback = seed_network();
        let result = Pipeline::new().ingest_reply(Err(TransportError::Timeout { secs: 5 }), &fallback);
        assert!(result.is_fallback());
        assert_eq!(result.updated_network, fallback);
    }

    #[test]
    fn evaluate_reports_reason() {
        match Pipeline::new().evaluate("") {
            IngestOutcome::Fallback(err) => assert_eq!(err.kind(), "malformed_payload"),
            IngestOutcome::Validated(_) => panic!("empty reply must not validate"),
        }
    }
}
