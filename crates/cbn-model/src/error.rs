//! Error types for the domain model
//!
//! Every variant names the first structural invariant a network breaks.

/// Structural violations and serialization failures
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A node or edge carries an empty identifier
    #[error("{kind} #{index} has an empty id")]
    EmptyId {
        /// "node" or "edge"
        kind: &'static str,
        /// Position in the owning collection
        index: usize,
    },

    /// Two nodes share an id
    #[error("duplicate node id: {0}")]
    DuplicateNodeId(String),

    /// Two edges share an id
    #[error("duplicate edge id: {0}")]
    DuplicateEdgeId(String),

    /// Edge endpoint references a node that does not exist
    #[error("edge {edge} references unknown node {endpoint}")]
    DanglingEndpoint {
        /// Offending edge id
        edge: String,
        /// Unresolved endpoint id
        endpoint: String,
    },

    /// CPD entry keyed by a node that does not exist
    #[error("cpd references unknown node {0}")]
    UnknownCpdNode(String),

    /// CPD lists a parent that does not exist
    #[error("cpd for {node} lists unknown parent {parent}")]
    UnknownCpdParent {
        /// Node the CPD belongs to
        node: String,
        /// Unresolved parent id
        parent: String,
    },

    /// A probability is NaN or infinite
    #[error("{owner} has a non-finite probability")]
    NonFiniteProbability {
        /// Node or edge id, prefixed with its kind
        owner: String,
    },

    /// JSON encoding or decoding failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ModelError {
    pub(crate) fn non_finite(kind: &str, id: &str) -> Self {
        Self::NonFiniteProbability {
            owner: format!("{kind} {id}"),
        }
    }

    /// Check if error is a broken reference (as opposed to a duplicate)
    #[inline]
    #[must_use]
    pub fn is_dangling_reference(&self) -> bool {
        matches!(
            self,
            Self::DanglingEndpoint { .. } | Self::UnknownCpdNode(_) | Self::UnknownCpdParent { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_display() {
        let err = ModelError::DanglingEndpoint {
            edge: "e1".to_string(),
            endpoint: "ghost".to_string(),
        };
        assert_eq!(err.to_string(), "edge e1 references unknown node ghost");
    }

    #[test]
    fn model_error_dangling_classification() {
        assert!(ModelError::UnknownCpdNode("x".to_string()).is_dangling_reference());
        assert!(!ModelError::DuplicateNodeId("x".to_string()).is_dangling_reference());
    }
}
