//! Conversation records exposed to presentation
//!
//! Entries are write-only from the core's point of view: nothing in the
//! workspace reads them back to make a decision.

use serde::{Deserialize, Serialize};

/// Who produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The human
    User,
    /// The assistant side
    Bot,
}

/// Presentation hint for an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Tentative suggestion from the agent
    Suggestion,
    /// Summary or interpretation
    Analysis,
    /// Reflection prompt back to the user
    Question,
    /// Failure reported conversationally
    Error,
}

/// Advisory metadata attached to an entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Referenced node id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Referenced edge id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
    /// Confidence (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Free-form references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

impl EntryMetadata {
    /// Metadata pointing at a node
    #[inline]
    #[must_use]
    pub fn for_node(id: impl Into<String>) -> Self {
        Self {
            node_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Metadata pointing at an edge
    #[inline]
    #[must_use]
    pub fn for_edge(id: impl Into<String>) -> Self {
        Self {
            edge_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// With confidence, clamped to [0, 1]
    #[inline]
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// Message text
    pub text: String,
    /// Author
    pub sender: Sender,
    /// Presentation hint
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntryKind>,
    /// Advisory metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EntryMetadata>,
}

impl ConversationEntry {
    /// Entry typed by the user
    #[inline]
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            kind: None,
            metadata: None,
        }
    }

    /// Entry produced by the assistant side
    #[inline]
    #[must_use]
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
            kind: None,
            metadata: None,
        }
    }

    /// With kind
    #[inline]
    #[must_use]
    pub fn with_kind(mut self, kind: EntryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// With metadata
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: EntryMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Check if this entry reports a failure
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == Some(EntryKind::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_type_tag() {
        let entry = ConversationEntry::bot("Consider adding rainfall")
            .with_kind(EntryKind::Suggestion)
            .with_metadata(EntryMetadata::for_node("water_quality").with_confidence(1.5));

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["sender"], "bot");
        assert_eq!(json["type"], "suggestion");
        assert_eq!(json["metadata"]["node_id"], "water_quality");
        assert_eq!(json["metadata"]["confidence"], 1.0);
    }

    #[test]
    fn user_entry_omits_optional_fields() {
        let json = serde_json::to_string(&ConversationEntry::user("hi")).unwrap();
        assert_eq!(json, r#"{"text":"hi","sender":"user"}"#);
    }
}
