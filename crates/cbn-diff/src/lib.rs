//! CBN Diff - change narration between network snapshots
//!
//! Compares a `previous` and a `candidate` [`Network`] and lists what the
//! candidate adds or changes, in candidate order: nodes first, then edges.
//! Equality is the structural `PartialEq` of the model records, never
//! identity.
//!
//! Removals are only reported under [`DiffPolicy::Audit`]; the default
//! [`DiffPolicy::Narrative`] keeps the conversational summary short.
//!
//! # Example
//!
//! ```rust
//! use cbn_diff::diff;
//! use cbn_model::seed_network;
//!
//! let seed = seed_network();
//! assert!(diff(&seed, &seed).is_empty());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

use cbn_model::{Edge, Network, Node};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Which changes to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffPolicy {
    /// Additions and updates only
    #[default]
    Narrative,
    /// Additions, updates and removals
    Audit,
}

/// One detected change
///
/// Edge variants carry endpoint display names, not ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    /// Node id absent from previous
    NodeAdded {
        /// Node id
        id: String,
        /// Display name
        name: String,
    },
    /// Node id present in both, records differ
    NodeUpdated {
        /// Node id
        id: String,
        /// Display name (candidate side)
        name: String,
    },
    /// Node id absent from candidate
    NodeRemoved {
        /// Node id
        id: String,
        /// Display name (previous side)
        name: String,
    },
    /// Edge id absent from previous
    EdgeAdded {
        /// Edge id
        id: String,
        /// Parent display name
        from: String,
        /// Child display name
        to: String,
    },
    /// Edge id present in both, records differ
    EdgeUpdated {
        /// Edge id
        id: String,
        /// Parent display name
        from: String,
        /// Child display name
        to: String,
    },
    /// Edge id absent from candidate
    EdgeRemoved {
        /// Edge id
        id: String,
        /// Parent display name
        from: String,
        /// Child display name
        to: String,
    },
}

impl Change {
    /// Check if the change adds something
    #[inline]
    #[must_use]
    pub fn is_addition(&self) -> bool {
        matches!(self, Self::NodeAdded { .. } | Self::EdgeAdded { .. })
    }

    /// Check if the change removes something
    #[inline]
    #[must_use]
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::NodeRemoved { .. } | Self::EdgeRemoved { .. })
    }

    /// Id of the node or edge concerned
    #[must_use]
    pub fn subject_id(&self) -> &str {
        match self {
            Self::NodeAdded { id, .. }
            | Self::NodeUpdated { id, .. }
            | Self::NodeRemoved { id, .. }
            | Self::EdgeAdded { id, .. }
            | Self::EdgeUpdated { id, .. }
            | Self::EdgeRemoved { id, .. } => id,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeAdded { name, .. } => write!(f, "added node: {name}"),
            Self::NodeUpdated { name, .. } => write!(f, "updated node: {name}"),
            Self::NodeRemoved { name, .. } => write!(f, "removed node: {name}"),
            Self::EdgeAdded { from, to, .. } => write!(f, "added edge: {from} -> {to}"),
            Self::EdgeUpdated { from, to, .. } => write!(f, "updated edge: {from} -> {to}"),
            Self::EdgeRemoved { from, to, .. } => write!(f, "removed edge: {from} -> {to}"),
        }
    }
}

/// Ordered change list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetworkDiff {
    /// Changes in report order
    pub changes: Vec<Change>,
}

impl NetworkDiff {
    /// Check if nothing changed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Iterate changes
    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// Human-readable lines, one per change
    #[must_use]
    pub fn descriptions(&self) -> Vec<String> {
        self.changes.iter().map(ToString::to_string).collect()
    }
}

impl<'a> IntoIterator for &'a NetworkDiff {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Diff under [`DiffPolicy::Narrative`]
#[must_use]
pub fn diff(previous: &Network, candidate: &Network) -> NetworkDiff {
    diff_with_policy(previous, candidate, DiffPolicy::Narrative)
}

/// Diff under an explicit policy
///
/// Order: candidate nodes, candidate edges, then (audit only) nodes and
/// edges missing from the candidate in previous order.
#[must_use]
pub fn diff_with_policy(previous: &Network, candidate: &Network, policy: DiffPolicy) -> NetworkDiff {
    let prev_nodes: HashMap<&str, &Node> =
        previous.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let prev_edges: HashMap<&str, &Edge> =
        previous.edges.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut changes = Vec::new();

    for node in &candidate.nodes {
        match prev_nodes.get(node.id.as_str()) {
            None => changes.push(Change::NodeAdded {
                id: node.id.clone(),
                name: node.name.clone(),
            }),
            Some(old) if *old != node => changes.push(Change::NodeUpdated {
                id: node.id.clone(),
                name: node.name.clone(),
            }),
            Some(_) => {}
        }
    }

    for edge in &candidate.edges {
        let (from, to) = endpoint_names(edge, candidate, previous);
        match prev_edges.get(edge.id.as_str()) {
            None => changes.push(Change::EdgeAdded {
                id: edge.id.clone(),
                from,
                to,
            }),
            Some(old) if *old != edge => changes.push(Change::EdgeUpdated {
                id: edge.id.clone(),
                from,
                to,
            }),
            Some(_) => {}
        }
    }

    if policy == DiffPolicy::Audit {
        let cand_nodes: HashMap<&str, &Node> =
            candidate.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let cand_edges: HashMap<&str, &Edge> =
            candidate.edges.iter().map(|e| (e.id.as_str(), e)).collect();

        for node in &previous.nodes {
            if !cand_nodes.contains_key(node.id.as_str()) {
                changes.push(Change::NodeRemoved {
                    id: node.id.clone(),
                    name: node.name.clone(),
                });
            }
        }
        for edge in &previous.edges {
            if !cand_edges.contains_key(edge.id.as_str()) {
                let (from, to) = endpoint_names(edge, previous, candidate);
                changes.push(Change::EdgeRemoved {
                    id: edge.id.clone(),
                    from,
                    to,
                });
            }
        }
    }

    NetworkDiff { changes }
}

/// Resolve endpoint ids to names, primary network first
fn endpoint_names(edge: &Edge, primary: &Network, secondary: &Network) -> (String, String) {
    let resolve = |id: &str| {
        primary
            .node(id)
            .or_else(|| secondary.node(id))
            .map_or_else(|| id.to_string(), |n| n.name.clone())
    };
    (resolve(&edge.from), resolve(&edge.to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbn_model::{Category, EdgeProbability};
    use pretty_assertions::assert_eq;

    fn node(id: &str, name: &str) -> Node {
        Node::new(id, name, Category::Environmental).with_states(["Low", "High"])
    }

    #[test]
    fn added_node_is_reported_by_name() {
        let previous = Network::new(vec![node("n1", "Rainfall")], vec![]);
        let candidate = Network::new(vec![node("n1", "Rainfall"), node("n2", "Runoff")], vec![]);

        assert_eq!(diff(&previous, &candidate).descriptions(), vec!["added node: Runoff"]);
    }

    #[test]
    fn updated_node_uses_deep_equality() {
        let previous = Network::new(vec![node("n1", "Rainfall")], vec![]);
        let mut candidate = previous.clone();
        candidate.nodes[0].states.push("Extreme".to_string());

        assert_eq!(
            diff(&previous, &candidate).descriptions(),
            vec!["updated node: Rainfall"]
        );

        // An equal copy is not a change
        let copy = previous.clone();
        assert!(diff(&previous, &copy).is_empty());
    }

    #[test]
    fn edges_follow_nodes_with_endpoint_names() {
        let previous = Network::new(vec![node("a", "Rainfall"), node("b", "Runoff")], vec![]);
        let mut candidate = previous.clone();
        candidate.nodes.push(node("c", "Turbidity"));
        candidate.edges.push(Edge::new("e1", "a", "b"));
        candidate.edges.push(Edge::new("e2", "b", "c"));

        assert_eq!(
            diff(&previous, &candidate).descriptions(),
            vec![
                "added node: Turbidity",
                "added edge: Rainfall -> Runoff",
                "added edge: Runoff -> Turbidity",
            ]
        );
    }

    #[test]
    fn updated_edge_probability() {
        let nodes = vec![node("a", "Rainfall"), node("b", "Runoff")];
        let previous = Network::new(nodes.clone(), vec![Edge::new("e1", "a", "b")]);
        let candidate = Network::new(
            nodes,
            vec![Edge::new("e1", "a", "b").with_probability(EdgeProbability::Scalar(0.4))],
        );

        let result = diff(&previous, &candidate);
        assert_eq!(result.descriptions(), vec!["updated edge: Rainfall -> Runoff"]);
        assert_eq!(result.changes[0].subject_id(), "e1");
    }

    #[test]
    fn removals_only_under_audit() {
        let previous = Network::new(
            vec![node("a", "Rainfall"), node("b", "Runoff")],
            vec![Edge::new("e1", "a", "b")],
        );
        let candidate = Network::new(vec![node("a", "Rainfall")], vec![]);

        assert!(diff(&previous, &candidate).is_empty());

        let audit = diff_with_policy(&previous, &candidate, DiffPolicy::Audit);
        assert_eq!(
            audit.descriptions(),
            vec!["removed node: Runoff", "removed edge: Rainfall -> Runoff"]
        );
        assert!(audit.iter().all(Change::is_removal));
    }

    #[test]
    fn change_serializes_with_tag() {
        let change = Change::NodeAdded {
            id: "n2".to_string(),
            name: "Runoff".to_string(),
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["change"], "node_added");
        assert_eq!(json["name"], "Runoff");
    }
}
