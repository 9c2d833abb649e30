//! Whole-network snapshot
//!
//! A [`Network`] is only ever replaced as a unit. [`Network::validate`]
//! checks the structural invariants:
//! - node ids are non-empty and unique
//! - edge ids are non-empty and unique
//! - edge endpoints reference existing nodes
//! - CPD keys and parents reference existing nodes
//! - every probability is finite
//!
//! Directed cycles are allowed. They model feedback loops and are reported
//! by [`Network::feedback_loops`], never rejected.

use crate::error::ModelError;
use crate::types::{Cpd, Edge, EdgeProbability, Node};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Causal network: nodes, edges and the (reserved) CPD map
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Network {
    /// Variables, in display order
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Relationships, in display order
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// CPDs keyed by node id
    #[serde(default)]
    pub cpds: BTreeMap<String, Cpd>,
}

impl Network {
    /// Create network without CPDs (unchecked)
    #[inline]
    #[must_use]
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            nodes,
            edges,
            cpds: BTreeMap::new(),
        }
    }

    /// Create network and check every invariant
    ///
    /// # Errors
    /// The first [`ModelError`] found by [`Network::validate`].
    pub fn validated(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, ModelError> {
        let network = Self::new(nodes, edges);
        network.validate()?;
        Ok(network)
    }

    /// With CPD map
    #[inline]
    #[must_use]
    pub fn with_cpds(mut self, cpds: BTreeMap<String, Cpd>) -> Self {
        self.cpds = cpds;
        self
    }

    /// Check structural invariants
    ///
    /// # Errors
    /// - [`ModelError::EmptyId`] for a blank node or edge id
    /// - [`ModelError::DuplicateNodeId`] / [`ModelError::DuplicateEdgeId`]
    /// - [`ModelError::DanglingEndpoint`] for an edge to a missing node
    /// - [`ModelError::UnknownCpdNode`] / [`ModelError::UnknownCpdParent`]
    /// - [`ModelError::NonFiniteProbability`] for NaN or infinite values,
    ///   which JSON cannot carry
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut node_ids = HashSet::with_capacity(self.nodes.len());
        for (index, node) in self.nodes.iter().enumerate() {
            if node.id.trim().is_empty() {
                return Err(ModelError::EmptyId { kind: "node", index });
            }
            if !node_ids.insert(node.id.as_str()) {
                return Err(ModelError::DuplicateNodeId(node.id.clone()));
            }
            if !all_finite(node.probabilities.values().copied()) {
                return Err(ModelError::non_finite("node", &node.id));
            }
        }

        let mut edge_ids = HashSet::with_capacity(self.edges.len());
        for (index, edge) in self.edges.iter().enumerate() {
            if edge.id.trim().is_empty() {
                return Err(ModelError::EmptyId { kind: "edge", index });
            }
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(ModelError::DuplicateEdgeId(edge.id.clone()));
            }
            let finite = match &edge.probability {
                Some(EdgeProbability::Scalar(p)) => p.is_finite(),
                Some(EdgeProbability::Table(rows)) => {
                    all_finite(rows.values().flat_map(|row| row.values().copied()))
                }
                None => true,
            };
            if !finite {
                return Err(ModelError::non_finite("edge", &edge.id));
            }
            for endpoint in [&edge.from, &edge.to] {
                if !node_ids.contains(endpoint.as_str()) {
                    return Err(ModelError::DanglingEndpoint {
                        edge: edge.id.clone(),
                        endpoint: endpoint.clone(),
                    });
                }
            }
        }

        for (node, cpd) in &self.cpds {
            if !node_ids.contains(node.as_str()) {
                return Err(ModelError::UnknownCpdNode(node.clone()));
            }
            if let Some(parent) = cpd
                .parents
                .iter()
                .find(|p| !node_ids.contains(p.as_str()))
            {
                return Err(ModelError::UnknownCpdParent {
                    node: node.clone(),
                    parent: parent.clone(),
                });
            }
            if !all_finite(cpd.probabilities.values().flatten().copied()) {
                return Err(ModelError::non_finite("cpd", node));
            }
        }

        Ok(())
    }

    /// Node by id
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Node by display name
    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Edge by id
    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Check if a node id exists
    #[inline]
    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Display name for a node id, falling back to the id itself
    #[must_use]
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.node(id).map_or(id, |n| n.name.as_str())
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Directed cycles, as node ids in network order
    ///
    /// Each entry is one strongly connected component with more than one
    /// node, or a single node with a self-loop. Output order is
    /// deterministic: members follow node order, loops follow their first
    /// member.
    #[must_use]
    pub fn feedback_loops(&self) -> Vec<Vec<String>> {
        let order: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for node in &self.nodes {
            graph.add_node(node.id.as_str());
        }
        for edge in &self.edges {
            if order.contains_key(edge.from.as_str()) && order.contains_key(edge.to.as_str()) {
                graph.add_edge(edge.from.as_str(), edge.to.as_str(), ());
            }
        }

        let rank = |id: &str| order.get(id).copied().unwrap_or(usize::MAX);
        let mut loops: Vec<Vec<&str>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|mut scc| {
                scc.sort_by_key(|id| rank(*id));
                scc
            })
            .collect();
        loops.sort_by_key(|scc| rank(scc[0]));

        loops
            .into_iter()
            .map(|scc| scc.into_iter().map(str::to_string).collect())
            .collect()
    }

    /// Serialize as indented JSON
    ///
    /// # Errors
    /// [`ModelError::Serialization`] if encoding fails.
    pub fn to_json_pretty(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON (strict; no normalisation)
    ///
    /// # Errors
    /// [`ModelError::Serialization`] if the text is not a network.
    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(text)?)
    }
}

fn all_finite(mut values: impl Iterator<Item = f64>) -> bool {
    values.all(f64::is_finite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    fn node(id: &str) -> Node {
        Node::new(id, id.to_uppercase(), Category::Social)
    }

    #[test]
    fn validate_accepts_well_formed() {
        let net = Network::new(vec![node("a"), node("b")], vec![Edge::new("e1", "a", "b")]);
        assert!(net.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_finite_probabilities() {
        let bad_node = Network::new(vec![node("a").with_probability("High", f64::NAN)], vec![]);
        let bad_scalar = Network::new(
            vec![node("a"), node("b")],
            vec![Edge::new("e1", "a", "b").with_probability(EdgeProbability::Scalar(f64::INFINITY))],
        );
        let bad_table = Network::new(
            vec![node("a"), node("b")],
            vec![Edge::new("e1", "a", "b").with_probability(EdgeProbability::Table(
                BTreeMap::from([("Low".to_string(), BTreeMap::from([("Poor".to_string(), f64::NAN)]))]),
            ))],
        );
        let bad_cpd = Network::new(vec![node("a")], vec![]).with_cpds(BTreeMap::from([(
            "a".to_string(),
            Cpd {
                parents: vec![],
                probabilities: BTreeMap::from([(String::new(), vec![0.5, f64::NEG_INFINITY])]),
            },
        )]));

        for (net, owner) in [
            (bad_node, "node a"),
            (bad_scalar, "edge e1"),
            (bad_table, "edge e1"),
            (bad_cpd, "cpd a"),
        ] {
            let err = net.validate().unwrap_err();
            assert_eq!(err.to_string(), format!("{owner} has a non-finite probability"));
        }
    }

    #[test]
    fn validate_rejects_duplicate_node() {
        let net = Network::new(vec![node("a"), node("a")], vec![]);
        assert!(matches!(
            net.validate(),
            Err(ModelError::DuplicateNodeId(id)) if id == "a"
        ));
    }

    #[test]
    fn validate_rejects_duplicate_edge() {
        let net = Network::new(
            vec![node("a"), node("b")],
            vec![Edge::new("e1", "a", "b"), Edge::new("e1", "b", "a")],
        );
        assert!(matches!(net.validate(), Err(ModelError::DuplicateEdgeId(_))));
    }

    #[test]
    fn validate_rejects_dangling_endpoint() {
        let net = Network::new(vec![node("a")], vec![Edge::new("e1", "a", "ghost")]);
        assert!(matches!(
            net.validate(),
            Err(ModelError::DanglingEndpoint { endpoint, .. }) if endpoint == "ghost"
        ));
    }

    #[test]
    fn validate_rejects_blank_id() {
        let net = Network::new(vec![node("a"), node(" ")], vec![]);
        assert!(matches!(
            net.validate(),
            Err(ModelError::EmptyId { kind: "node", index: 1 })
        ));
    }

    #[test]
    fn validate_checks_cpd_references() {
        let mut cpds = BTreeMap::new();
        cpds.insert(
            "b".to_string(),
            Cpd {
                parents: vec!["zzz".to_string()],
                probabilities: BTreeMap::new(),
            },
        );
        let net = Network::new(vec![node("a"), node("b")], vec![]).with_cpds(cpds);
        assert!(matches!(
            net.validate(),
            Err(ModelError::UnknownCpdParent { .. })
        ));

        let mut cpds = BTreeMap::new();
        cpds.insert("nope".to_string(), Cpd::default());
        let net = Network::new(vec![node("a")], vec![]).with_cpds(cpds);
        assert!(matches!(net.validate(), Err(ModelError::UnknownCpdNode(_))));
    }

    #[test]
    fn feedback_loops_reports_cycles_in_node_order() {
        let net = Network::new(
            vec![node("a"), node("b"), node("c"), node("d")],
            vec![
                Edge::new("e1", "c", "a"),
                Edge::new("e2", "a", "b"),
                Edge::new("e3", "b", "c"),
                Edge::new("e4", "d", "d"),
            ],
        );
        assert_eq!(
            net.feedback_loops(),
            vec![
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                vec!["d".to_string()],
            ]
        );
    }

    #[test]
    fn feedback_loops_empty_for_dag() {
        let net = Network::new(
            vec![node("a"), node("b")],
            vec![Edge::new("e1", "a", "b")],
        );
        assert!(net.feedback_loops().is_empty());
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let net = Network::new(vec![node("a")], vec![]);
        assert_eq!(net.display_name("a"), "A");
        assert_eq!(net.display_name("missing"), "missing");
    }
}
