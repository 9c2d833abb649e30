//! Mermaid flowchart export
//!
//! Renders a network as a `flowchart TD` diagram. Node labels carry the
//! state list and, when present, the node's CPD (`Prior [..]` for a
//! parentless single row, else `P(combo=[..] | ...)`). Scalar edge
//! probabilities become edge labels. Mermaid ids are
//! positional (`n0`, `n1`, ...) so arbitrary node ids never need escaping.

use crate::network::Network;
use crate::types::{Cpd, EdgeProbability};
use std::collections::HashMap;
use std::fmt::Write;

impl Network {
    /// Render as a Mermaid flowchart
    #[must_use]
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart TD\n");
        let ids: HashMap<&str, String> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), format!("n{i}")))
            .collect();

        for node in &self.nodes {
            let mut label = escape(&node.name);
            if !node.states.is_empty() {
                let states: Vec<String> = node.states.iter().map(|s| escape(s)).collect();
                let _ = write!(label, "<br/>States: {}", states.join(", "));
            }
            if let Some(cpd) = self.cpds.get(&node.id).filter(|c| !c.probabilities.is_empty()) {
                let _ = write!(label, "<br/>CPD: {}", cpd_label(cpd));
            }
            let _ = writeln!(out, "    {}[\"{}\"]", ids[node.id.as_str()], label);
        }

        for edge in &self.edges {
            let (Some(from), Some(to)) = (ids.get(edge.from.as_str()), ids.get(edge.to.as_str()))
            else {
                continue;
            };
            match &edge.probability {
                Some(EdgeProbability::Scalar(p)) => {
                    let _ = writeln!(out, "    {from} -->|{p}| {to}");
                }
                _ => {
                    let _ = writeln!(out, "    {from} --> {to}");
                }
            }
        }

        out
    }
}

fn cpd_label(cpd: &Cpd) -> String {
    if cpd.parents.is_empty() && cpd.probabilities.len() == 1 {
        if let Some(row) = cpd.probabilities.values().next() {
            return format!("Prior {row:?}");
        }
    }
    let rows: Vec<String> = cpd
        .probabilities
        .iter()
        .map(|(combo, row)| format!("{}={row:?}", escape(combo)))
        .collect();
    format!("P({})", rows.join(" | "))
}

fn escape(text: &str) -> String {
    text.replace('"', "#quot;")
}
