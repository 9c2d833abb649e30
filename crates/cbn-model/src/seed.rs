//! Boot network for a new session
//!
//! A seagrass restoration scenario: 9 variables, 10 relationships. The
//! livelihood loop (support -> investment -> water quality -> seagrass ->
//! fish stocks -> income -> support) is a deliberate feedback cycle.

use crate::network::Network;
use crate::types::{Category, Edge, EdgeProbability, Node};

/// Build the fixed seed network
#[must_use]
pub fn seed_network() -> Network {
    let nodes = vec![
        Node::new("local_support", "Local Support", Category::Social)
            .with_states(["Weak", "Strong"])
            .with_probability("Weak", 0.6)
            .with_probability("Strong", 0.4)
            .with_description("Community backing for restoration work"),
        Node::new("community_awareness", "Community Awareness", Category::Social)
            .with_states(["Low", "High"]),
        Node::new("restoration_investment", "Restoration Investment", Category::Economic)
            .with_states(["Limited", "Adequate"]),
        Node::new(
            "management_effectiveness",
            "Management Effectiveness",
            Category::Management,
        )
        .with_states(["Ineffective", "Effective"]),
        Node::new("water_quality", "Water Quality", Category::Environmental)
            .with_states(["Poor", "Good"]),
        Node::new("seagrass_biomass", "Seagrass Biomass", Category::Environmental)
            .with_states(["Low", "Medium", "High"]),
        Node::new("carbon_sequestration", "Carbon Sequestration", Category::Environmental)
            .with_states(["Low", "High"]),
        Node::new("fish_stocks", "Fish Stocks", Category::Environmental)
            .with_states(["Depleted", "Healthy"]),
        Node::new("fisheries_income", "Fisheries Income", Category::Economic)
            .with_states(["Low", "High"]),
    ];

    let edges = vec![
        Edge::new("e1", "community_awareness", "local_support")
            .with_probability(EdgeProbability::Scalar(0.7)),
        Edge::new("e2", "local_support", "restoration_investment").with_probability(
            EdgeProbability::table([
                ("Weak", vec![("Limited", 0.8), ("Adequate", 0.2)]),
                ("Strong", vec![("Limited", 0.3), ("Adequate", 0.7)]),
            ]),
        ),
        Edge::new("e3", "restoration_investment", "management_effectiveness"),
        Edge::new("e4", "restoration_investment", "water_quality").with_probability(
            EdgeProbability::table([
                ("Limited", vec![("Poor", 0.7), ("Good", 0.3)]),
                ("Adequate", vec![("Poor", 0.3), ("Good", 0.7)]),
            ]),
        ),
        Edge::new("e5", "management_effectiveness", "water_quality"),
        Edge::new("e6", "water_quality", "seagrass_biomass").with_probability(
            EdgeProbability::table([
                ("Poor", vec![("Low", 0.7), ("Medium", 0.2), ("High", 0.1)]),
                ("Good", vec![("Low", 0.2), ("Medium", 0.3), ("High", 0.5)]),
            ]),
        ),
        Edge::new("e7", "seagrass_biomass", "carbon_sequestration").with_probability(
            EdgeProbability::table([
                ("Low", vec![("Low", 0.9), ("High", 0.1)]),
                ("Medium", vec![("Low", 0.5), ("High", 0.5)]),
                ("High", vec![("Low", 0.2), ("High", 0.8)]),
            ]),
        ),
        Edge::new("e8", "seagrass_biomass", "fish_stocks"),
        Edge::new("e9", "fish_stocks", "fisheries_income"),
        Edge::new("e10", "fisheries_income", "local_support"),
    ];

    Network::new(nodes, edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_has_reference_shape() {
        let seed = seed_network();
        assert_eq!(seed.node_count(), 9);
        assert_eq!(seed.edge_count(), 10);
        assert!(seed.cpds.is_empty());
        assert!(seed.validate().is_ok());
    }

    #[test]
    fn seed_contains_livelihood_loop() {
        let loops = seed_network().feedback_loops();
        assert_eq!(loops.len(), 1);
        assert!(loops[0].contains(&"fisheries_income".to_string()));
        assert!(loops[0].contains(&"local_support".to_string()));
    }
}
