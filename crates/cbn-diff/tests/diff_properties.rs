//! Determinism, idempotence and ordering properties of the diff engine

use cbn_diff::{diff, diff_with_policy, Change, DiffPolicy};
use cbn_model::{seed_network, Category, Edge, Network, Node};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn network() -> impl Strategy<Value = Network> {
    (1usize..10)
        .prop_flat_map(|n| {
            (
                proptest::collection::vec(("[A-Za-z]{1,10}", 0usize..4), n),
                proptest::collection::vec((0..n, 0..n), 0..15),
            )
        })
        .prop_map(|(nodes, edges)| {
            let nodes = nodes
                .into_iter()
                .enumerate()
                .map(|(i, (name, states))| {
                    Node::new(format!("n{i}"), name, Category::Social)
                        .with_states((0..states).map(|s| format!("s{s}")))
                })
                .collect();
            let edges = edges
                .into_iter()
                .enumerate()
                .map(|(i, (from, to))| Edge::new(format!("e{i}"), format!("n{from}"), format!("n{to}")))
                .collect();
            Network::new(nodes, edges)
        })
}

proptest! {
    #[test]
    fn prop_self_diff_is_empty(net in network()) {
        prop_assert!(diff(&net, &net).is_empty());
        prop_assert!(diff_with_policy(&net, &net, DiffPolicy::Audit).is_empty());
    }

    #[test]
    fn prop_diff_is_deterministic(a in network(), b in network()) {
        prop_assert_eq!(diff(&a, &b), diff(&a, &b));
    }

    #[test]
    fn prop_diff_follows_candidate_order(a in network(), b in network()) {
        let result = diff(&a, &b);

        // Nodes before edges, each in candidate order
        let node_positions: Vec<usize> = result
            .iter()
            .filter(|c| matches!(c, Change::NodeAdded { .. } | Change::NodeUpdated { .. }))
            .map(|c| b.nodes.iter().position(|n| n.id == c.subject_id()).unwrap())
            .collect();
        prop_assert!(node_positions.windows(2).all(|w| w[0] < w[1]));

        let first_edge = result
            .iter()
            .position(|c| matches!(c, Change::EdgeAdded { .. } | Change::EdgeUpdated { .. }));
        if let Some(first_edge) = first_edge {
            let edges_trail = result.changes[first_edge..]
                .iter()
                .all(|c| matches!(c, Change::EdgeAdded { .. } | Change::EdgeUpdated { .. }));
            prop_assert!(edges_trail);
        }
    }

    #[test]
    fn prop_narrative_never_reports_removals(a in network(), b in network()) {
        prop_assert!(!diff(&a, &b).iter().any(Change::is_removal));
    }
}

#[test]
fn adding_one_node_yields_exactly_one_entry() {
    let n1 = Node::new("n1", "Water Quality", Category::Environmental);
    let n2 = Node::new("n2", "Seagrass Biomass", Category::Environmental);

    let previous = Network::new(vec![n1.clone()], vec![]);
    let candidate = Network::new(vec![n1, n2], vec![]);

    assert_eq!(
        diff(&previous, &candidate).descriptions(),
        vec!["added node: Seagrass Biomass".to_string()]
    );
}

#[test]
fn renamed_endpoint_reports_node_and_keeps_edge() {
    let previous = seed_network();
    let mut candidate = previous.clone();
    candidate.nodes[4].name = "Water Clarity".to_string();

    assert_eq!(
        diff(&previous, &candidate).descriptions(),
        vec!["updated node: Water Clarity".to_string()]
    );
}
