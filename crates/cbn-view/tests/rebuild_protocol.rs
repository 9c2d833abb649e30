//! Rebuild protocol and position persistence

use cbn_model::{seed_network, Category, Edge, Network, Node};
use cbn_view::{
    ForceLayout, GraphSurface, Position, RebuildOutcome, Stabilization, ViewConfig, ViewEdge,
    ViewEvent, ViewNode, ViewStateManager, Viewport,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Wraps a layout and records every protocol call
struct RecordingSurface {
    inner: ForceLayout,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingSurface {
    fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let surface = Self {
            inner: ForceLayout::new(ViewConfig::default()),
            calls: Arc::clone(&calls),
        };
        (surface, calls)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl GraphSurface for RecordingSurface {
    fn build(&mut self, nodes: &[ViewNode], edges: &[ViewEdge]) {
        self.record(format!("build {}", nodes.len()));
        self.inner.build(nodes, edges);
    }

    fn destroy(&mut self) {
        self.record("destroy");
        self.inner.destroy();
    }

    fn is_built(&self) -> bool {
        self.inner.is_built()
    }

    fn positions(&self) -> BTreeMap<String, Position> {
        self.record("positions");
        self.inner.positions()
    }

    fn place(&mut self, id: &str, position: Position, anchored: bool) -> bool {
        self.record(format!("place {id} anchored={anchored}"));
        self.inner.place(id, position, anchored)
    }

    fn release_anchors(&mut self) {
        self.record("release");
        self.inner.release_anchors();
    }

    fn set_physics(&mut self, enabled: bool) {
        self.record(format!("physics {enabled}"));
        self.inner.set_physics(enabled);
    }

    fn physics_enabled(&self) -> bool {
        self.inner.physics_enabled()
    }

    fn stabilize(&mut self) -> Stabilization {
        self.record("stabilize");
        self.inner.stabilize()
    }

    fn fit(&mut self) -> Viewport {
        self.record("fit");
        self.inner.fit()
    }
}

fn node(id: &str) -> Node {
    Node::new(id, id.to_uppercase(), Category::Environmental)
}

#[test]
fn known_positions_survive_a_rebuild() {
    let (mut view, _events) =
        ViewStateManager::with_surface(Box::new(ForceLayout::new(ViewConfig::default())));

    view.sync(&Network::new(vec![node("n1")], vec![]));
    view.on_drag_end("n1", Position::new(10.0, 20.0)).unwrap();

    let grown = Network::new(vec![node("n1"), node("n2")], vec![Edge::new("e1", "n1", "n2")]);
    let outcome = view.sync(&grown);

    assert!(matches!(outcome, RebuildOutcome::Rebuilt { restored: 1, placed: 1, .. }));
    assert_eq!(view.position("n1"), Some(Position::new(10.0, 20.0)));

    let n2 = view.position("n2").unwrap();
    assert!(n2.is_finite());
    assert_ne!(n2, Position::new(10.0, 20.0));
}

#[test]
fn rebuild_snapshots_before_destroying() {
    let (surface, calls) = RecordingSurface::new();
    let (mut view, _events) = ViewStateManager::with_surface(Box::new(surface));

    view.sync(&Network::new(vec![node("a")], vec![]));
    calls.lock().unwrap().clear();

    view.sync(&Network::new(vec![node("a"), node("b")], vec![]));

    let calls = calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            "positions",
            "destroy",
            "build 2",
            "place a anchored=true",
            "physics true",
            "stabilize",
            "positions",
            "physics false",
        ]
    );
}

#[test]
fn reset_view_frees_every_node() {
    let (surface, calls) = RecordingSurface::new();
    let (mut view, _events) = ViewStateManager::with_surface(Box::new(surface));
    view.sync(&seed_network());
    calls.lock().unwrap().clear();

    assert!(view.reset_view().is_some());

    let calls = calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec!["release", "physics true", "stabilize", "physics false", "fit", "positions"]
    );
}

#[test]
fn update_requests_carry_the_record() {
    let (mut view, mut events) =
        ViewStateManager::with_surface(Box::new(ForceLayout::new(ViewConfig::default())));
    view.sync(&seed_network());

    let edited = node("water_quality").with_states(["Poor", "Fair", "Good"]);
    view.request_node_update(edited.clone());
    view.click_edge("e1").unwrap();

    assert_eq!(
        events.try_recv().unwrap(),
        ViewEvent::NodeUpdateRequested { node: edited }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        ViewEvent::EdgeClicked { id: "e1".to_string() }
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_surviving_nodes_keep_positions(kept in 1usize..5, added in 0usize..4) {
        let (mut view, _events) =
            ViewStateManager::with_surface(Box::new(ForceLayout::new(ViewConfig::default())));

        let first: Vec<Node> = (0..kept).map(|i| node(&format!("k{i}"))).collect();
        view.sync(&Network::new(first.clone(), vec![]));
        let before = view.positions().clone();

        let mut grown = first;
        grown.extend((0..added).map(|i| node(&format!("a{i}"))));
        let edges = (0..added)
            .map(|i| Edge::new(format!("e{i}"), "k0", format!("a{i}")))
            .collect();
        view.sync(&Network::new(grown, edges));

        for (id, position) in before {
            prop_assert_eq!(view.position(&id), Some(position));
        }
        for i in 0..added {
            let id = format!("a{i}");
            let placed = view.position(&id).is_some_and(Position::is_finite);
            prop_assert!(placed, "{} was not placed", id);
        }
    }
}
