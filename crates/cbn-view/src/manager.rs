//! View state manager
//!
//! Owns spatial and selection state for the drawn graph, independent of
//! the domain model. Positions survive rebuilds: before a surface instance
//! is torn down its positions are snapshotted, and every node still present
//! afterwards is put back where it was.
//!
//! With no surface attached, operations are no-ops and the latest network
//! is remembered until one is.

use crate::error::ViewError;
use crate::surface::GraphSurface;
use crate::types::{view_elements, Position, ViewEdge, ViewNode, Viewport};
use cbn_model::{Edge, Network, Node};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Current selection (presentation only)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Selection {
    /// Nothing selected
    #[default]
    None,
    /// A node id
    Node(String),
    /// An edge id
    Edge(String),
}

/// Emitted on user interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ViewEvent {
    /// A node was clicked
    NodeClicked {
        /// Node id
        id: String,
    },
    /// An edge was clicked
    EdgeClicked {
        /// Edge id
        id: String,
    },
    /// The user submitted an edited node
    NodeUpdateRequested {
        /// Proposed node
        node: Node,
    },
    /// The user submitted an edited edge
    EdgeUpdateRequested {
        /// Proposed edge
        edge: Edge,
    },
}

/// What a sync did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Surface instance was rebuilt
    Rebuilt {
        /// Nodes put back at a known position
        restored: usize,
        /// Nodes placed by the layout solver
        placed: usize,
        /// Stabilization iterations
        iterations: usize,
    },
    /// Elements were structurally identical
    Unchanged,
    /// No surface attached; remembered for later
    Deferred,
}

/// Spatial and selection state for one graph view
pub struct ViewStateManager {
    surface: Option<Box<dyn GraphSurface>>,
    positions: BTreeMap<String, Position>,
    nodes: Vec<ViewNode>,
    edges: Vec<ViewEdge>,
    pending: bool,
    selection: Selection,
    events: mpsc::UnboundedSender<ViewEvent>,
}

impl std::fmt::Debug for ViewStateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewStateManager")
            .field("attached", &self.surface.is_some())
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("pending", &self.pending)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl ViewStateManager {
    /// Create a detached manager and its event receiver
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ViewEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = Self {
            surface: None,
            positions: BTreeMap::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            pending: false,
            selection: Selection::None,
            events: tx,
        };
        (manager, rx)
    }

    /// Create with a surface already attached
    #[must_use]
    pub fn with_surface(surface: Box<dyn GraphSurface>) -> (Self, mpsc::UnboundedReceiver<ViewEvent>) {
        let (mut manager, rx) = Self::new();
        manager.surface = Some(surface);
        (manager, rx)
    }

    /// Check if a surface is attached
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    /// Attach a surface, replaying any deferred rebuild
    pub fn attach_surface(&mut self, surface: Box<dyn GraphSurface>) -> RebuildOutcome {
        self.surface = Some(surface);
        if self.pending || !self.nodes.is_empty() {
            self.rebuild()
        } else {
            RebuildOutcome::Unchanged
        }
    }

    /// Detach the surface, keeping its last positions
    pub fn detach_surface(&mut self) -> Option<Box<dyn GraphSurface>> {
        let mut surface = self.surface.take()?;
        if surface.is_built() {
            self.positions.extend(surface.positions());
            surface.destroy();
        }
        self.selection = Selection::None;
        Some(surface)
    }

    /// Bring the view in line with `network`
    ///
    /// Rebuilds only when the drawn node or edge collections changed.
    pub fn sync(&mut self, network: &Network) -> RebuildOutcome {
        let (nodes, edges) = view_elements(network);
        let built = self.surface.as_ref().is_some_and(|s| s.is_built());

        if built && !self.pending && nodes == self.nodes && edges == self.edges {
            return RebuildOutcome::Unchanged;
        }

        self.nodes = nodes;
        self.edges = edges;

        if self.surface.is_none() {
            self.pending = true;
            debug!(nodes = self.nodes.len(), "no surface attached, deferring rebuild");
            return RebuildOutcome::Deferred;
        }
        self.rebuild()
    }

    fn rebuild(&mut self) -> RebuildOutcome {
        let Some(surface) = self.surface.as_mut() else {
            self.pending = true;
            return RebuildOutcome::Deferred;
        };

        if surface.is_built() {
            self.positions.extend(surface.positions());
            surface.destroy();
        }

        surface.build(&self.nodes, &self.edges);

        let mut restored = 0;
        for node in &self.nodes {
            if let Some(position) = self.positions.get(&node.id) {
                if surface.place(&node.id, *position, true) {
                    restored += 1;
                }
            }
        }
        let placed = self.nodes.len() - restored;

        surface.set_physics(true);
        let stabilization = surface.stabilize();
        self.pending = false;
        self.on_stabilized();

        if let Selection::Node(id) | Selection::Edge(id) = &self.selection {
            let present = self.nodes.iter().any(|n| &n.id == id) || self.edges.iter().any(|e| &e.id == id);
            if !present {
                self.selection = Selection::None;
            }
        }

        info!(
            restored,
            placed,
            iterations = stabilization.iterations,
            converged = stabilization.converged,
            "graph view rebuilt"
        );
        RebuildOutcome::Rebuilt {
            restored,
            placed,
            iterations: stabilization.iterations,
        }
    }

    /// Capture positions and stop continuous physics
    pub fn on_stabilized(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        self.positions = surface.positions();
        surface.set_physics(false);
    }

    /// Record a node dragged to a new spot
    ///
    /// # Errors
    ///
    /// [`ViewError::UnknownNode`] if the node is not drawn.
    pub fn on_drag_end(&mut self, id: &str, position: Position) -> Result<(), ViewError> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };
        if !surface.place(id, position, false) {
            return Err(ViewError::UnknownNode(id.to_string()));
        }
        self.positions.insert(id.to_string(), position);
        Ok(())
    }

    /// Re-layout every node from scratch and fit the viewport
    ///
    /// Returns `None` without a surface.
    pub fn reset_view(&mut self) -> Option<Viewport> {
        let surface = self.surface.as_mut()?;
        surface.release_anchors();
        surface.set_physics(true);
        let stabilization = surface.stabilize();
        surface.set_physics(false);
        let viewport = surface.fit();
        self.positions = surface.positions();
        debug!(iterations = stabilization.iterations, "view reset");
        Some(viewport)
    }

    /// Last captured positions
    #[must_use]
    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    /// Last captured position of one node
    #[must_use]
    pub fn position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    /// Drawn nodes
    #[must_use]
    pub fn nodes(&self) -> &[ViewNode] {
        &self.nodes
    }

    /// Drawn edges
    #[must_use]
    pub fn edges(&self) -> &[ViewEdge] {
        &self.edges
    }

    /// Current selection
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Clear the selection
    pub fn clear_selection(&mut self) {
        self.selection = Selection::None;
    }

    /// Select a node and announce the click
    ///
    /// # Errors
    ///
    /// [`ViewError::UnknownNode`] if the node is not drawn.
    pub fn click_node(&mut self, id: &str) -> Result<(), ViewError> {
        if self.surface.is_none() {
            return Ok(());
        }
        if !self.nodes.iter().any(|n| n.id == id) {
            return Err(ViewError::UnknownNode(id.to_string()));
        }
        self.selection = Selection::Node(id.to_string());
        self.emit(ViewEvent::NodeClicked { id: id.to_string() });
        Ok(())
    }

    /// Select an edge and announce the click
    ///
    /// # Errors
    ///
    /// [`ViewError::UnknownEdge`] if the edge is not drawn.
    pub fn click_edge(&mut self, id: &str) -> Result<(), ViewError> {
        if self.surface.is_none() {
            return Ok(());
        }
        if !self.edges.iter().any(|e| e.id == id) {
            return Err(ViewError::UnknownEdge(id.to_string()));
        }
        self.selection = Selection::Edge(id.to_string());
        self.emit(ViewEvent::EdgeClicked { id: id.to_string() });
        Ok(())
    }

    /// Announce an edited node
    pub fn request_node_update(&mut self, node: Node) {
        if self.surface.is_some() {
            self.emit(ViewEvent::NodeUpdateRequested { node });
        }
    }

    /// Announce an edited edge
    pub fn request_edge_update(&mut self, edge: Edge) {
        if self.surface.is_some() {
            self.emit(ViewEvent::EdgeUpdateRequested { edge });
        }
    }

    fn emit(&self, event: ViewEvent) {
        if self.events.send(event).is_err() {
            debug!("view event receiver dropped");
        }
    }
}
