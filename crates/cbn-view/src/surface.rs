//! Rendering surface abstraction
//!
//! A surface owns one drawn graph instance at a time. The view manager
//! drives it through the rebuild protocol; the surface itself keeps no
//! memory across `destroy`/`build`.

use crate::types::{Position, ViewEdge, ViewNode, Viewport};
use std::collections::BTreeMap;

/// Result of a stabilization run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stabilization {
    /// Iterations performed
    pub iterations: usize,
    /// Whether movement fell below the threshold before the cap
    pub converged: bool,
}

/// Something that can draw and lay out a graph
pub trait GraphSurface: Send {
    /// Construct a fresh instance from the given elements
    fn build(&mut self, nodes: &[ViewNode], edges: &[ViewEdge]);

    /// Tear down the current instance
    fn destroy(&mut self);

    /// Check if an instance is live
    fn is_built(&self) -> bool;

    /// Current position of every node
    fn positions(&self) -> BTreeMap<String, Position>;

    /// Move a node; anchored nodes stay put during stabilization
    ///
    /// Returns `false` for an unknown id.
    fn place(&mut self, id: &str, position: Position, anchored: bool) -> bool;

    /// Free every anchored node
    fn release_anchors(&mut self);

    /// Toggle continuous physics
    fn set_physics(&mut self, enabled: bool);

    /// Check if physics is on
    fn physics_enabled(&self) -> bool;

    /// Run the simulation to convergence (no-op with physics off)
    fn stabilize(&mut self) -> Stabilization;

    /// Fit the viewport around every node
    fn fit(&mut self) -> Viewport;
}
