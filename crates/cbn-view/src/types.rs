//! Presentation records derived from the domain model

use cbn_model::{Edge, EdgeProbability, Network, Node};
use serde::{Deserialize, Serialize};

/// Canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal
    pub x: f64,
    /// Vertical
    pub y: f64,
}

impl Position {
    /// Create position
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance
    #[inline]
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Check both coordinates are finite
    #[inline]
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Visible region after a fit
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    /// Centre of the bounding box
    pub center: Position,
    /// Padded width
    pub width: f64,
    /// Padded height
    pub height: f64,
}

/// A node as drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewNode {
    /// Node id
    pub id: String,
    /// Label (display name)
    pub label: String,
    /// Colour group (category)
    pub group: String,
    /// Hover text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl From<&Node> for ViewNode {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            label: node.name.clone(),
            group: node.category.label().to_string(),
            title: node.description.clone(),
        }
    }
}

/// An edge as drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEdge {
    /// Edge id
    pub id: String,
    /// Parent node id
    pub from: String,
    /// Child node id
    pub to: String,
    /// Probability label, scalar edges only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl From<&Edge> for ViewEdge {
    fn from(edge: &Edge) -> Self {
        let label = match &edge.probability {
            Some(EdgeProbability::Scalar(p)) => Some(format!("{p}")),
            _ => None,
        };
        Self {
            id: edge.id.clone(),
            from: edge.from.clone(),
            to: edge.to.clone(),
            label,
        }
    }
}

/// Drawable elements for a network
#[must_use]
pub fn view_elements(network: &Network) -> (Vec<ViewNode>, Vec<ViewEdge>) {
    (
        network.nodes.iter().map(ViewNode::from).collect(),
        network.edges.iter().map(ViewEdge::from).collect(),
    )
}
