//! View error types

/// Interaction with something not on the canvas
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// No drawn node with this id
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// No drawn edge with this id
    #[error("unknown edge: {0}")]
    UnknownEdge(String),
}
