//! CBN View - graph view state independent of the domain model
//!
//! Keeps the drawn graph stable across model replacements:
//! - [`ViewStateManager`] remembers node positions and drives rebuilds
//! - [`GraphSurface`] abstracts the rendering surface
//! - [`ForceLayout`] is the built-in deterministic force-directed surface
//!
//! Interaction (clicks, edit requests) is announced as [`ViewEvent`]s on a
//! `tokio` channel; the receiver decides what they mean.
//!
//! # Example
//!
//! ```rust
//! use cbn_model::seed_network;
//! use cbn_view::{ForceLayout, RebuildOutcome, ViewConfig, ViewStateManager};
//!
//! let (mut view, _events) =
//!     ViewStateManager::with_surface(Box::new(ForceLayout::new(ViewConfig::default())));
//!
//! let seed = seed_network();
//! assert!(matches!(view.sync(&seed), RebuildOutcome::Rebuilt { .. }));
//! assert_eq!(view.sync(&seed), RebuildOutcome::Unchanged);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod layout;
pub mod manager;
pub mod surface;
pub mod types;

pub use error::ViewError;
pub use layout::{ForceLayout, ViewConfig};
pub use manager::{RebuildOutcome, Selection, ViewEvent, ViewStateManager};
pub use surface::{GraphSurface, Stabilization};
pub use types::{view_elements, Position, ViewEdge, ViewNode, Viewport};
