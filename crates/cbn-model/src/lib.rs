//! CBN Model - causal Bayesian network domain types
//!
//! The data shapes every other crate in the workspace agrees on:
//! - [`Node`], [`Edge`] and [`Cpd`] records
//! - [`Network`], the whole-graph snapshot with its structural invariants
//! - [`ConversationEntry`], the outward-facing chat record
//! - The fixed [`seed_network`] a session boots from
//!
//! Networks are never patched field by field. A session holds one
//! [`Network`] and swaps it wholesale when a validated update arrives.
//!
//! # Example
//!
//! ```rust
//! use cbn_model::{seed_network, Network};
//!
//! let seed = seed_network();
//! assert!(seed.validate().is_ok());
//!
//! let json = seed.to_json_pretty().unwrap();
//! let parsed = Network::from_json(&json).unwrap();
//! assert_eq!(parsed, seed);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod conversation;
pub mod error;
pub mod mermaid;
pub mod network;
pub mod seed;
pub mod types;

pub use conversation::{ConversationEntry, EntryKind, EntryMetadata, Sender};
pub use error::ModelError;
pub use network::Network;
pub use seed::seed_network;
pub use types::{Category, Cpd, Edge, EdgeProbability, Node};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
