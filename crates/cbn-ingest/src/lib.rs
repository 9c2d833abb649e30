//! CBN Ingest - turning untrusted agent replies into network updates
//!
//! Agent replies arrive as free text that usually, but not always, holds a
//! JSON object shaped like:
//!
//! ```json
//! {
//!   "updated_network": { "nodes": [], "edges": [], "cpds": {} },
//!   "tentative_suggestions": [],
//!   "reflection_prompts": [],
//!   "subclaims": []
//! }
//! ```
//!
//! The pipeline:
//! - Strips code fences
//! - Parses directly, else scans for the first balanced object (prose
//!   before it is kept as a preamble)
//! - Validates the wrapper and normalises the network
//! - Falls back to the previous network on any failure
//!
//! # Example
//!
//! ```rust
//! use cbn_ingest::{ingest, FALLBACK_SUGGESTION};
//! use cbn_model::seed_network;
//!
//! let seed = seed_network();
//! let result = ingest("not json at all", &seed);
//!
//! assert_eq!(result.updated_network, seed);
//! assert_eq!(result.tentative_suggestions, vec![FALLBACK_SUGGESTION]);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod extract;
pub mod pipeline;
pub mod schema;

pub use error::{IngestError, TransportError};
pub use pipeline::{
    ingest, Disposition, IngestOutcome, IngestResult, Pipeline, PipelineConfig,
    FALLBACK_SUGGESTION, RETRY_PROMPT,
};
pub use schema::ValidatedReply;
