//! CBN Core - conversation orchestrator
//!
//! Glue between the user, the agent and the graph view:
//! - Builds requests from the current network and the user's text
//! - Calls the agent without holding session state
//! - Ingests, diffs and swaps the network for the latest turn only
//! - Narrates every outcome into the conversation
//! - Narrates clicks and update requests coming from the view
//!
//! # Example
//!
//! ```rust,ignore
//! use cbn_core::{AppConfig, Orchestrator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! let orchestrator = Orchestrator::from_config(config)?;
//!
//! let outcome = orchestrator.submit("Add rainfall as a driver of runoff").await;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod agent;
pub mod config;
pub mod error;
pub mod narration;
pub mod orchestrator;
pub mod prompt;
pub mod session;

pub use agent::{AgentClient, AgentRequest, HttpAgentClient};
pub use config::{AgentConfig, AppConfig, NarrationConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use error::{ConfigError, OrchestratorError, TransportError};
pub use narration::{describe_edge, describe_node, new_feedback_loops, APOLOGY, INTERPRETATION_FAILED};
pub use orchestrator::{Orchestrator, TurnOutcome, TurnReport};
pub use prompt::{interpretation_request, turn_request, WELCOME_MESSAGE};
pub use session::{Session, SessionId};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a session
    pub use crate::{AgentClient, AppConfig, Orchestrator, TurnOutcome, TurnReport};
    pub use cbn_model::{ConversationEntry, EntryKind, Network};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
