//! Session state
//!
//! Everything one conversation owns: the current network, the narrated
//! conversation and the view manager. The orchestrator holds exactly one
//! [`Session`] behind a lock.

use cbn_model::{ConversationEntry, Network};
use cbn_view::ViewStateManager;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique session identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One conversation's state
#[derive(Debug)]
pub struct Session {
    /// Session id
    pub id: SessionId,
    /// Current network (swapped wholesale)
    pub network: Network,
    /// Narrated conversation, oldest first
    pub conversation: Vec<ConversationEntry>,
    /// View state
    pub view: ViewStateManager,
}

impl Session {
    /// Create session over a starting network
    #[must_use]
    pub fn new(network: Network, view: ViewStateManager) -> Self {
        Self {
            id: SessionId::new(),
            network,
            conversation: Vec::new(),
            view,
        }
    }

    /// Append an entry
    pub fn push(&mut self, entry: ConversationEntry) {
        self.conversation.push(entry);
    }

    /// Append several entries, returning how many
    pub fn extend<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = ConversationEntry>,
    {
        let before = self.conversation.len();
        self.conversation.extend(entries);
        self.conversation.len() - before
    }

    /// Swap in a new network and bring the view along
    pub fn replace_network(&mut self, network: Network) {
        self.network = network;
        self.view.sync(&self.network);
    }
}
