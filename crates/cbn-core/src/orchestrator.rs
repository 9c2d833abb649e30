//! Conversation orchestrator
//!
//! Sequences one turn:
//! 1. Append the user's text and mark the session busy
//! 2. Call the agent with the current network (no lock held)
//! 3. Ingest the reply against that network
//! 4. Diff, swap the network, sync the view and narrate (under the lock)
//!
//! Turns carry increasing ids. Only the latest turn may apply its result;
//! an older call that resolves late is discarded as superseded. A panic
//! inside the call or ingestion is caught and narrated as an apology.

use crate::agent::{AgentClient, HttpAgentClient};
use crate::config::AppConfig;
use crate::error::OrchestratorError;
use crate::narration::{self, APOLOGY, INTERPRETATION_FAILED};
use crate::prompt::{self, WELCOME_MESSAGE};
use crate::session::{Session, SessionId};
use cbn_diff::{diff_with_policy, NetworkDiff};
use cbn_ingest::{Disposition, IngestResult, Pipeline};
use cbn_model::{seed_network, ConversationEntry, Edge, EntryKind, EntryMetadata, Network, Node};
use cbn_view::{ForceLayout, Position, ViewError, ViewEvent, ViewStateManager, Viewport};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

/// Summary of an applied turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    /// Turn id
    pub turn: u64,
    /// Changes relative to the network before the turn
    pub changes: NetworkDiff,
    /// How the reply was treated
    pub disposition: Disposition,
    /// Conversation entries narrated for this turn
    pub entries_added: usize,
}

/// How a submitted turn ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Result applied to the session
    Applied(TurnReport),
    /// A newer turn started first; result discarded
    Superseded {
        /// Turn id
        turn: u64,
    },
    /// Call or ingestion panicked; apology narrated
    Failed {
        /// Turn id
        turn: u64,
    },
    /// Blank input; nothing sent
    Ignored,
}

impl TurnOutcome {
    /// Check if the turn's result reached the session
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// Check if the turn was superseded
    #[inline]
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }
}

/// Owns one session and sequences its turns
pub struct Orchestrator {
    agent: Arc<dyn AgentClient>,
    pipeline: Pipeline,
    config: AppConfig,
    session: Mutex<Session>,
    view_events: Mutex<mpsc::UnboundedReceiver<ViewEvent>>,
    latest_turn: AtomicU64,
    busy: watch::Sender<bool>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("latest_turn", &self.latest_turn.load(Ordering::SeqCst))
            .field("busy", &*self.busy.borrow())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create over the seed network
    #[must_use]
    pub fn new(agent: Arc<dyn AgentClient>, config: AppConfig) -> Self {
        Self::with_network(agent, config, seed_network())
    }

    /// Create over an explicit starting network
    #[must_use]
    pub fn with_network(agent: Arc<dyn AgentClient>, config: AppConfig, network: Network) -> Self {
        let (view, view_events) =
            ViewStateManager::with_surface(Box::new(ForceLayout::new(config.view.clone())));

        let mut session = Session::new(network, view);
        session.view.sync(&session.network);
        session.push(ConversationEntry::bot(WELCOME_MESSAGE));
        info!(session = %session.id, nodes = session.network.node_count(), "session started");

        let (busy, _) = watch::channel(false);
        Self {
            agent,
            pipeline: Pipeline::with_config(config.pipeline),
            config,
            session: Mutex::new(session),
            view_events: Mutex::new(view_events),
            latest_turn: AtomicU64::new(0),
            busy,
        }
    }

    /// Create with the HTTP agent described by `config`
    ///
    /// # Errors
    ///
    /// [`OrchestratorError`] if the agent client cannot be built.
    pub fn from_config(config: AppConfig) -> Result<Self, OrchestratorError> {
        let agent = HttpAgentClient::new(&config.agent)?;
        Ok(Self::new(Arc::new(agent), config))
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run one conversational turn
    pub async fn submit(&self, text: &str) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() {
            return TurnOutcome::Ignored;
        }

        let (turn, previous, busy) = {
            let mut session = self.session.lock().await;
            let turn = self.latest_turn.fetch_add(1, Ordering::SeqCst) + 1;
            session.push(ConversationEntry::user(text));
            let busy = BusyGuard::raise(&self.busy, &self.latest_turn, turn);
            (turn, session.network.clone(), busy)
        };
        info!(turn, chars = text.len(), "turn started");

        let agent = Arc::clone(&self.agent);
        let pipeline = self.pipeline.clone();
        let request = prompt::turn_request(&previous, text, &self.config.agent);
        let work = async move {
            let reply = match request {
                Ok(request) => agent.complete(request).await,
                Err(err) => Err(err),
            };
            pipeline.ingest_reply(reply, &previous)
        };
        let result = AssertUnwindSafe(work).catch_unwind().await;

        let mut guard = self.session.lock().await;
        if self.latest_turn.load(Ordering::SeqCst) != turn {
            warn!(turn, "turn superseded by a newer one, discarding result");
            return TurnOutcome::Superseded { turn };
        }

        let outcome = match result {
            Ok(ingested) => self.apply(&mut guard, turn, ingested),
            Err(payload) => {
                error!(turn, panic = %panic_message(payload.as_ref()), "turn panicked");
                guard.push(ConversationEntry::bot(APOLOGY).with_kind(EntryKind::Error));
                TurnOutcome::Failed { turn }
            }
        };
        // lower the flag before another turn can take the lock
        drop(busy);
        drop(guard);
        outcome
    }

    fn apply(&self, session: &mut Session, turn: u64, result: IngestResult) -> TurnOutcome {
        let changes = diff_with_policy(
            &session.network,
            &result.updated_network,
            self.config.diff_policy(),
        );

        let new_loops = if result.is_replaced() && self.config.narration.announce_feedback_loops {
            narration::new_feedback_loops(&session.network, &result.updated_network)
        } else {
            Vec::new()
        };

        if result.is_replaced() {
            session.replace_network(result.updated_network.clone());
        }

        let entries = narration::narrate_turn(&changes, &result, &new_loops, &session.network);
        let entries_added = session.extend(entries);

        info!(
            turn,
            disposition = ?result.disposition,
            changes = changes.len(),
            entries_added,
            "turn applied"
        );
        TurnOutcome::Applied(TurnReport {
            turn,
            changes,
            disposition: result.disposition,
            entries_added,
        })
    }

    /// Ask the agent to interpret the current network
    ///
    /// Narrates and returns the interpretation, or the fixed failure text.
    pub async fn interpret(&self) -> ConversationEntry {
        let network = self.session.lock().await.network.clone();

        let agent = Arc::clone(&self.agent);
        let request = prompt::interpretation_request(&network, &self.config.agent);
        let work = async move {
            match request {
                Ok(request) => agent.complete(request).await,
                Err(err) => Err(err),
            }
        };

        let entry = match AssertUnwindSafe(work).catch_unwind().await {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                ConversationEntry::bot(text.trim()).with_kind(EntryKind::Analysis)
            }
            Ok(Ok(_)) => {
                warn!("interpretation reply was empty");
                ConversationEntry::bot(INTERPRETATION_FAILED).with_kind(EntryKind::Error)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "interpretation failed");
                ConversationEntry::bot(INTERPRETATION_FAILED).with_kind(EntryKind::Error)
            }
            Err(payload) => {
                error!(panic = %panic_message(payload.as_ref()), "interpretation panicked");
                ConversationEntry::bot(INTERPRETATION_FAILED).with_kind(EntryKind::Error)
            }
        };

        self.session.lock().await.push(entry.clone());
        entry
    }

    /// Narrate one view event
    ///
    /// Clicks narrate the clicked element; update requests are recorded as
    /// questions. Returns `None` for elements no longer in the network.
    pub async fn handle_view_event(&self, event: ViewEvent) -> Option<ConversationEntry> {
        let mut session = self.session.lock().await;
        let entry = match &event {
            ViewEvent::NodeClicked { id } => narration::describe_node(&session.network, id),
            ViewEvent::EdgeClicked { id } => narration::describe_edge(&session.network, id),
            ViewEvent::NodeUpdateRequested { node } => Some(
                ConversationEntry::bot(format!(
                    "Update requested for node {}. Describe the change to apply it.",
                    node.name
                ))
                .with_kind(EntryKind::Question)
                .with_metadata(EntryMetadata::for_node(node.id.clone())),
            ),
            ViewEvent::EdgeUpdateRequested { edge } => Some(
                ConversationEntry::bot(format!(
                    "Update requested for edge {} -> {}. Describe the change to apply it.",
                    session.network.display_name(&edge.from),
                    session.network.display_name(&edge.to)
                ))
                .with_kind(EntryKind::Question)
                .with_metadata(EntryMetadata::for_edge(edge.id.clone())),
            ),
        };

        match &entry {
            Some(entry) => session.push(entry.clone()),
            None => debug!(?event, "view event for unknown element ignored"),
        }
        entry
    }

    /// Drain pending view events and narrate each
    pub async fn process_view_events(&self) -> Vec<ConversationEntry> {
        let events: Vec<ViewEvent> = {
            let mut receiver = self.view_events.lock().await;
            std::iter::from_fn(|| receiver.try_recv().ok()).collect()
        };

        let mut entries = Vec::with_capacity(events.len());
        for event in events {
            if let Some(entry) = self.handle_view_event(event).await {
                entries.push(entry);
            }
        }
        entries
    }

    /// Click a node on the view
    ///
    /// # Errors
    ///
    /// [`ViewError::UnknownNode`] if the node is not drawn.
    pub async fn click_node(&self, id: &str) -> Result<(), ViewError> {
        self.session.lock().await.view.click_node(id)
    }

    /// Click an edge on the view
    ///
    /// # Errors
    ///
    /// [`ViewError::UnknownEdge`] if the edge is not drawn.
    pub async fn click_edge(&self, id: &str) -> Result<(), ViewError> {
        self.session.lock().await.view.click_edge(id)
    }

    /// Submit an edited node from the view
    pub async fn request_node_update(&self, node: Node) {
        self.session.lock().await.view.request_node_update(node);
    }

    /// Submit an edited edge from the view
    pub async fn request_edge_update(&self, edge: Edge) {
        self.session.lock().await.view.request_edge_update(edge);
    }

    /// Re-layout the view from scratch
    pub async fn reset_view(&self) -> Option<Viewport> {
        self.session.lock().await.view.reset_view()
    }

    /// Last captured node positions
    pub async fn positions(&self) -> BTreeMap<String, Position> {
        self.session.lock().await.view.positions().clone()
    }

    /// Current network
    pub async fn network(&self) -> Network {
        self.session.lock().await.network.clone()
    }

    /// Full conversation
    pub async fn conversation(&self) -> Vec<ConversationEntry> {
        self.session.lock().await.conversation.clone()
    }

    /// Session id
    pub async fn session_id(&self) -> SessionId {
        self.session.lock().await.id
    }

    /// Check if the latest turn is outstanding
    #[must_use]
    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    /// Watch busy transitions
    #[must_use]
    pub fn busy_watch(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }

    /// Id of the most recently started turn
    #[must_use]
    pub fn latest_turn(&self) -> u64 {
        self.latest_turn.load(Ordering::SeqCst)
    }
}

/// Lowers the busy flag when a turn ends, including when its future is
/// dropped mid-flight. A superseded turn leaves the flag to the newer one.
struct BusyGuard<'a> {
    busy: &'a watch::Sender<bool>,
    latest: &'a AtomicU64,
    turn: u64,
}

impl<'a> BusyGuard<'a> {
    fn raise(busy: &'a watch::Sender<bool>, latest: &'a AtomicU64, turn: u64) -> Self {
        busy.send_replace(true);
        Self { busy, latest, turn }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if self.latest.load(Ordering::SeqCst) == self.turn {
            self.busy.send_replace(false);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}
