//! Testing utilities for the CBN workspace
//!
//! Shared fixtures and scripted agents.

#![allow(missing_docs)]

use async_trait::async_trait;
use cbn_core::{AgentClient, AgentRequest, TransportError};
use cbn_model::{seed_network, Category, Edge, Network, Node};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::{oneshot, watch};

pub fn node(id: &str, name: &str) -> Node {
    Node::new(id, name, Category::Environmental)
}

pub fn edge(id: &str, from: &str, to: &str) -> Edge {
    Edge::new(id, from, to)
}

/// `a -> b -> c`
pub fn chain_network() -> Network {
    Network::new(
        vec![node("a", "Rain"), node("b", "Runoff"), node("c", "Turbidity")],
        vec![edge("e1", "a", "b"), edge("e2", "b", "c")],
    )
}

/// Seed network plus a rainfall node feeding water quality
pub fn seed_with_rainfall() -> Network {
    let mut network = seed_network();
    network.nodes.push(
        node("rainfall", "Rainfall")
            .with_states(["Low", "High"])
            .with_description("Seasonal rainfall over the catchment"),
    );
    network
        .edges
        .push(edge("rainfall->water_quality", "rainfall", "water_quality"));
    network
}

/// Well-formed reply carrying `network`
pub fn reply_json(network: &Network) -> String {
    json!({
        "updated_network": network,
        "tentative_suggestions": ["Consider linking rainfall to runoff"],
        "reflection_prompts": ["Is rainfall seasonal here?"],
        "subclaims": [],
    })
    .to_string()
}

/// Well-formed reply that leaves the network alone
pub fn no_update_reply(suggestion: &str) -> String {
    json!({
        "updated_network": null,
        "tentative_suggestions": [suggestion],
    })
    .to_string()
}

/// Answers from a fixed script, recording every request
#[derive(Debug, Default)]
pub struct ScriptedAgent {
    replies: Mutex<VecDeque<Result<String, TransportError>>>,
    requests: Mutex<Vec<AgentRequest>>,
}

impl ScriptedAgent {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, TransportError>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|text| Ok(text.into())))
    }

    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentClient for ScriptedAgent {
    async fn complete(&self, request: AgentRequest) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(TransportError::EmptyReply))
    }
}

/// Releases a held reply
#[derive(Debug)]
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    pub fn open(self) {
        let _ = self.0.send(());
    }
}

/// Replies in call order; gated replies wait until their [`Gate`] opens
#[derive(Debug)]
pub struct GatedAgent {
    script: Mutex<VecDeque<(String, Option<oneshot::Receiver<()>>)>>,
    calls: watch::Sender<usize>,
}

impl Default for GatedAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl GatedAgent {
    pub fn new() -> Self {
        let (calls, _) = watch::channel(0);
        Self {
            script: Mutex::new(VecDeque::new()),
            calls,
        }
    }

    /// Queue a reply held until the returned gate opens
    pub fn push_gated(&self, reply: impl Into<String>) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.script
            .lock()
            .unwrap()
            .push_back((reply.into(), Some(rx)));
        Gate(tx)
    }

    /// Queue a reply returned immediately
    pub fn push_ready(&self, reply: impl Into<String>) {
        self.script.lock().unwrap().push_back((reply.into(), None));
    }

    /// Wait until at least `n` calls have started
    pub async fn wait_for_calls(&self, n: usize) {
        let mut calls = self.calls.subscribe();
        let _ = calls.wait_for(|count| *count >= n).await;
    }
}

#[async_trait]
impl AgentClient for GatedAgent {
    async fn complete(&self, _request: AgentRequest) -> Result<String, TransportError> {
        let next = self.script.lock().unwrap().pop_front();
        self.calls.send_modify(|count| *count += 1);

        let Some((reply, gate)) = next else {
            return Err(TransportError::EmptyReply);
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(reply)
    }
}

/// Panics on every call
#[derive(Debug, Default)]
pub struct PanickingAgent;

#[async_trait]
impl AgentClient for PanickingAgent {
    async fn complete(&self, _request: AgentRequest) -> Result<String, TransportError> {
        panic!("agent exploded")
    }
}
