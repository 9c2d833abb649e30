//! Request construction for turns and interpretations

use crate::agent::AgentRequest;
use crate::config::AgentConfig;
use crate::error::TransportError;
use cbn_model::Network;

/// System instruction for network-editing turns
pub const BUILDER_INSTRUCTION: &str =
    "You are an AI assistant that helps build Causal Bayesian Networks. Always respond with valid JSON.";

/// System instruction for interpretations
pub const INTERPRETER_INSTRUCTION: &str =
    "You are an AI assistant that interprets Causal Bayesian Networks.";

/// First message of every session
pub const WELCOME_MESSAGE: &str = "Welcome to the Causal Bayesian Network Builder!

We're starting with a simple scenario about marine ecosystem restoration and carbon sequestration.

You can:
- Add new factors
- Modify relationships
- Update probabilities
- Ask questions about the model

What would you like to explore?";

const REPLY_SHAPE: &str = r#"{
  "updated_network": {
    "nodes": [{"id": "...", "name": "...", "category": "...", "states": ["..."], "probabilities": {"state": 0.5}, "description": "..."}],
    "edges": [{"id": "...", "from": "<node id>", "to": "<node id>", "probability": 0.5}],
    "cpds": {"<node id>": {"parents": ["<node id>"], "probabilities": {"<parent states>": [0.5, 0.5]}}}
  },
  "tentative_suggestions": ["..."],
  "reflection_prompts": ["..."],
  "subclaims": ["..."]
}"#;

fn encode(network: &Network) -> Result<String, TransportError> {
    network
        .to_json_pretty()
        .map_err(|e| TransportError::Encode(e.to_string()))
}

/// Request for one conversational turn
///
/// # Errors
///
/// [`TransportError::Encode`] if the network cannot be serialized.
pub fn turn_request(
    network: &Network,
    user_text: &str,
    config: &AgentConfig,
) -> Result<AgentRequest, TransportError> {
    let current = encode(network)?;
    let prompt = format!(
        "You help domain experts build a Causal Bayesian Network.\n\
         The current network is:\n{current}\n\n\
         The user says: \"{user_text}\"\n\n\
         Apply what the user says to the network, then:\n\
         1. Return the complete updated network, keeping existing ids stable.\n\
         2. Offer tentative suggestions for relationships that look incomplete.\n\
         3. Ask reflection prompts that check completeness and consistency.\n\
         4. Split complex claims into subclaims.\n\n\
         Reply with one JSON object of this shape, with no comments:\n{REPLY_SHAPE}\n\n\
         Leave \"updated_network\" null if nothing about the network should change."
    );

    Ok(AgentRequest {
        system: BUILDER_INSTRUCTION.to_string(),
        prompt,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    })
}

/// Request for a brief plain-language interpretation
///
/// # Errors
///
/// [`TransportError::Encode`] if the network cannot be serialized.
pub fn interpretation_request(
    network: &Network,
    config: &AgentConfig,
) -> Result<AgentRequest, TransportError> {
    let current = encode(network)?;
    let prompt = format!(
        "Given this Causal Bayesian Network:\n{current}\n\n\
         Briefly interpret it. Explain how the variables relate and what the \
         structure suggests. Keep it concise and clear."
    );

    Ok(AgentRequest {
        system: INTERPRETER_INSTRUCTION.to_string(),
        prompt,
        temperature: config.temperature,
        max_tokens: config.interpretation_max_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbn_model::seed_network;

    #[test]
    fn turn_request_embeds_network_and_text() {
        let request =
            turn_request(&seed_network(), "Add rainfall", &AgentConfig::default()).unwrap();
        assert!(request.prompt.contains("\"id\": \"water_quality\""));
        assert!(request.prompt.contains("The user says: \"Add rainfall\""));
        assert!(request
            .prompt
            .contains("Apply what the user says to the network, then:\n1. Return the complete"));
        assert!(request.prompt.contains("\"updated_network\""));
        assert_eq!(request.max_tokens, 2500);
        assert_eq!(request.system, BUILDER_INSTRUCTION);
    }

    #[test]
    fn interpretation_uses_smaller_budget() {
        let request = interpretation_request(&seed_network(), &AgentConfig::default()).unwrap();
        assert_eq!(request.max_tokens, 150);
        assert_eq!(request.system, INTERPRETER_INSTRUCTION);
    }
}
