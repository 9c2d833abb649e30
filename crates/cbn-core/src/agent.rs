//! Agent exchange
//!
//! One request out, one text blob back. [`HttpAgentClient`] speaks the
//! OpenAI-compatible chat-completions protocol; tests substitute their own
//! [`AgentClient`].

use crate::config::AgentConfig;
use crate::error::{OrchestratorError, TransportError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Longest error body kept from a failed response
const MAX_ERROR_BODY: usize = 512;

/// One completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    /// System instruction
    pub system: String,
    /// User message
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Reply budget
    pub max_tokens: u32,
}

/// Something that answers completion requests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Send one request and return the reply text
    async fn complete(&self, request: AgentRequest) -> Result<String, TransportError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client over HTTPS
#[derive(Debug, Clone)]
pub struct HttpAgentClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl HttpAgentClient {
    /// Create from agent settings
    ///
    /// # Errors
    ///
    /// - [`OrchestratorError::MissingApiKey`] without a non-blank key
    /// - [`OrchestratorError::Client`] if the HTTP client cannot be built
    pub fn new(config: &AgentConfig) -> Result<Self, OrchestratorError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(OrchestratorError::MissingApiKey)?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OrchestratorError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Target endpoint
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Model identifier
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn complete(&self, request: AgentRequest) -> Result<String, TransportError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!(
            model = %self.model,
            prompt_bytes = request.prompt.len(),
            max_tokens = request.max_tokens,
            "sending agent request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    TransportError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_on_char_boundary(&mut body, MAX_ERROR_BODY);
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ChatResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Envelope(e.to_string()))?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(TransportError::EmptyReply)?;

        debug!(reply_bytes = content.len(), "agent replied");
        Ok(content)
    }
}

fn truncate_on_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_rejected() {
        let err = HttpAgentClient::new(&AgentConfig::default()).unwrap_err();
        assert!(err.is_missing_credentials());

        let blank = AgentConfig {
            api_key: Some("   ".to_string()),
            ..AgentConfig::default()
        };
        assert!(HttpAgentClient::new(&blank).is_err());
    }

    #[test]
    fn client_keeps_endpoint_and_model() {
        let config = AgentConfig {
            api_key: Some("k".to_string()),
            model: "local/test".to_string(),
            ..AgentConfig::default()
        };
        let client = HttpAgentClient::new(&config).unwrap();
        assert_eq!(client.model(), "local/test");
        assert_eq!(client.endpoint(), crate::config::DEFAULT_ENDPOINT);
    }

    #[test]
    fn chat_request_shape() {
        let body = ChatRequest {
            model: "m",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "hi",
                },
            ],
            temperature: 0.3,
            max_tokens: 10,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 10);
    }

    #[test]
    fn envelope_without_content_parses() {
        let envelope: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"role": "assistant"}}]}"#).unwrap();
        assert!(envelope.choices[0].message.content.is_none());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut text = "ééé".to_string();
        truncate_on_char_boundary(&mut text, 3);
        assert_eq!(text, "é");
    }
}
