//! Thin client for OpenAI-compatible chat completion APIs (DeepSeek, OpenAI).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::clients::http_client::new_api_client;
use crate::config::settings::ProviderConfig;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: i64,
}

/// Assistant reply plus the token count the provider billed for it.
#[derive(Clone, Debug)]
pub struct ChatCompletion {
    pub content: String,
    pub total_tokens: i64,
}

/// Failure modes the caller must treat differently: a transport failure means
/// the provider was never reached (deterministic fallbacks apply), while a
/// provider error is a reachable upstream rejecting the call.
#[derive(Debug)]
pub enum ChatError {
    Transport(reqwest::Error),
    Provider { status: u16, body: String },
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatError::Transport(e) => write!(f, "Provider request failed: {}", e),
            ChatError::Provider { status, body } => {
                write!(f, "Provider returned status {}: {}", status, body)
            }
        }
    }
}

impl std::error::Error for ChatError {}

pub struct ChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatClient {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: new_api_client(config.timeout_secs),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        }
    }

    #[cfg(test)]
    pub fn with_config(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: new_api_client(5),
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one system + user message pair and returns the first choice.
    /// Malformed provider payloads (JSON errors, empty choices) surface as
    /// `Provider` errors so callers get the same handling as an upstream 5xx.
    #[instrument(skip(self, system_prompt, user_prompt))]
    pub async fn chat_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<ChatCompletion, ChatError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens,
            temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!("Sending chat completion request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(ChatError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Provider API error ({}): {}", status, body);
            return Err(ChatError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(ChatError::Transport)?;
        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse provider response: {}", e);
            ChatError::Provider {
                status: status.as_u16(),
                body: format!("Unparseable provider response: {}", e),
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ChatError::Provider {
                status: status.as_u16(),
                body: "Provider response contained no choices".to_string(),
            })?;

        Ok(ChatCompletion {
            content,
            total_tokens: parsed.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }
}
