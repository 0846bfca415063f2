//! OpenAI-compatible chat completions client.
//!
//! Works with OpenAI and any server exposing `POST /chat/completions`
//! with bearer authentication.

use super::ChatGateway;
use crate::error::{AgentError, AgentResult};
use crate::models::Message;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Connection settings for the gateway.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_base: String,
    pub api_key: String,
    pub timeout_seconds: u64,
    /// Show a spinner while waiting for the model.
    pub show_progress: bool,
}

/// Chat completions API request.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

/// Chat completions API response.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Gateway backed by an OpenAI-compatible HTTP endpoint.
pub struct OpenAiGateway {
    config: OpenAiConfig,
    http_client: reqwest::Client,
}

impl OpenAiGateway {
    pub fn new(config: OpenAiConfig) -> AgentResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AgentError::Gateway(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    fn spinner(&self, model: &str) -> Option<ProgressBar> {
        if !self.config.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Waiting for {}", model));
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    }

    async fn send(&self, request: &ChatCompletionRequest<'_>) -> AgentResult<String> {
        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Gateway(format!(
                        "Request timed out after {}s",
                        self.config.timeout_seconds
                    ))
                } else if e.is_connect() {
                    AgentError::Gateway(format!(
                        "Cannot connect to {}",
                        self.config.api_base
                    ))
                } else {
                    AgentError::Gateway(format!("Failed to send request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Gateway(format!("API error {}: {}", status, body)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Gateway(format!("Failed to parse response: {}", e)))?;

        first_choice_text(completion)
    }
}

fn first_choice_text(completion: ChatCompletionResponse) -> AgentResult<String> {
    completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| AgentError::Gateway("Response contained no choices".to_string()))
}

#[async_trait]
impl ChatGateway for OpenAiGateway {
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        temperature: f32,
    ) -> AgentResult<String> {
        let request = ChatCompletionRequest {
            model,
            messages,
            temperature,
        };

        debug!(
            "Sending chat request with {} messages to {} (temperature {})",
            messages.len(),
            model,
            temperature
        );

        let spinner = self.spinner(model);
        let result = self.send(&request).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        result
    }
}
