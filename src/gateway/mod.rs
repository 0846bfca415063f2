//! Inference gateway.
//!
//! The gateway is the only place the agent talks to a language model. It is
//! a black box from an ordered message list to the reply text; retries and
//! timeouts beyond the HTTP client's own are the caller's problem.

pub mod openai;

pub use openai::{OpenAiConfig, OpenAiGateway};

use crate::error::AgentResult;
use crate::models::Message;
use async_trait::async_trait;

/// Chat-completion capability.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send `messages` and return the text content of the first choice.
    async fn complete(&self, messages: &[Message], model: &str, temperature: f32)
        -> AgentResult<String>;
}
