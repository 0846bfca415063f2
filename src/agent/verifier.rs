//! Model-driven review of proposed code.

use crate::error::AgentResult;
use crate::gateway::ChatGateway;
use crate::models::Message;
use async_trait::async_trait;
use tracing::debug;

/// Judgement is pinned to deterministic sampling.
pub const VERIFIER_TEMPERATURE: f32 = 0.0;

const VERIFIER_SYSTEM_PROMPT: &str = "Be accurate, brief, and friendly. Respond LGTM if it looks good (with no further commentary), or FIXME if it needs improvement.";

/// Reviews a proposal against the task it was generated for.
///
/// Returns the reviewer's raw text; classification is done by
/// [`crate::models::Verdict::parse`].
#[async_trait]
pub trait CodeVerifier: Send + Sync {
    async fn review(&self, task: &str, proposal: &str) -> AgentResult<String>;
}

/// Verifier backed by one gateway call per review.
pub struct ModelVerifier<'a> {
    gateway: &'a dyn ChatGateway,
    model: String,
}

impl<'a> ModelVerifier<'a> {
    pub fn new(gateway: &'a dyn ChatGateway, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }

    fn messages(task: &str, proposal: &str) -> Vec<Message> {
        vec![
            Message::system(VERIFIER_SYSTEM_PROMPT),
            Message::user(format!(
                "Verify if this is a good solution that fulfills all the requirements in the instructions: {}\n\n | Proposed solution: \n\n{}",
                task, proposal
            )),
        ]
    }
}

#[async_trait]
impl CodeVerifier for ModelVerifier<'_> {
    async fn review(&self, task: &str, proposal: &str) -> AgentResult<String> {
        let messages = Self::messages(task, proposal);
        let verdict = self
            .gateway
            .complete(&messages, &self.model, VERIFIER_TEMPERATURE)
            .await?;
        debug!("Verifier replied: {}", verdict.lines().next().unwrap_or(""));
        Ok(verdict)
    }
}
