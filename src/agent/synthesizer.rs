//! Code synthesis with verification and retries.
//!
//! Each attempt proposes code, strips fences, and asks the verifier for a
//! verdict. Rejections feed back into the conversation so every retry sees
//! strictly more context than the last; ambiguous verdicts are retried,
//! never accepted.

use crate::agent::verifier::CodeVerifier;
use crate::console::Console;
use crate::error::{AgentError, AgentResult};
use crate::gateway::ChatGateway;
use crate::models::{CodeArtifact, Conversation, Message, Verdict};
use crate::sandbox::toolkit::TOOLKIT_REFERENCE;
use tracing::{debug, info, warn};

/// Attempts before giving up and asking for human help.
pub const MAX_ATTEMPTS: usize = 5;

/// Feedback sent when the verifier's reply is neither LGTM nor FIXME.
pub const RETRY_PROMPT: &str = "Please try again.";

/// Model parameters for the proposing side of the loop.
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub model: String,
    pub temperature: f32,
    /// Characters shown from each end of a proposal.
    pub preview_chars: usize,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            temperature: 0.7,
            preview_chars: 15,
        }
    }
}

/// Output contract for code generation.
pub fn system_prompt() -> String {
    format!(
        "Generate Rhai script code and comments, with NO further natural language description or preamble. \
         The output should be executable directly, in other words. \
         Only generate code you can pipe directly into a Rhai interpreter. \
         Don't wrap the code in a main function or any other entry-point guard. \
         Don't include backticks.\n\n{}",
        TOOLKIT_REFERENCE
    )
}

pub struct CodeSynthesizer<'a> {
    gateway: &'a dyn ChatGateway,
    verifier: &'a dyn CodeVerifier,
    console: &'a dyn Console,
    settings: SynthesisSettings,
}

impl<'a> CodeSynthesizer<'a> {
    pub fn new(
        gateway: &'a dyn ChatGateway,
        verifier: &'a dyn CodeVerifier,
        console: &'a dyn Console,
        settings: SynthesisSettings,
    ) -> Self {
        Self {
            gateway,
            verifier,
            console,
            settings,
        }
    }

    /// Turn natural-language instructions into verified code.
    pub async fn synthesize(&self, instructions: &str) -> AgentResult<CodeArtifact> {
        let system = system_prompt();
        let task = format!("system message: {}, nl_instructions: {}", system, instructions);
        let mut conversation = Conversation::new(system, instructions);
        let mut latest: Option<CodeArtifact> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            info!("Synthesis attempt {}/{}", attempt, MAX_ATTEMPTS);
            debug!("Conversation holds {} messages", conversation.messages().len());

            let raw = self
                .gateway
                .complete(
                    conversation.messages(),
                    &self.settings.model,
                    self.settings.temperature,
                )
                .await?;

            let artifact = CodeArtifact::from_raw(raw);
            self.console.say(&format!(
                "proposed generated code: {}",
                artifact.preview(self.settings.preview_chars)
            ));

            let review = self
                .verifier
                .review(&task, &format!("response: {}", artifact.code))
                .await?;

            match Verdict::parse(&review) {
                Verdict::Accepted => {
                    info!("Proposal accepted on attempt {}", attempt);
                    return Ok(artifact);
                }
                Verdict::NeedsFix { rationale } => {
                    warn!("Proposal rejected: {}", rationale);
                    conversation.push(Message::user(review));
                }
                Verdict::Unclear { raw } => {
                    warn!("Unclear verdict, retrying: {}", raw);
                    conversation.push(Message::user(RETRY_PROMPT));
                }
            }

            latest = Some(artifact);
        }

        Err(AgentError::SynthesisExhausted {
            attempts: MAX_ATTEMPTS,
            last_attempt: latest.map(|a| a.code).unwrap_or_default(),
        })
    }
}
