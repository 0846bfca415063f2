//! Data models for the analysis agent.
//!
//! This module contains the core data structures shared by the
//! synthesizer, the executor and the orchestrator: conversation messages,
//! code artifacts, verifier verdicts and the session report.

use crate::agent::fence;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fixes the output contract for the model
    System,
    /// Instructions and feedback from the agent
    User,
    /// Model replies
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single role-tagged message sent to the inference service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[cfg(test)]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered, append-only message history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a conversation from a system contract and the user's instructions.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system), Message::user(user)],
        }
    }

    /// Append a message. Earlier messages are never removed or reordered.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

/// Code proposed by the model, kept both as received and fence-stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    /// Text exactly as the gateway returned it.
    pub raw: String,
    /// Normalized text, directly executable when non-empty.
    pub code: String,
}

impl CodeArtifact {
    /// Build an artifact from raw model output.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let code = fence::normalize(&raw);
        Self { raw, code }
    }

    /// Truncated view of the raw response: the first and last `chars`
    /// characters joined by an ellipsis.
    pub fn preview(&self, chars: usize) -> String {
        let head: String = self.raw.chars().take(chars).collect();
        let total = self.raw.chars().count();
        let tail: String = self.raw.chars().skip(total.saturating_sub(chars)).collect();
        format!("{}...{}", head, tail)
    }
}

/// Classification of a proposal by the verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    NeedsFix { rationale: String },
    Unclear { raw: String },
}

impl Verdict {
    pub const ACCEPT_TOKEN: &'static str = "LGTM";
    pub const REJECT_TOKEN: &'static str = "FIXME";

    /// Classify verifier text by its literal leading token.
    ///
    /// Matching is case-sensitive and does not skip leading whitespace.
    pub fn parse(text: &str) -> Self {
        if text.starts_with(Self::ACCEPT_TOKEN) {
            Verdict::Accepted
        } else if let Some(rest) = text.strip_prefix(Self::REJECT_TOKEN) {
            let rationale = rest.trim_start_matches([':', ' ', '-']).trim().to_string();
            Verdict::NeedsFix { rationale }
        } else {
            Verdict::Unclear {
                raw: text.to_string(),
            }
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accepted => write!(f, "accepted"),
            Verdict::NeedsFix { .. } => write!(f, "needs fix"),
            Verdict::Unclear { .. } => write!(f, "unclear"),
        }
    }
}

/// Pipeline stage that produced an executed artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Inspection,
    Exploration,
    Request,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Inspection => write!(f, "Inspection"),
            StageKind::Exploration => write!(f, "Exploration"),
            StageKind::Request => write!(f, "Request"),
        }
    }
}

impl StageKind {
    /// Returns an emoji representation of the stage.
    pub fn emoji(&self) -> &'static str {
        match self {
            StageKind::Inspection => "🔍",
            StageKind::Exploration => "🔬",
            StageKind::Request => "💬",
        }
    }
}

/// One synthesized-and-executed step of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub kind: StageKind,
    /// Natural-language instructions the code was synthesized from.
    pub instructions: String,
    /// Accepted, normalized code.
    pub code: String,
    /// Captured output of the execution.
    pub output: String,
}

/// Metadata about an analysis session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// File that was analyzed.
    pub filename: String,
    /// Generation model.
    pub model_used: String,
    /// Model that judged the proposals.
    pub verifier_model: String,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in seconds.
    pub duration_seconds: f64,
}

/// Everything a finished session produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub metadata: SessionMetadata,
    /// Model's description of the file format and schema.
    pub data_summary: String,
    /// Model's summary of the exploration findings.
    pub results: String,
    /// Executed stages in program order.
    pub stages: Vec<StageRecord>,
}

impl SessionReport {
    /// Number of ad-hoc requests served by the interactive loop.
    pub fn request_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| s.kind == StageKind::Request)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_accepted() {
        assert_eq!(Verdict::parse("LGTM"), Verdict::Accepted);
        assert_eq!(Verdict::parse("LGTM, ship it"), Verdict::Accepted);
    }

    #[test]
    fn test_verdict_needs_fix_keeps_rationale() {
        assert_eq!(
            Verdict::parse("FIXME: the loop never prints"),
            Verdict::NeedsFix {
                rationale: "the loop never prints".to_string()
            }
        );
    }

    #[test]
    fn test_verdict_unclear_fallback() {
        let verdict = Verdict::parse("Looks fine to me");
        assert_eq!(
            verdict,
            Verdict::Unclear {
                raw: "Looks fine to me".to_string()
            }
        );
        // Literal prefix only
        assert!(matches!(Verdict::parse(" LGTM"), Verdict::Unclear { .. }));
        assert!(matches!(Verdict::parse("lgtm"), Verdict::Unclear { .. }));
    }

    #[test]
    fn test_artifact_strips_fences() {
        let artifact = CodeArtifact::from_raw("```rhai\nprint(1);\n```");
        assert_eq!(artifact.code, "print(1);");
        assert_eq!(artifact.raw, "```rhai\nprint(1);\n```");
    }

    #[test]
    fn test_artifact_preview() {
        let artifact = CodeArtifact::from_raw("let a = 1;\nlet b = 2;\nprint(a + b);");
        assert_eq!(artifact.preview(5), "let a...+ b);");

        let short = CodeArtifact::from_raw("x");
        assert_eq!(short.preview(15), "x...x");
    }

    #[test]
    fn test_conversation_is_append_only() {
        let mut conversation = Conversation::new("sys", "do it");
        assert_eq!(conversation.messages().len(), 2);
        conversation.push(Message::user("FIXME: again"));
        assert_eq!(conversation.messages()[0], Message::system("sys"));
        assert_eq!(conversation.messages()[1], Message::user("do it"));
        assert_eq!(conversation.messages()[2], Message::user("FIXME: again"));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_stage_emoji() {
        assert_eq!(StageKind::Inspection.emoji(), "🔍");
        assert_eq!(StageKind::Request.to_string(), "Request");
    }
}
