//! Error taxonomy for the synthesis and execution pipeline.

use thiserror::Error;

/// Failures that end a pipeline stage.
///
/// An ambiguous verifier response is not an error; it only triggers another
/// synthesis attempt.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The retry budget was spent without an accepted verdict.
    #[error("Human help needed after {attempts} attempts. Latest attempt: {last_attempt}")]
    SynthesisExhausted {
        attempts: usize,
        last_attempt: String,
    },

    /// Generated code raised while running.
    #[error("Generated code failed: {message}")]
    Execution {
        message: String,
        /// Whatever the script printed before it failed.
        output: String,
    },

    /// Transport, HTTP status or decoding failure talking to the model.
    #[error("Inference request failed: {0}")]
    Gateway(String),

    /// Reading from or writing to the console failed.
    #[error("Console I/O failed: {0}")]
    Console(#[from] std::io::Error),
}

pub type AgentResult<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message_carries_last_attempt() {
        let err = AgentError::SynthesisExhausted {
            attempts: 5,
            last_attempt: "print(1);".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Human help needed"));
        assert!(msg.contains("print(1);"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "closed");
        let err: AgentError = io.into();
        assert!(matches!(err, AgentError::Console(_)));
    }
}
