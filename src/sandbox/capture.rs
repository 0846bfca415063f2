//! Output channel for script `print` statements.
//!
//! The channel forwards lines to a passthrough writer (stdout in production)
//! unless a capture is active. Captures are scoped: the guard restores the
//! previous destination when it is finished or dropped, including during
//! unwinding.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

struct ChannelState {
    passthrough: Box<dyn Write + Send>,
    capture: Option<String>,
}

/// Destination of everything executed scripts print.
#[derive(Clone)]
pub struct OutputChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl OutputChannel {
    /// Channel that passes output through to `writer` when not capturing.
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState {
                passthrough: writer,
                capture: None,
            })),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write one line to the current destination.
    pub fn write_line(&self, text: &str) {
        let mut state = self.lock();
        match state.capture.as_mut() {
            Some(buffer) => {
                buffer.push_str(text);
                buffer.push('\n');
            }
            None => {
                let _ = writeln!(state.passthrough, "{}", text);
                let _ = state.passthrough.flush();
            }
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.lock().capture.is_some()
    }

    /// Redirect output into a fresh buffer until the guard is released.
    pub fn capture(&self) -> CaptureGuard {
        let previous = self.lock().capture.replace(String::new());
        CaptureGuard {
            channel: self.clone(),
            previous: Some(previous),
        }
    }
}

/// Scoped ownership of the output redirection.
pub struct CaptureGuard {
    channel: OutputChannel,
    /// Destination to restore; `None` once released.
    previous: Option<Option<String>>,
}

impl CaptureGuard {
    /// Restore the previous destination and return what was captured.
    pub fn finish(mut self) -> String {
        self.release()
    }

    fn release(&mut self) -> String {
        match self.previous.take() {
            Some(previous) => {
                let mut state = self.channel.lock();
                std::mem::replace(&mut state.capture, previous).unwrap_or_default()
            }
            None => String::new(),
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.release();
    }
}
