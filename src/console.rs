//! Console boundary.
//!
//! Progress lines, summaries and the interactive prompt all go through this
//! trait so the pipeline can be driven without a terminal.

use crate::error::AgentResult;
use std::io::{BufRead, Write};

pub trait Console {
    /// Print one line of progress or results.
    fn say(&self, line: &str);

    /// Show `prompt` and read one line. `None` means end of input.
    fn ask(&self, prompt: &str) -> AgentResult<Option<String>>;
}

/// Console on the process's stdin/stdout.
pub struct StdConsole;

impl Console for StdConsole {
    fn say(&self, line: &str) {
        println!("{}", line);
    }

    fn ask(&self, prompt: &str) -> AgentResult<Option<String>> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
