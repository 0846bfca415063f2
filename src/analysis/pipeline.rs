//! Data analysis pipeline.
//!
//! Sequences synthesis and execution into inspect → summarize → explore →
//! summarize → interactive requests. All executions share one
//! [`Environment`], which is the only state carried between generated
//! scripts; everything else flows forward as natural-language summaries.

use crate::agent::{CodeSynthesizer, CodeVerifier, SynthesisSettings};
use crate::console::Console;
use crate::error::AgentResult;
use crate::gateway::ChatGateway;
use crate::models::{Message, StageKind, StageRecord};
use crate::sandbox::{Environment, ScriptExecutor};
use tracing::{debug, info};

pub const QUIT_COMMAND: &str = "quit";

const REQUEST_PROMPT: &str =
    "Enter your request for further analysis or type 'quit' to exit: ";

const SUMMARY_SYSTEM_PROMPT: &str = "Provide brief details about the data, including its format, a brief summary of the contents, and if it's tabular data, the column names in a comma-separated list and an example of a row. If it's JSON or raw text, provide a short sample";

const RESULTS_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// State of one analysis run.
#[derive(Debug)]
pub struct AnalysisSession {
    pub filename: String,
    pub data_summary: String,
    pub results: String,
    pub environment: Environment,
    pub stages: Vec<StageRecord>,
}

impl AnalysisSession {
    fn new(filename: &str) -> Self {
        let mut environment = Environment::new();
        environment.bind("filename", filename.to_string());

        Self {
            filename: filename.to_string(),
            data_summary: String::new(),
            results: String::new(),
            environment,
            stages: Vec::new(),
        }
    }
}

fn inspection_instructions(filename: &str) -> String {
    format!(
        "Generate Rhai code to inspect the data in the file '{}' and get a rough idea of its format (e.g., CSV, JSON, or raw text). \
         The code should read the file and print a sample of its content. \
         The file might be quite large, so be sure to generate a solution that doesn't require the entire file for initial inspection.",
        filename
    )
}

fn exploration_instructions(filename: &str, data_summary: &str) -> String {
    format!(
        "Generate Rhai code to explore that dataset in {}. Here's what we think is true about the data: {}. \
         Let's look at some basic statistics, possible missing data (e.g. describe or count_missing), and possible visualizations (e.g. histogram). \
         Provide suggestions for further analysis. \
         You may use the toolkit functions read_csv, column, describe, mean, median, std_dev, min_of, max_of, count_missing and histogram.",
        filename, data_summary
    )
}

fn request_instructions(request: &str, filename: &str) -> String {
    format!("{}. The filename is {}.", request, filename)
}

/// Drives a full analysis session.
pub struct Analyst<'a> {
    gateway: &'a dyn ChatGateway,
    synthesizer: CodeSynthesizer<'a>,
    executor: &'a ScriptExecutor,
    console: &'a dyn Console,
    settings: SynthesisSettings,
}

impl<'a> Analyst<'a> {
    pub fn new(
        gateway: &'a dyn ChatGateway,
        verifier: &'a dyn CodeVerifier,
        executor: &'a ScriptExecutor,
        console: &'a dyn Console,
        settings: SynthesisSettings,
    ) -> Self {
        Self {
            gateway,
            synthesizer: CodeSynthesizer::new(gateway, verifier, console, settings.clone()),
            executor,
            console,
            settings,
        }
    }

    /// Run every stage for `filename`, ending when the user quits.
    pub async fn analyze(&self, filename: &str) -> AgentResult<AnalysisSession> {
        let mut session = AnalysisSession::new(filename);

        self.console
            .say(&format!("Inspecting data from filename {}...", filename));
        let inspection = self
            .run_stage(&mut session, StageKind::Inspection, inspection_instructions(filename))
            .await?;

        session.data_summary = self
            .summarize(
                SUMMARY_SYSTEM_PROMPT,
                format!(
                    "Given inspection code {}, analyze output e.g. what type of file it is, etc: {}",
                    inspection.code, inspection.output
                ),
            )
            .await?;
        self.console
            .say(&format!("Data summary: {}", session.data_summary));

        self.console
            .say(&format!("Exploring data in {}...", filename));
        let instructions = exploration_instructions(filename, &session.data_summary);
        let exploration = self
            .run_stage(&mut session, StageKind::Exploration, instructions)
            .await?;

        session.results = self
            .summarize(
                RESULTS_SYSTEM_PROMPT,
                format!(
                    "Given exploration code {}, summarize your initial thoughts based on the output: {}",
                    exploration.code, exploration.output
                ),
            )
            .await?;
        self.console.say(&format!("Results: {}", session.results));

        self.interact(&mut session).await?;

        info!(
            "Session for {} finished after {} stages",
            filename,
            session.stages.len()
        );
        Ok(session)
    }

    /// Serve ad-hoc requests until "quit" (any case) or end of input.
    async fn interact(&self, session: &mut AnalysisSession) -> AgentResult<()> {
        loop {
            let Some(request) = self.console.ask(REQUEST_PROMPT)? else {
                debug!("Input closed, leaving interactive loop");
                return Ok(());
            };
            let request = request.trim();
            if request.eq_ignore_ascii_case(QUIT_COMMAND) {
                return Ok(());
            }
            if request.is_empty() {
                continue;
            }

            let instructions = request_instructions(request, &session.filename);
            let record = self
                .run_stage(session, StageKind::Request, instructions)
                .await?;

            let output = record.output.trim_end();
            if !output.is_empty() {
                self.console.say(output);
            }
        }
    }

    /// Synthesize code for `instructions` and execute it in the session.
    async fn run_stage(
        &self,
        session: &mut AnalysisSession,
        kind: StageKind,
        instructions: String,
    ) -> AgentResult<StageRecord> {
        info!("{} {} stage", kind.emoji(), kind);

        let artifact = self.synthesizer.synthesize(&instructions).await?;
        let output = self
            .executor
            .execute(&artifact, &mut session.environment)?;
        debug!(
            "{} stage produced {} bytes of output; bindings: {:?}",
            kind,
            output.len(),
            session.environment.names()
        );

        let record = StageRecord {
            kind,
            instructions,
            code: artifact.code,
            output,
        };
        session.stages.push(record.clone());
        Ok(record)
    }

    /// One plain model call with the default generation settings.
    async fn summarize(&self, system: &str, user: String) -> AgentResult<String> {
        let messages = [Message::system(system), Message::user(user)];
        self.gateway
            .complete(&messages, &self.settings.model, self.settings.temperature)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::{RecordingGateway, ScriptedVerifier};
    use crate::console::tests::ScriptedConsole;
    use crate::error::AgentError;
    use crate::sandbox::capture::tests::SharedBuffer;
    use crate::sandbox::{ExecutorOptions, OutputChannel};
    use tempfile::TempDir;

    const INSPECT_CODE: &str = "```rhai\nlet sample = read_head(filename, 3);\nfor line in sample { print(line); }\n```\n```";
    const EXPLORE_CODE: &str = "let table = read_csv(filename);\nprint(describe(table));\nprint(`sampled ${sample.len()} lines`);";

    fn data_file(dir: &TempDir) -> String {
        let path = dir.path().join("file.csv");
        std::fs::write(&path, "name,age\nAda,25\nGrace,35\nLinus,\n").unwrap();
        path.to_string_lossy().into_owned()
    }

    fn executor() -> (ScriptExecutor, SharedBuffer) {
        let sink = SharedBuffer::default();
        let executor = ScriptExecutor::with_channel(
            OutputChannel::new(Box::new(sink.clone())),
            &ExecutorOptions::default(),
        );
        (executor, sink)
    }

    fn position(lines: &[String], prefix: &str) -> usize {
        lines
            .iter()
            .position(|l| l.starts_with(prefix))
            .unwrap_or_else(|| panic!("no line starting with {:?} in {:#?}", prefix, lines))
    }

    #[tokio::test]
    async fn test_end_to_end_then_quit() {
        let dir = TempDir::new().unwrap();
        let filename = data_file(&dir);
        let gateway = RecordingGateway::new(&[
            INSPECT_CODE,
            "CSV with columns: name, age",
            EXPLORE_CODE,
            "Ages look plausible; one value is missing.",
        ]);
        let verifier = ScriptedVerifier::new(&["LGTM"]);
        let console = ScriptedConsole::with_inputs(&["quit"]);
        let (executor, sink) = executor();

        let analyst = Analyst::new(
            &gateway,
            &verifier,
            &executor,
            &console,
            SynthesisSettings::default(),
        );
        let session = analyst.analyze(&filename).await.unwrap();

        let lines = console.lines();
        let inspect = position(&lines, "Inspecting data from filename");
        let summary = position(&lines, "Data summary: CSV with columns: name, age");
        let explore = position(&lines, "Exploring data in");
        let results = position(&lines, "Results: Ages look plausible");
        let prompt = position(&lines, REQUEST_PROMPT);
        assert!(inspect < summary && summary < explore && explore < results && results < prompt);
        assert_eq!(prompt, lines.len() - 1);

        assert_eq!(gateway.calls().len(), 4);
        assert_eq!(verifier.reviews().len(), 2);

        assert_eq!(session.stages.len(), 2);
        assert_eq!(session.stages[0].kind, StageKind::Inspection);
        assert_eq!(session.stages[0].output, "name,age\nAda,25\nGrace,35\n");
        assert!(session.stages[1].output.contains("age: count=2 missing=1"));
        // `sample` came from the inspection script
        assert!(session.stages[1].output.ends_with("sampled 3 lines\n"));
        assert!(session.environment.contains("table"));

        // The summary call saw the inspection code and its output
        let summary_call = &gateway.calls()[1];
        assert_eq!(summary_call.messages[0], Message::system(SUMMARY_SYSTEM_PROMPT));
        assert!(summary_call.messages[1].content.contains("read_head(filename, 3)"));
        assert!(summary_call.messages[1].content.ends_with("Grace,35\n"));

        // The exploration instructions carry the data summary
        let explore_call = &gateway.calls()[2];
        assert!(explore_call.messages[1]
            .content
            .contains("Here's what we think is true about the data: CSV with columns: name, age."));

        assert_eq!(sink.contents(), "");
    }

    #[test]
    fn test_requests_reuse_environment() {
        let dir = TempDir::new().unwrap();
        let filename = data_file(&dir);
        let gateway = RecordingGateway::new(&[
            INSPECT_CODE,
            "CSV",
            EXPLORE_CODE,
            "Fine.",
            "print(mean(column(table, \"age\")));",
        ]);
        let verifier = ScriptedVerifier::new(&["LGTM"]);
        let console = ScriptedConsole::with_inputs(&["  show the mean age ", "", "QUIT"]);
        let (executor, _sink) = executor();

        let analyst = Analyst::new(
            &gateway,
            &verifier,
            &executor,
            &console,
            SynthesisSettings::default(),
        );
        let session = tokio_test::block_on(analyst.analyze(&filename)).unwrap();

        assert_eq!(session.stages.len(), 3);
        assert_eq!(session.stages[2].kind, StageKind::Request);
        assert_eq!(session.stages[2].output, "30.0\n");
        assert_eq!(
            session.stages[2].instructions,
            format!("show the mean age. The filename is {}.", filename)
        );

        let lines = console.lines();
        assert!(lines.contains(&"30.0".to_string()));
        assert_eq!(
            lines.iter().filter(|l| l.as_str() == REQUEST_PROMPT).count(),
            3
        );
    }

    #[tokio::test]
    async fn test_request_calls_helper_from_exploration() {
        let dir = TempDir::new().unwrap();
        let filename = data_file(&dir);
        let gateway = RecordingGateway::new(&[
            INSPECT_CODE,
            "CSV",
            "fn ages(t) { column(t, \"age\") }\nlet table = read_csv(filename);\nprint(count_missing(ages(table)));",
            "One age is missing.",
            "print(max_of(ages(table)));",
        ]);
        let verifier = ScriptedVerifier::new(&["LGTM"]);
        let console = ScriptedConsole::with_inputs(&["oldest person", "quit"]);
        let (executor, _sink) = executor();

        let analyst = Analyst::new(
            &gateway,
            &verifier,
            &executor,
            &console,
            SynthesisSettings::default(),
        );
        let session = analyst.analyze(&filename).await.unwrap();

        assert_eq!(session.stages[1].output, "1\n");
        assert_eq!(session.stages[2].output, "35.0\n");
        assert!(console.lines().contains(&"35.0".to_string()));
    }

    #[tokio::test]
    async fn test_end_of_input_ends_session() {
        let dir = TempDir::new().unwrap();
        let filename = data_file(&dir);
        let gateway = RecordingGateway::new(&[INSPECT_CODE, "CSV", EXPLORE_CODE, "Fine."]);
        let verifier = ScriptedVerifier::new(&["LGTM"]);
        let console = ScriptedConsole::with_inputs(&[]);
        let (executor, _sink) = executor();

        let analyst = Analyst::new(
            &gateway,
            &verifier,
            &executor,
            &console,
            SynthesisSettings::default(),
        );
        let session = analyst.analyze(&filename).await.unwrap();
        assert_eq!(session.results, "Fine.");
        assert_eq!(session.stages.len(), 2);
    }

    #[tokio::test]
    async fn test_execution_failure_propagates() {
        let gateway = RecordingGateway::new(&["throw \"cannot read\";"]);
        let verifier = ScriptedVerifier::new(&["LGTM"]);
        let console = ScriptedConsole::with_inputs(&["quit"]);
        let (executor, _sink) = executor();

        let analyst = Analyst::new(
            &gateway,
            &verifier,
            &executor,
            &console,
            SynthesisSettings::default(),
        );
        let err = analyst.analyze("file.csv").await.unwrap_err();

        assert!(matches!(err, AgentError::Execution { .. }));
        assert!(!executor.channel().is_capturing());
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_synthesis_stops_pipeline() {
        let gateway = RecordingGateway::new(&["print(1);"]);
        let verifier = ScriptedVerifier::new(&["FIXME: wrong file"]);
        let console = ScriptedConsole::with_inputs(&["quit"]);
        let (executor, _sink) = executor();

        let analyst = Analyst::new(
            &gateway,
            &verifier,
            &executor,
            &console,
            SynthesisSettings::default(),
        );
        let err = analyst.analyze("file.csv").await.unwrap_err();

        assert!(matches!(err, AgentError::SynthesisExhausted { attempts: 5, .. }));
        assert!(!console.lines().iter().any(|l| l.starts_with("Data summary")));
    }
}
