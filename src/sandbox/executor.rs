//! In-process execution of generated scripts.
//!
//! Scripts run on an embedded Rhai engine against a caller-owned
//! [`Environment`], so top-level bindings and function definitions made by
//! one script are visible to the next. Everything a script prints is
//! captured and returned; the output channel is restored whether the script
//! finishes, raises or panics.

use super::capture::OutputChannel;
use super::toolkit;
use crate::error::{AgentError, AgentResult};
use crate::models::CodeArtifact;
use rhai::{Engine, Scope, AST};
use tracing::debug;

/// Shared bindings that persist across executions.
///
/// Variables live in the scope; `fn` definitions and the anonymous
/// functions behind closures live in a functions-only AST that is merged
/// into every script before it runs.
#[derive(Debug, Default)]
pub struct Environment {
    scope: Scope<'static>,
    functions: AST,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any existing binding.
    pub fn bind<T: Clone + Send + Sync + 'static>(&mut self, name: &str, value: T) {
        self.scope.set_value(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scope.contains(name)
    }

    #[cfg(test)]
    pub fn get<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Option<T> {
        self.scope.get_value::<T>(name)
    }

    /// Names currently bound, in binding order.
    pub fn names(&self) -> Vec<String> {
        self.scope.iter().map(|(name, _, _)| name.to_string()).collect()
    }

    /// Number of script functions kept for later executions.
    pub fn function_count(&self) -> usize {
        self.functions.iter_functions().count()
    }
}

/// Limits applied to the embedded engine.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Maximum script operations per execution; 0 is unlimited.
    pub max_operations: u64,
}

/// Embedded evaluator for generated code.
pub struct ScriptExecutor {
    engine: Engine,
    channel: OutputChannel,
}

impl ScriptExecutor {
    /// Executor whose uncaptured output goes to stdout.
    pub fn new(options: &ExecutorOptions) -> Self {
        Self::with_channel(OutputChannel::stdout(), options)
    }

    pub fn with_channel(channel: OutputChannel, options: &ExecutorOptions) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(options.max_operations);

        let sink = channel.clone();
        engine.on_print(move |text| sink.write_line(text));
        engine.on_debug(|text, source, pos| match source {
            Some(source) => debug!("script debug {} @ {:?}: {}", source, pos, text),
            None => debug!("script debug @ {:?}: {}", pos, text),
        });

        toolkit::register(&mut engine);

        Self { engine, channel }
    }

    #[cfg(test)]
    pub fn channel(&self) -> &OutputChannel {
        &self.channel
    }

    /// Run `artifact` against `env` and return everything it printed.
    ///
    /// Script errors propagate as [`AgentError::Execution`] carrying the
    /// output produced before the failure.
    pub fn execute(&self, artifact: &CodeArtifact, env: &mut Environment) -> AgentResult<String> {
        debug!(
            "Executing {} bytes of generated code against {} bindings and {} functions",
            artifact.code.len(),
            env.names().len(),
            env.function_count()
        );

        let ast = self
            .engine
            .compile(&artifact.code)
            .map_err(|err| AgentError::Execution {
                message: err.to_string(),
                output: String::new(),
            })?;
        // Later definitions replace earlier ones with the same name and arity
        let program = env.functions.merge(&ast);

        let capture = self.channel.capture();
        let result = self.engine.run_ast_with_scope(&mut env.scope, &program);
        let output = capture.finish();

        env.functions = program.clone_functions_only();

        match result {
            Ok(()) => Ok(output),
            Err(err) => Err(AgentError::Execution {
                message: err.to_string(),
                output,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::capture::tests::SharedBuffer;
    use rhai::INT;
    use tempfile::TempDir;

    fn executor() -> (ScriptExecutor, SharedBuffer) {
        let sink = SharedBuffer::default();
        let channel = OutputChannel::new(Box::new(sink.clone()));
        (
            ScriptExecutor::with_channel(channel, &ExecutorOptions::default()),
            sink,
        )
    }

    fn artifact(code: &str) -> CodeArtifact {
        CodeArtifact::from_raw(code)
    }

    #[test]
    fn test_output_captured_not_leaked() {
        let (executor, sink) = executor();
        let mut env = Environment::new();

        let output = executor
            .execute(&artifact("print(\"hello\"); print(40 + 2);"), &mut env)
            .unwrap();

        assert_eq!(output, "hello\n42\n");
        assert_eq!(sink.contents(), "");
        assert!(!executor.channel().is_capturing());

        executor.channel().write_line("restored");
        assert_eq!(sink.contents(), "restored\n");
    }

    #[test]
    fn test_failure_restores_channel() {
        let (executor, sink) = executor();
        let mut env = Environment::new();

        let err = executor
            .execute(&artifact("print(\"partial\"); throw \"boom\";"), &mut env)
            .unwrap_err();

        match err {
            AgentError::Execution { message, output } => {
                assert!(message.contains("boom"));
                assert_eq!(output, "partial\n");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(sink.contents(), "");
        assert!(!executor.channel().is_capturing());

        executor.channel().write_line("restored");
        assert_eq!(sink.contents(), "restored\n");
    }

    #[test]
    fn test_bindings_persist_across_executions() {
        let (executor, _sink) = executor();
        let mut env = Environment::new();

        executor
            .execute(&artifact("let total = 40;"), &mut env)
            .unwrap();
        assert!(env.contains("total"));

        let output = executor
            .execute(&artifact("print(total + 2);"), &mut env)
            .unwrap();
        assert_eq!(output, "42\n");
        assert_eq!(env.get::<INT>("total"), Some(40));
    }

    #[test]
    fn test_functions_persist_across_executions() {
        let (executor, _sink) = executor();
        let mut env = Environment::new();

        let output = executor
            .execute(&artifact("fn double(x) { x * 2 }\nprint(double(2));"), &mut env)
            .unwrap();
        assert_eq!(output, "4\n");
        assert_eq!(env.function_count(), 1);

        let output = executor
            .execute(&artifact("print(double(21));"), &mut env)
            .unwrap();
        assert_eq!(output, "42\n");
        assert_eq!(env.function_count(), 1);
    }

    #[test]
    fn test_closures_callable_in_later_executions() {
        let (executor, _sink) = executor();
        let mut env = Environment::new();

        executor
            .execute(&artifact("let inc = |x| x + 1;"), &mut env)
            .unwrap();
        let output = executor
            .execute(&artifact("print(inc.call(41));"), &mut env)
            .unwrap();
        assert_eq!(output, "42\n");
    }

    #[test]
    fn test_redefined_function_replaces_previous() {
        let (executor, _sink) = executor();
        let mut env = Environment::new();

        executor
            .execute(&artifact("fn label() { \"old\" }"), &mut env)
            .unwrap();
        executor
            .execute(&artifact("fn label() { \"new\" }"), &mut env)
            .unwrap();
        let output = executor
            .execute(&artifact("print(label());"), &mut env)
            .unwrap();
        assert_eq!(output, "new\n");
    }

    #[test]
    fn test_syntax_error_is_execution_failure() {
        let (executor, sink) = executor();
        let mut env = Environment::new();
        let kept: INT = 1;
        env.bind("kept", kept);

        let err = executor
            .execute(&artifact("let = ;"), &mut env)
            .unwrap_err();
        assert!(matches!(err, AgentError::Execution { ref output, .. } if output.is_empty()));
        assert!(env.contains("kept"));
        assert!(!executor.channel().is_capturing());
        assert_eq!(sink.contents(), "");
    }

    #[test]
    fn test_pre_bound_values_visible() {
        let (executor, _sink) = executor();
        let mut env = Environment::new();
        env.bind("filename", "data.csv".to_string());

        let output = executor
            .execute(&artifact("print(`file: ${filename}`);"), &mut env)
            .unwrap();
        assert_eq!(output, "file: data.csv\n");
        assert_eq!(env.names(), vec!["filename".to_string()]);
    }

    #[test]
    fn test_empty_artifact_runs() {
        let (executor, _sink) = executor();
        let mut env = Environment::new();
        assert_eq!(executor.execute(&artifact("```\n```"), &mut env).unwrap(), "");
    }

    #[test]
    fn test_operation_limit() {
        let sink = SharedBuffer::default();
        let executor = ScriptExecutor::with_channel(
            OutputChannel::new(Box::new(sink)),
            &ExecutorOptions {
                max_operations: 1_000,
            },
        );
        let mut env = Environment::new();
        let result = executor.execute(&artifact("loop { }"), &mut env);
        assert!(matches!(result, Err(AgentError::Execution { .. })));
        assert!(!executor.channel().is_capturing());
    }

    #[test]
    fn test_toolkit_available_to_scripts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scores.csv");
        std::fs::write(&path, "name,score\na,1\nb,3\nc,\n").unwrap();

        let (executor, _sink) = executor();
        let mut env = Environment::new();
        env.bind("filename", path.to_string_lossy().into_owned());

        let code = r#"
            let table = read_csv(filename);
            let scores = column(table, "score");
            print(mean(scores));
            print(count_missing(scores));
            print(read_head(filename, 1)[0]);
        "#;
        let output = executor.execute(&artifact(code), &mut env).unwrap();
        assert_eq!(output, "2.0\n1\nname,score\n");
    }
}
