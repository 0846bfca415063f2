//! Execution sandbox for generated code.
//!
//! The sandbox isolates output, not side effects: scripts reach the host
//! only through the registered toolkit, but run with the process's
//! privileges.

pub mod capture;
pub mod executor;
pub mod toolkit;

pub use capture::OutputChannel;
pub use executor::{Environment, ExecutorOptions, ScriptExecutor};
