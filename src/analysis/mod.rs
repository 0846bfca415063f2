//! Analysis modules.
//!
//! The pipeline sequences code synthesis and execution into a full
//! analysis session.

pub mod pipeline;

pub use pipeline::Analyst;
