//! Code synthesis agent.
//!
//! This module provides the propose → normalize → verify loop that turns
//! natural-language instructions into accepted code.

pub mod fence;
pub mod synthesizer;
pub mod verifier;

pub use synthesizer::{CodeSynthesizer, SynthesisSettings};
pub use verifier::{CodeVerifier, ModelVerifier};
