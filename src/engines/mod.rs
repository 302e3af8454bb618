//! Speech synthesis engines.
//!
//! This module contains implementations of text-to-speech engines.
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `f5` - F5 voice-cloning TTS (three ONNX graphs, enabled by default)

#[cfg(feature = "f5")]
pub mod f5;
