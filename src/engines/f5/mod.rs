//! F5 voice-cloning text-to-speech engine implementation.
//!
//! This module drives the F5 flow-matching model exported as three ONNX
//! graphs. Given a reference clip and its transcript, it continues that voice
//! for new text:
//!
//! 1. The reference WAV is resampled to 24 kHz, downmixed and quantized.
//! 2. Reference and generation text are joined and tokenized. Latin text is
//!    kept per character, Chinese becomes tone-numbered pinyin.
//! 3. The output length is estimated from the text weights and the reference
//!    frame count.
//! 4. Preprocess, 32 transformer steps and decode produce the waveform.
//!
//! # Model Directory Layout
//!
//! ```text
//! models/f5/
//! ├── F5_Preprocess.onnx    # audio + text ids + duration → initial state
//! ├── F5_Transformer.onnx   # one refinement step
//! ├── F5_Decode.onnx        # latent → 16-bit waveform
//! ├── vocab.txt             # one token per line
//! └── config.json           # optional, overrides file names / threads
//! ```
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use f5_tts_rs::{SynthesisEngine, engines::f5::{F5Engine, F5InferenceParams}};
//! use std::path::PathBuf;
//!
//! let mut engine = F5Engine::new();
//! engine.load_model(&PathBuf::from("models/f5"))?;
//!
//! let params = F5InferenceParams {
//!     ref_audio: PathBuf::from("reference.wav"),
//!     ref_text: "In short, we embarked on a mission to make America great again.".to_string(),
//!     ..Default::default()
//! };
//! let result = engine.synthesize("简而言之, 我们开启了一项使命。", Some(params))?;
//! println!("Generated {} samples at {}Hz", result.samples.len(), result.sample_rate);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Long Text in Chunks
//!
//! ```rust,no_run
//! use f5_tts_rs::{SynthesisEngine, engines::f5::{F5Engine, F5InferenceParams, DEFAULT_CHUNK_BYTES}};
//! use std::path::PathBuf;
//!
//! let mut engine = F5Engine::new();
//! engine.load_model(&PathBuf::from("models/f5"))?;
//!
//! let params = F5InferenceParams {
//!     ref_audio: PathBuf::from("reference.wav"),
//!     ref_text: "In short, we embarked on a mission.".to_string(),
//!     chunk_max_bytes: Some(DEFAULT_CHUNK_BYTES),
//! };
//! engine.synthesize_to_file("A long passage. With many sentences.", &PathBuf::from("out.wav"), Some(params))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod chunker;
pub mod duration;
pub mod engine;
pub mod model;
pub mod phonemizer;
pub mod pipeline;
pub mod vocab;

pub use chunker::DEFAULT_CHUNK_BYTES;
pub use engine::{F5Engine, F5InferenceParams, F5ModelParams, F5ModelParamsBuilder};
pub use model::F5Error;
pub use pipeline::{InferenceStage, Stage, Tensor, REFINE_STEPS};
