//! # f5-tts-rs
//!
//! A Rust library providing voice-cloning text-to-speech with the F5 engine.
//!
//! ## Features
//!
//! - **F5 TTS**: Continues the voice of a short reference clip using a
//!   three-stage ONNX pipeline (preprocess, flow-matching transformer, decode)
//! - **Mixed-script text**: Chinese is converted to tone-numbered pinyin, Latin
//!   text is fed character by character
//! - **Any reference WAV**: 16-bit PCM or 32-bit float, any sample rate, any
//!   channel count
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! f5-tts-rs = { version = "2026.10", features = ["f5"] }
//! ```
//!
//! ```ignore
//! use std::path::PathBuf;
//! use f5_tts_rs::{engines::f5::{F5Engine, F5InferenceParams}, SynthesisEngine};
//!
//! let mut engine = F5Engine::new();
//! engine.load_model(&PathBuf::from("models/f5"))?;
//!
//! let params = F5InferenceParams {
//!     ref_audio: PathBuf::from("reference.wav"),
//!     ref_text: "In short, we embarked on a mission.".to_string(),
//!     ..Default::default()
//! };
//! let result = engine.synthesize("简而言之, 我们开启了一项使命。", Some(params))?;
//! result.write_wav(&PathBuf::from("output.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engines;

use std::path::Path;

/// The result of a synthesis (text-to-speech) operation.
///
/// Contains signed 16-bit mono samples and the sample rate of the output audio.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    /// Raw audio samples as signed 16-bit PCM values
    pub samples: Vec<i16>,
    /// Sample rate of the audio (24000 for F5)
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Write the audio to a mono 16-bit PCM WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Common interface for text-to-speech synthesis engines.
///
/// This trait defines the standard operations that all synthesis engines must support.
/// Each engine may have different parameter types for model loading and inference configuration.
pub trait SynthesisEngine {
    /// Parameters for configuring inference behavior (reference voice, chunking, etc.)
    type SynthesisParams;
    /// Parameters for configuring model loading (file names, threads, etc.)
    type ModelParams: Default;

    /// Load a model from the specified path using default parameters.
    fn load_model(&mut self, model_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.load_model_with_params(model_path, Self::ModelParams::default())
    }

    /// Load a model from the specified path with custom parameters.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Synthesize speech from the given text.
    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>>;

    /// Synthesize speech from the given text and write to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `SynthesisResult::write_wav()`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        wav_path: &Path,
        params: Option<Self::SynthesisParams>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.synthesize(text, params)?.write_wav(wav_path)
    }
}
