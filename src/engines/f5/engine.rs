use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::Deserialize;

use crate::{SynthesisEngine, SynthesisResult};

use super::model::{F5Error, F5Model, SAMPLE_RATE};

/// Optional model-directory file that overrides the default [`F5ModelParams`].
pub const CONFIG_FILE: &str = "config.json";

/// Parameters for configuring F5 model loading.
///
/// File names are resolved relative to the model directory.
#[derive(Debug, Clone, PartialEq, Builder, Deserialize)]
#[builder(default)]
#[serde(default)]
pub struct F5ModelParams {
    /// Preprocess graph (audio + text ids + duration → initial state).
    pub preprocess_file: String,
    /// Flow-matching transformer graph, run once per refinement step.
    pub transformer_file: String,
    /// Decoder graph (final latent → 16-bit waveform).
    pub decode_file: String,
    /// Line-ordered token vocabulary.
    pub vocab_file: String,
    /// Number of CPU threads to use for inference.
    /// `None` uses the ORT default (typically all available cores).
    pub num_threads: Option<usize>,
}

impl Default for F5ModelParams {
    fn default() -> Self {
        Self {
            preprocess_file: "F5_Preprocess.onnx".to_string(),
            transformer_file: "F5_Transformer.onnx".to_string(),
            decode_file: "F5_Decode.onnx".to_string(),
            vocab_file: "vocab.txt".to_string(),
            num_threads: None,
        }
    }
}

impl F5ModelParams {
    /// Read parameters from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, F5Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| F5Error::Config(format!("Failed to parse {}: {e}", path.display())))
    }
}

/// Parameters for configuring an F5 synthesis request.
#[derive(Debug, Clone, Default)]
pub struct F5InferenceParams {
    /// WAV file with the voice to continue.
    pub ref_audio: PathBuf,
    /// Transcript of `ref_audio`. Must not be empty.
    pub ref_text: String,
    /// Split the generation text into chunks of at most this many bytes.
    /// `None` synthesizes it in one pass.
    pub chunk_max_bytes: Option<usize>,
}

/// F5 voice-cloning text-to-speech engine.
///
/// # Quick Start
///
/// ```rust,no_run
/// use f5_tts_rs::{SynthesisEngine, engines::f5::{F5Engine, F5InferenceParams}};
/// use std::path::PathBuf;
///
/// let mut engine = F5Engine::new();
/// engine.load_model(&PathBuf::from("models/f5"))?;
/// let params = F5InferenceParams {
///     ref_audio: PathBuf::from("reference.wav"),
///     ref_text: "In short, we embarked on a mission.".to_string(),
///     ..Default::default()
/// };
/// let result = engine.synthesize("Hello, world!", Some(params))?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct F5Engine {
    model: Option<F5Model>,
    model_path: Option<PathBuf>,
}

impl Default for F5Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl F5Engine {
    pub fn new() -> Self {
        Self {
            model: None,
            model_path: None,
        }
    }

    /// Directory of the currently loaded model.
    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }
}

impl Drop for F5Engine {
    fn drop(&mut self) {
        self.unload_model();
    }
}

impl SynthesisEngine for F5Engine {
    type SynthesisParams = F5InferenceParams;
    type ModelParams = F5ModelParams;

    /// Load the model with explicit parameters.
    ///
    /// When `params` are the defaults and the directory holds a
    /// [`CONFIG_FILE`], that file is used instead.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = model_path.join(CONFIG_FILE);
        let params = if params == F5ModelParams::default() && config_path.exists() {
            log::info!("Loading model parameters from {}", config_path.display());
            F5ModelParams::from_json_file(&config_path)?
        } else {
            params
        };

        let model = F5Model::load(model_path, &params)?;
        self.model = Some(model);
        self.model_path = Some(model_path.to_path_buf());
        Ok(())
    }

    fn unload_model(&mut self) {
        self.model = None;
        self.model_path = None;
    }

    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>> {
        let model = self.model.as_ref().ok_or(F5Error::ModelNotLoaded)?;
        let p = params.ok_or(F5Error::MissingReference)?;

        let samples = model.synthesize_text(&p.ref_audio, &p.ref_text, text, p.chunk_max_bytes)?;

        Ok(SynthesisResult {
            samples,
            sample_rate: SAMPLE_RATE,
        })
    }
}
