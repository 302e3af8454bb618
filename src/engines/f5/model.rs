use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
use ort::execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{DynValue, Tensor as OrtTensor};

use super::audio::{self, ReferenceAudio};
use super::chunker::generation_chunks;
use super::duration::{estimate_duration, reference_frames};
use super::engine::F5ModelParams;
use super::phonemizer::PhoneticTokenizer;
use super::pipeline::{run_pipeline, InferenceStage, PipelineInput, Stage, Stages, Tensor};
use super::vocab::Vocab;

/// Sample rate of reference input and generated output.
pub const SAMPLE_RATE: u32 = 24000;

/// Session config entries applied to every stage.
const SESSION_CONFIG_ENTRIES: [(&str, &str); 3] = [
    ("session.intra_op.allow_spinning", "1"),
    ("session.inter_op.allow_spinning", "1"),
    ("session.set_denormal_as_zero", "1"),
];

#[derive(thiserror::Error, Debug)]
pub enum F5Error {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Unsupported WAV format: {bits}-bit {format} (expected 16-bit Int or 32-bit Float)")]
    UnsupportedAudioFormat { bits: u16, format: String },
    #[error("Resampling failed: {0}")]
    Resample(String),
    #[error("Failed to load vocabulary {}: {source}", .path.display())]
    VocabLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Reference text is empty")]
    EmptyReferenceText,
    #[error("Reference text has zero weighted length, cannot scale duration")]
    DivisionByZero,
    #[error("{stage} stage failed: {reason}")]
    Inference { stage: Stage, reason: String },
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
    #[error("No reference audio/text given. Pass F5InferenceParams to synthesize().")]
    MissingReference,
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// One ONNX graph, locked for the duration of each call.
pub struct OrtStage {
    stage: Stage,
    session: Mutex<Session>,
}

impl OrtStage {
    pub fn load(stage: Stage, onnx_path: &Path, num_threads: Option<usize>) -> Result<Self, F5Error> {
        if !onnx_path.exists() {
            return Err(F5Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{stage} model not found at {}", onnx_path.display()),
            )));
        }
        log::info!("Loading {stage} graph from {}", onnx_path.display());
        let session = init_session(onnx_path, num_threads)?;
        Ok(Self {
            stage,
            session: Mutex::new(session),
        })
    }

    fn fail(&self, reason: impl Into<String>) -> F5Error {
        F5Error::Inference {
            stage: self.stage,
            reason: reason.into(),
        }
    }
}

impl InferenceStage for OrtStage {
    fn run(&self, inputs: Vec<Tensor>) -> Result<Vec<Tensor>, F5Error> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| self.fail("session lock poisoned"))?;

        let names: Vec<String> = session.inputs().iter().map(|i| i.name().to_string()).collect();
        let values = bind_inputs(self.stage, names, inputs)?;

        let outputs = session.run(values)?;
        let tensors = outputs
            .iter()
            .map(|(name, value)| {
                from_value(&value)
                    .ok_or_else(|| self.fail(format!("output '{name}' has an unsupported element type")))
            })
            .collect::<Result<Vec<_>, _>>();
        tensors
    }
}

/// Pair graph input names with tensors, in order.
fn bind_inputs(
    stage: Stage,
    names: Vec<String>,
    inputs: Vec<Tensor>,
) -> Result<Vec<(String, DynValue)>, F5Error> {
    if names.len() != inputs.len() {
        return Err(F5Error::Inference {
            stage,
            reason: format!("graph takes {} inputs, got {}", names.len(), inputs.len()),
        });
    }

    names
        .into_iter()
        .zip(inputs)
        .map(|(name, tensor)| Ok((name, to_value(tensor)?)))
        .collect()
}

fn to_value(tensor: Tensor) -> Result<DynValue, F5Error> {
    Ok(match tensor {
        Tensor::F32(a) => OrtTensor::from_array(a)?.into_dyn(),
        Tensor::I16(a) => OrtTensor::from_array(a)?.into_dyn(),
        Tensor::I32(a) => OrtTensor::from_array(a)?.into_dyn(),
        Tensor::I64(a) => OrtTensor::from_array(a)?.into_dyn(),
    })
}

fn from_value(value: &DynValue) -> Option<Tensor> {
    if let Ok(a) = value.try_extract_array::<f32>() {
        return Some(Tensor::F32(a.to_owned()));
    }
    if let Ok(a) = value.try_extract_array::<i64>() {
        return Some(Tensor::I64(a.to_owned()));
    }
    if let Ok(a) = value.try_extract_array::<i32>() {
        return Some(Tensor::I32(a.to_owned()));
    }
    if let Ok(a) = value.try_extract_array::<i16>() {
        return Some(Tensor::I16(a.to_owned()));
    }
    None
}

/// Loaded F5 model: vocabulary, tokenizer and the three inference stages.
pub struct F5Model {
    preprocess: OrtStage,
    transformer: OrtStage,
    decode: OrtStage,
    vocab: Vocab,
    tokenizer: PhoneticTokenizer,
}

impl F5Model {
    /// Load the model from a directory.
    ///
    /// The directory must contain the three ONNX graphs and the vocabulary
    /// file named in `params`.
    pub fn load(model_dir: &Path, params: &F5ModelParams) -> Result<Self, F5Error> {
        let threads = params.num_threads;
        let preprocess = OrtStage::load(Stage::Preprocess, &model_dir.join(&params.preprocess_file), threads)?;
        let transformer = OrtStage::load(Stage::Transformer, &model_dir.join(&params.transformer_file), threads)?;
        let decode = OrtStage::load(Stage::Decode, &model_dir.join(&params.decode_file), threads)?;
        let vocab = Vocab::load(&model_dir.join(&params.vocab_file))?;

        Ok(Self {
            preprocess,
            transformer,
            decode,
            vocab,
            tokenizer: PhoneticTokenizer::new(),
        })
    }

    /// Synthesize `gen_text` in the voice of the reference clip.
    ///
    /// With `chunk_max_bytes` set, the generation text is split into chunks
    /// that are synthesized one after another against the same reference and
    /// concatenated.
    pub fn synthesize_text(
        &self,
        ref_audio: &Path,
        ref_text: &str,
        gen_text: &str,
        chunk_max_bytes: Option<usize>,
    ) -> Result<Vec<i16>, F5Error> {
        if ref_text.is_empty() {
            return Err(F5Error::EmptyReferenceText);
        }
        let reference = audio::load_reference(ref_audio)?;

        let chunks = generation_chunks(gen_text, chunk_max_bytes);
        if chunks.len() > 1 {
            log::debug!("Generation text split into {} chunks", chunks.len());
        }

        let mut combined = Vec::new();
        for chunk in &chunks {
            let audio = self.synthesize_chunk(&reference, ref_text, chunk)?;
            combined.extend_from_slice(&audio);
        }
        Ok(combined)
    }

    /// Run the full pipeline for one generation text.
    fn synthesize_chunk(
        &self,
        reference: &ReferenceAudio,
        ref_text: &str,
        gen_text: &str,
    ) -> Result<Vec<i16>, F5Error> {
        let frames = reference_frames(reference.mono_len);
        let max_duration = estimate_duration(frames, ref_text, gen_text)?;

        let tokens = self.tokenizer.tokenize(&format!("{ref_text}{gen_text}"));
        let text_ids = self.vocab.encode(&[tokens]);
        log::info!(
            "Synthesizing {} tokens, {} reference frames, target {} frames",
            text_ids.ncols(),
            frames,
            max_duration
        );

        let stages = Stages {
            preprocess: &self.preprocess,
            transformer: &self.transformer,
            decode: &self.decode,
        };
        run_pipeline(
            &stages,
            PipelineInput {
                audio: &reference.samples,
                text_ids,
                max_duration,
            },
        )
    }
}

/// Execution providers in priority order. CUDA comes first when enabled and
/// ORT falls back to the CPU provider for anything it cannot place.
fn execution_providers() -> Vec<ExecutionProviderDispatch> {
    let mut providers = Vec::new();
    #[cfg(feature = "cuda")]
    providers.push(CUDAExecutionProvider::default().build());
    providers.push(CPUExecutionProvider::default().with_arena_allocator(true).build());
    providers
}

/// Initialize an ONNX session for one pipeline stage.
///
/// Operators run sequentially; the stages form a strict chain, so inter-op
/// parallelism has nothing to overlap.
fn init_session(onnx_path: &Path, num_threads: Option<usize>) -> Result<Session, F5Error> {
    let mut builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_execution_providers(execution_providers())?
        .with_parallel_execution(false)?;

    for (key, value) in SESSION_CONFIG_ENTRIES {
        builder = builder.with_config_entry(key, value)?;
    }

    if let Some(threads) = num_threads {
        builder = builder
            .with_intra_threads(threads)?
            .with_inter_threads(threads)?;
    }

    Ok(builder.commit_from_file(onnx_path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn round_trip(tensor: Tensor) -> Tensor {
        let value = to_value(tensor).unwrap();
        from_value(&value).expect("supported element type")
    }

    #[test]
    fn tensors_survive_conversion_with_dtype_and_shape() {
        let shape = IxDyn(&[1, 2, 3]);
        let cases = vec![
            Tensor::F32(ArrayD::from_shape_vec(shape.clone(), vec![0.5, -1.0, 2.25, 0.0, 3.5, -0.125]).unwrap()),
            Tensor::I16(ArrayD::from_shape_vec(shape.clone(), vec![0, 1, -1, i16::MAX, i16::MIN, 7]).unwrap()),
            Tensor::I32(ArrayD::from_shape_vec(shape.clone(), vec![0, 1, -1, i32::MAX, i32::MIN, 7]).unwrap()),
            Tensor::I64(ArrayD::from_shape_vec(shape, vec![0, 1, -1, i64::MAX, i64::MIN, 7]).unwrap()),
        ];
        for tensor in cases {
            let back = round_trip(tensor.clone());
            assert_eq!(back.dtype(), tensor.dtype());
            assert_eq!(back.shape(), &[1, 2, 3]);
            assert_eq!(back, tensor);
        }
    }

    #[test]
    fn scalar_shaped_inputs_keep_their_rank() {
        let step = Tensor::I32(ArrayD::from_shape_vec(IxDyn(&[1]), vec![0]).unwrap());
        assert_eq!(round_trip(step.clone()), step);
        let duration = Tensor::I64(ArrayD::from_shape_vec(IxDyn(&[1]), vec![134]).unwrap());
        assert_eq!(round_trip(duration.clone()), duration);
    }

    #[test]
    fn bind_inputs_pairs_names_in_order() {
        let names = vec!["noise".to_string(), "time_step".to_string()];
        let inputs = vec![
            Tensor::F32(ArrayD::from_elem(IxDyn(&[1, 4]), 0.25)),
            Tensor::I32(ArrayD::from_elem(IxDyn(&[1]), 3)),
        ];
        let bound = bind_inputs(Stage::Transformer, names, inputs).unwrap();
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[0].0, "noise");
        assert_eq!(bound[1].0, "time_step");
        assert_eq!(
            from_value(&bound[1].1),
            Some(Tensor::I32(ArrayD::from_elem(IxDyn(&[1]), 3)))
        );
    }

    #[test]
    fn bind_inputs_rejects_count_mismatch() {
        let names = vec!["noise".to_string(), "ref_signal_len".to_string()];
        let inputs = vec![Tensor::F32(ArrayD::from_elem(IxDyn(&[1]), 0.0))];
        let err = bind_inputs(Stage::Decode, names, inputs).unwrap_err();
        match err {
            F5Error::Inference { stage, reason } => {
                assert_eq!(stage, Stage::Decode);
                assert_eq!(reason, "graph takes 2 inputs, got 1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn session_config_enables_spinning_and_denormal_flush() {
        let keys: Vec<&str> = SESSION_CONFIG_ENTRIES.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![
                "session.intra_op.allow_spinning",
                "session.inter_op.allow_spinning",
                "session.set_denormal_as_zero"
            ]
        );
        assert!(SESSION_CONFIG_ENTRIES.iter().all(|(_, v)| *v == "1"));
    }

    #[test]
    fn cpu_provider_is_always_registered_last() {
        let providers = execution_providers();
        let expected = if cfg!(feature = "cuda") { 2 } else { 1 };
        assert_eq!(providers.len(), expected);
    }

    #[test]
    fn missing_graph_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = F5Model::load(dir.path(), &F5ModelParams::default())
            .err()
            .expect("loading an empty directory should fail");
        match err {
            F5Error::Io(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
                assert!(e.to_string().contains("F5_Preprocess.onnx"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn inference_error_names_stage() {
        let err = F5Error::Inference {
            stage: Stage::Transformer,
            reason: "shape mismatch".to_string(),
        };
        assert_eq!(err.to_string(), "transformer stage failed: shape mismatch");
    }
}
