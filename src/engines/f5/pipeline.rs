//! Three-stage F5 inference: preprocess, fixed-step refinement, decode.
//!
//! Stages are opaque: each takes an ordered list of tensors and returns an
//! ordered list of tensors. Only the count and order of those lists, plus the
//! dtypes of the inputs built here, are fixed.

use std::fmt;

use ndarray::{Array1, Array2, Array3, ArrayD};

use super::model::F5Error;

/// Number of transformer steps in the refinement schedule.
pub const REFINE_STEPS: usize = 32;

const PREPROCESS_OUTPUTS: usize = 6;
const REFINE_OUTPUTS: usize = 2;

/// An owned, dtype-tagged tensor passed between stages.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    F32(ArrayD<f32>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
}

impl Tensor {
    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::F32(a) => a.shape(),
            Tensor::I16(a) => a.shape(),
            Tensor::I32(a) => a.shape(),
            Tensor::I64(a) => a.shape(),
        }
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            Tensor::F32(_) => "float32",
            Tensor::I16(_) => "int16",
            Tensor::I32(_) => "int32",
            Tensor::I64(_) => "int64",
        }
    }
}

/// Identifies which stage of the pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    Transformer,
    Decode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Preprocess => "preprocess",
            Stage::Transformer => "transformer",
            Stage::Decode => "decode",
        })
    }
}

/// One numerical graph of the pipeline.
///
/// Implementations must serialize concurrent calls themselves; `run` takes
/// `&self` so a loaded model can be shared between requests.
pub trait InferenceStage {
    fn run(&self, inputs: Vec<Tensor>) -> Result<Vec<Tensor>, F5Error>;
}

/// The three stages a synthesis request runs through.
pub struct Stages<'a> {
    pub preprocess: &'a dyn InferenceStage,
    pub transformer: &'a dyn InferenceStage,
    pub decode: &'a dyn InferenceStage,
}

/// Per-request inputs to the preprocess stage.
pub struct PipelineInput<'a> {
    /// Mono reference audio at 24 kHz.
    pub audio: &'a [i16],
    /// Reference + generation token ids, shape `[1, L]`.
    pub text_ids: Array2<i32>,
    /// Target output length in frames.
    pub max_duration: i64,
}

/// Tensors threaded through the refinement loop.
///
/// Everything except `noise` and `time_step` is produced once by preprocess
/// and held fixed until decode.
struct PipelineState {
    noise: Tensor,
    rope_cos: Tensor,
    rope_sin: Tensor,
    cat_mel_text: Tensor,
    cat_mel_text_drop: Tensor,
    ref_signal_len: Tensor,
    time_step: Tensor,
}

impl PipelineState {
    fn from_preprocess(outputs: Vec<Tensor>) -> Result<Self, F5Error> {
        let [noise, rope_cos, rope_sin, cat_mel_text, cat_mel_text_drop, ref_signal_len] =
            expect_outputs::<PREPROCESS_OUTPUTS>(Stage::Preprocess, outputs)?;
        Ok(Self {
            noise,
            rope_cos,
            rope_sin,
            cat_mel_text,
            cat_mel_text_drop,
            ref_signal_len,
            time_step: Tensor::I32(Array1::from_elem(1, 0).into_dyn()),
        })
    }

    fn transformer_inputs(&self) -> Vec<Tensor> {
        vec![
            self.noise.clone(),
            self.rope_cos.clone(),
            self.rope_sin.clone(),
            self.cat_mel_text.clone(),
            self.cat_mel_text_drop.clone(),
            self.time_step.clone(),
        ]
    }

    fn advance(&mut self, outputs: Vec<Tensor>) -> Result<(), F5Error> {
        let [noise, time_step] = expect_outputs::<REFINE_OUTPUTS>(Stage::Transformer, outputs)?;
        self.noise = noise;
        self.time_step = time_step;
        Ok(())
    }
}

/// Run preprocess, [`REFINE_STEPS`] transformer steps and decode.
///
/// Returns the generated 16-bit signal. The first failing stage aborts the
/// whole request.
pub fn run_pipeline(stages: &Stages<'_>, input: PipelineInput<'_>) -> Result<Vec<i16>, F5Error> {
    let audio = Array3::from_shape_vec((1, 1, input.audio.len()), input.audio.to_vec())?;
    let preprocess_inputs = vec![
        Tensor::I16(audio.into_dyn()),
        Tensor::I32(input.text_ids.into_dyn()),
        Tensor::I64(Array1::from_elem(1, input.max_duration).into_dyn()),
    ];

    let outputs = run_stage(stages.preprocess, Stage::Preprocess, preprocess_inputs)?;
    let mut state = PipelineState::from_preprocess(outputs)?;

    for step in 0..REFINE_STEPS {
        log::debug!("Refinement step {}/{}", step + 1, REFINE_STEPS);
        let outputs = run_stage(stages.transformer, Stage::Transformer, state.transformer_inputs())?;
        state.advance(outputs)?;
    }

    let decode_inputs = vec![state.noise, state.ref_signal_len];
    let outputs = run_stage(stages.decode, Stage::Decode, decode_inputs)?;
    match outputs.into_iter().next() {
        Some(Tensor::I16(signal)) => Ok(signal.into_iter().collect()),
        Some(other) => Err(F5Error::Inference {
            stage: Stage::Decode,
            reason: format!("expected an int16 signal, got {}", other.dtype()),
        }),
        None => Err(F5Error::Inference {
            stage: Stage::Decode,
            reason: "no output".to_string(),
        }),
    }
}

fn run_stage(
    stage: &dyn InferenceStage,
    kind: Stage,
    inputs: Vec<Tensor>,
) -> Result<Vec<Tensor>, F5Error> {
    stage.run(inputs).map_err(|e| match e {
        e @ F5Error::Inference { .. } => e,
        other => F5Error::Inference {
            stage: kind,
            reason: other.to_string(),
        },
    })
}

fn expect_outputs<const N: usize>(stage: Stage, outputs: Vec<Tensor>) -> Result<[Tensor; N], F5Error> {
    let count = outputs.len();
    outputs.try_into().map_err(|_| F5Error::Inference {
        stage,
        reason: format!("expected {N} outputs, got {count}"),
    })
}
