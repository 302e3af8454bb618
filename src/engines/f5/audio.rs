use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::model::{F5Error, SAMPLE_RATE};

/// Reference clip ready for the preprocess stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceAudio {
    /// Mono 16-bit samples at [`SAMPLE_RATE`].
    pub samples: Vec<i16>,
    /// Samples per channel after resampling.
    pub mono_len: usize,
}

/// Load a reference WAV file, resample it to 24 kHz, downmix and quantize.
///
/// Accepts 16-bit integer PCM and 32-bit IEEE float input.
pub fn load_reference(path: &Path) -> Result<ReferenceAudio, F5Error> {
    let (samples, sample_rate, channels) = read_wav(path)?;
    log::debug!(
        "Reference {}: {} samples, {} Hz, {} channel(s)",
        path.display(),
        samples.len(),
        sample_rate,
        channels
    );

    let samples = resample(&samples, channels, sample_rate, SAMPLE_RATE)?;
    let mono_len = samples.len() / channels;
    let mono = downmix(&samples, channels);

    Ok(ReferenceAudio {
        samples: quantize(&mono),
        mono_len,
    })
}

/// Read interleaved samples normalized to [-1, 1], with rate and channel count.
fn read_wav(path: &Path) -> Result<(Vec<f32>, u32, usize), F5Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<Vec<_>, _>>()?,
        (hound::SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        (format, bits) => {
            return Err(F5Error::UnsupportedAudioFormat {
                bits,
                format: format!("{format:?}"),
            })
        }
    };

    Ok((samples, spec.sample_rate, spec.channels.max(1) as usize))
}

/// Resample interleaved audio from `from_rate` to `to_rate`, keeping the channel count.
///
/// Returns the input unchanged when the rates already match.
pub fn resample(
    samples: &[f32],
    channels: usize,
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<f32>, F5Error> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let frames = samples.len() / channels;
    let expected = (frames as f64 * ratio).round() as usize;

    let sinc_len = 256;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    // Trailing silence lets the filter run past its delay within one call
    let padded = frames + sinc_len;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, padded, channels)
        .map_err(|e| F5Error::Resample(e.to_string()))?;

    let planar: Vec<Vec<f32>> = (0..channels)
        .map(|ch| {
            let mut channel: Vec<f32> = samples.iter().skip(ch).step_by(channels).copied().collect();
            channel.resize(padded, 0.0);
            channel
        })
        .collect();

    let output = resampler
        .process(&planar, None)
        .map_err(|e| F5Error::Resample(e.to_string()))?;

    let delay = resampler.output_delay();
    let available = output.first().map_or(0, Vec::len);
    if available < delay + expected {
        return Err(F5Error::Resample(format!(
            "resampler produced {available} frames, need {} after a delay of {delay}",
            expected
        )));
    }

    let mut interleaved = Vec::with_capacity(expected * channels);
    for frame in delay..delay + expected {
        for channel in &output {
            interleaved.push(channel[frame]);
        }
    }

    log::debug!("Resampled {frames} frames at {from_rate} Hz to {expected} frames at {to_rate} Hz");
    Ok(interleaved)
}

/// Average interleaved channels into one.
pub fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Convert [-1, 1] samples to 16-bit, clamping anything out of range.
pub fn quantize(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&x| (x * 32767.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}
