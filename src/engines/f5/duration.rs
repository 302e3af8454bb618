use super::model::F5Error;

/// Audio samples per mel frame.
pub const HOP_LENGTH: usize = 256;

/// Chinese pause punctuation that lengthens the spoken duration.
const PAUSE_PUNCTUATION: [char; 7] = ['。', '，', '、', '；', '：', '？', '！'];

/// Extra weight given to each pause punctuation mark.
const PAUSE_WEIGHT: usize = 3;

/// Number of mel frames covered by `mono_samples` samples of reference audio.
pub fn reference_frames(mono_samples: usize) -> usize {
    mono_samples / HOP_LENGTH + 1
}

/// UTF-8 byte length of `text` plus a penalty for every pause punctuation mark.
pub fn weighted_length(text: &str) -> usize {
    let pauses = text.chars().filter(|c| PAUSE_PUNCTUATION.contains(c)).count();
    text.len() + PAUSE_WEIGHT * pauses
}

/// Target output length in frames for reference audio spanning `ref_frames`.
///
/// The reference frame count is scaled by the ratio of generated to reference
/// text weight, with integer division on the frames-per-weight step.
pub fn estimate_duration(ref_frames: usize, ref_text: &str, gen_text: &str) -> Result<i64, F5Error> {
    let ref_len = weighted_length(ref_text);
    let gen_len = weighted_length(gen_text);
    if ref_len == 0 {
        return Err(F5Error::DivisionByZero);
    }

    let duration = ref_frames + (ref_frames / ref_len) * gen_len;
    log::debug!("Duration estimate: {ref_frames} ref frames, weights {ref_len}/{gen_len} -> {duration}");
    Ok(duration as i64)
}
