use std::path::PathBuf;
use std::time::Instant;

use f5_tts_rs::{
    engines::f5::{F5Engine, F5InferenceParams, F5ModelParams, DEFAULT_CHUNK_BYTES},
    SynthesisEngine,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut engine = F5Engine::new();
    let model_path = PathBuf::from("models/f5");

    let load_start = Instant::now();
    engine.load_model_with_params(&model_path, F5ModelParams::default())?;
    println!("Model loaded in {:.2?}", load_start.elapsed());

    let params = F5InferenceParams {
        ref_audio: model_path.join("reference.wav"),
        ref_text: "In short, we embarked on a mission to make America great again for all Americans."
            .to_string(),
        chunk_max_bytes: Some(DEFAULT_CHUNK_BYTES),
    };
    let text = "简而言之, 我们开启了一项使命, 要让美国再次伟大, 造福所有美国人。";

    let synth_start = Instant::now();
    let result = engine.synthesize(text, Some(params))?;
    let synth_dur = synth_start.elapsed();

    let audio_duration = result.duration_secs();
    let speedup = audio_duration / synth_dur.as_secs_f64();
    println!(
        "Synthesized {:.2}s audio in {:.2?} ({:.1}x real-time)",
        audio_duration, synth_dur, speedup
    );

    result.write_wav(&PathBuf::from("output.wav"))?;
    println!("Saved to output.wav");

    engine.unload_model();
    Ok(())
}
