//! WAV playback demonstration.
//!
//! Decodes a PCM-16 WAV file on the main thread and streams it to the
//! default output device through the block pool; the audio callback never
//! blocks and plays silence if the file thread falls behind.
//!
//! Run with: cargo run --example player -- foo.wav

use std::env;
use std::process::ExitCode;

use audio_channel::{play_file, PlayerConfig};

fn main() -> ExitCode {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: player <file.wav>");
        return ExitCode::FAILURE;
    };

    println!("Playing {path}...");
    if let Err(err) = play_file(&path, &PlayerConfig::default()) {
        eprintln!("playback failed: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
