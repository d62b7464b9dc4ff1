//! `scoresynth-play`: a thin reference binary wiring the engine to a real
//! `cpal` output stream. Not part of the core — it only exists so the
//! crate is runnable end to end, the same role `bonnie-32`'s `audio.rs`
//! plays for its PS1 SPU core.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;

use scoresynth::compiler::compile_voice;
use scoresynth::config::EngineConfig;
use scoresynth::driver::{AudioDriver, CpalDriver};
use scoresynth::parser;
use scoresynth::sequencer::Sequencer;

#[derive(Parser)]
#[command(name = "scoresynth-play")]
#[command(about = "Play a LilyPond-style notation string through the default audio device", long_about = None)]
struct Cli {
    /// Inline notation text (see spec grammar in the crate docs).
    #[arg(conflicts_with = "file")]
    notation: Option<String>,

    /// Read the notation from a file instead of the command line.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Optional RON config file (sample rate, tempo, key, temperament, ...).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let notation = match (&cli.notation, &cli.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("scoresynth-play: failed to read {}: {e}", path.display());
            std::process::exit(1);
        }),
        (None, None) => {
            eprintln!("scoresynth-play: pass notation text or --file <path>");
            std::process::exit(1);
        }
    };

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).unwrap_or_else(|e| {
            eprintln!("scoresynth-play: failed to load config {}: {e}", path.display());
            std::process::exit(1);
        }),
        None => EngineConfig::default(),
    };

    let params = config.to_compile_params().unwrap_or_else(|e| {
        eprintln!("scoresynth-play: bad config: {e}");
        std::process::exit(1);
    });

    let notes = parser::parse(&notation);
    log::info!("parsed {} notes/chord-members", notes.len());

    let events = compile_voice(&notes, &params);
    log::info!("compiled {} events", events.len());

    let sequencer = Arc::new(Mutex::new(Sequencer::new(events, params.sample_rate)));

    let mut driver = CpalDriver::new();
    if let Err(e) = driver.init(params.sample_rate) {
        eprintln!("scoresynth-play: {e}");
        std::process::exit(1);
    }
    if let Err(e) = driver.play(Arc::clone(&sequencer)) {
        eprintln!("scoresynth-play: {e}");
        std::process::exit(1);
    }

    loop {
        std::thread::sleep(Duration::from_millis(100));
        if scoresynth::driver::lock_or_recover(&sequencer).completed() {
            break;
        }
    }
}
