//! Render a gap to a WAV file on disk.
//!
//! Pass a path to a gap JSON record, or run without arguments to render
//! a built-in sample gap:
//!
//! ```text
//! cargo run --example render_wav -- my_gap.json
//! ```

use gapsong_engine::{render_song, Gap, InstrumentBank, DEFAULT_SAMPLE_RATE};

const SAMPLE_GAP: &str = r#"{
    "id": "example-gap",
    "semanticSimilarity": 0.62,
    "distance": 3.4,
    "center": [1.5, -0.75],
    "sharedLinks": ["Harmony", "Graph"],
    "from": { "title": "Music theory" },
    "to": { "title": "Network science" }
}"#;

fn main() {
    let gap: Gap = match std::env::args().nth(1) {
        Some(path) => {
            println!("Reading gap record from {path}...");
            let json = match std::fs::read_to_string(&path) {
                Ok(json) => json,
                Err(e) => {
                    eprintln!("Error reading {path}: {e}");
                    std::process::exit(1);
                }
            };
            match serde_json::from_str(&json) {
                Ok(gap) => gap,
                Err(e) => {
                    eprintln!("Error parsing {path}: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            println!("No gap record given, rendering the built-in sample...");
            serde_json::from_str(SAMPLE_GAP).unwrap()
        }
    };

    println!("Rendering gap '{}'...", gap.id);
    let bank = InstrumentBank::builtin(f64::from(DEFAULT_SAMPLE_RATE));

    match render_song(&gap, &bank) {
        Ok(song) => {
            let frames = (song.wav.len().saturating_sub(44)) / 4;
            let seconds = frames as f64 / f64::from(song.sample_rate);
            println!("Success!");
            println!("  Sample rate: {} Hz", song.sample_rate);
            println!("  Duration: {seconds:.2} seconds");
            println!("  WAV size: {} bytes", song.wav.len());

            if let Err(e) = std::fs::write(&song.filename, &song.wav) {
                eprintln!("Error writing {}: {e}", song.filename);
                std::process::exit(1);
            }
            println!("  Wrote {}", song.filename);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
