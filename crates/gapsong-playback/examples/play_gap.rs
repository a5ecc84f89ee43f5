//! Play a gap through the default output device.
//!
//! Pass a path to a gap JSON record, or run without arguments to play
//! a built-in sample gap:
//!
//! ```text
//! cargo run --example play_gap -- my_gap.json
//! ```
//!
//! Set `RUST_LOG=debug` to watch the stream and feeder come up.

use std::sync::mpsc;
use std::time::Duration;

use gapsong_engine::Gap;
use gapsong_playback::Player;

const SAMPLE_GAP: &str = r#"{
    "id": "example-gap",
    "semanticSimilarity": 0.62,
    "distance": 3.4,
    "center": [1.5, -0.75],
    "sharedLinks": ["Harmony", "Graph"],
    "from": { "title": "Music theory" },
    "to": { "title": "Network science" }
}"#;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let gap: Gap = match std::env::args().nth(1) {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(&path)?)?,
        None => serde_json::from_str(SAMPLE_GAP)?,
    };

    let mut player = Player::new();
    let (tx, rx) = mpsc::channel();

    println!("Playing gap '{}'...", gap.id);
    player.play(&gap, move || {
        let _ = tx.send(());
    })?;

    // The callback fires when the last melody step has sounded
    rx.recv_timeout(Duration::from_secs(60))?;
    println!("Piece finished, letting the reverb tail ring out...");
    std::thread::sleep(Duration::from_secs(3));

    Ok(())
}
