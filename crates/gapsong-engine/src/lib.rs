//! Gapsong Engine
//!
//! This crate turns semantic gap records into short three-voice pieces:
//! - **Bass** - sustained low tone pitched from the gap's center x
//! - **Harmony** - sustained mid tone with tremolo, pitched from center y
//! - **Melody** - 32 plucked notes seeded by the gap's shared links
//!
//! # Overview
//!
//! A [`Gap`] record (similarity, distance, 2D center, shared links) is
//! normalized into a deterministic [`Score`], then played by a
//! [`Session`]: a block-based sample pipeline with a master gain, a
//! resonant melody filter, and a convolution reverb. The same session
//! type backs both real-time playback and offline WAV export, so the
//! two always sound the same.
//!
//! # Determinism
//!
//! Everything pitch- and timing-related derives from the gap record
//! alone. The only free randomness is the melody onset jitter and the
//! reverb impulse noise; both come from a single PCG32 stream, so a
//! seeded session reproduces its output byte for byte. Component seeds
//! are derived via BLAKE3 hashing.
//!
//! # Example
//!
//! ```ignore
//! use gapsong_engine::{render_song, Gap, InstrumentBank};
//!
//! let gap: Gap = serde_json::from_str(json_record)?;
//! let bank = InstrumentBank::builtin(44_100.0);
//! let song = render_song(&gap, &bank)?;
//!
//! std::fs::write(&song.filename, &song.wav)?;
//! ```
//!
//! # Crate Structure
//!
//! - [`gap`] - The input record and its melody seed
//! - [`scale`] - Eight-note scale table and frequency lookup
//! - [`params`] - Normalization of gap fields into playback parameters
//! - [`score`] - The deterministic note plan and onset jitter
//! - [`instrument`] - Instrument buffers, builtin synthesis, WAV loading
//! - [`session`] - The block-based playback session
//! - [`buffer`] - Non-interleaved stereo output buffer
//! - [`render`] - Offline rendering and WAV bundling
//! - [`wav`] - 16-bit PCM WAV encoding
//! - [`dsp`] - Envelopes, filter, LFO, sampler, convolver
//! - [`rng`] - Deterministic RNG with seed derivation
//! - [`error`] - Typed errors and the result alias

pub mod buffer;
pub mod dsp;
pub mod error;
pub mod gap;
pub mod instrument;
pub mod params;
pub mod render;
pub mod rng;
pub mod scale;
pub mod score;
pub mod session;
pub mod wav;

// Re-export main types at crate root
pub use buffer::StereoBuffer;
pub use error::{EngineError, EngineResult};
pub use gap::{Gap, GapEndpoint};
pub use instrument::{Instrument, InstrumentBank};
pub use params::ScoreParams;
pub use render::{render, render_song, render_song_with, render_with, RenderedSong};
pub use score::{MelodyNote, Score, MELODY_STEPS};
pub use session::{Session, SessionMode, BLOCK_FRAMES};
pub use wav::{encode_wav, wav_filename, WAV_MIME};

/// Sample rate used for offline export when none is specified.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
