//! # Gapsong Playback
//!
//! Live audio output for gap pieces. The deterministic engine stays
//! device-free; this crate drives it through the default output device.
//!
//! # Architecture
//!
//! ```text
//! caller thread              feeder thread               cpal thread
//!     |                           |                          |
//! [Player::play]---(channel)--->[receive command]            |
//!     |                         [Session::process_block]     |
//!     |                         [push]--------(ring)------>[drain]
//!     |                           |<---------(condvar)-------|
//! ```
//!
//! A [`Player`] owns one feeder thread and one output stream, brought
//! up lazily on the first play. The feeder owns the current
//! [`gapsong_engine::Session`] and pushes interleaved samples into a
//! lock-free ring; the stream callback only copies out of the ring, so
//! no allocation or synthesis ever happens on the audio thread.
//!
//! # Example
//!
//! ```no_run
//! use gapsong_engine::Gap;
//! use gapsong_playback::Player;
//!
//! fn play(gap: &Gap) -> gapsong_playback::PlaybackResult<()> {
//!     let mut player = Player::new();
//!     player.play(gap, || println!("piece finished"))?;
//!     // ... the piece sounds until it ends or player.stop() is called
//!     Ok(())
//! }
//! ```

pub mod error;
mod feeder;
mod output;
pub mod player;

pub use error::{PlaybackError, PlaybackResult};
pub use player::{Player, PlayerState};
