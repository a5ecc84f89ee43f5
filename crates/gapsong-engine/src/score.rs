//! The deterministic plan for one piece.
//!
//! A [`Score`] is everything about a piece that must be identical
//! between live playback and offline rendering: the normalized control
//! values, each voice's pitch ratio, and the full 32-note melody table.
//! Timing jitter is the one intentionally non-reproducible quantity; it
//! stays out of the score and is drawn at session build through
//! [`melody_onsets`], the single onset recurrence both drivers share.

use rand::Rng;
use rand_pcg::Pcg32;

use crate::gap::Gap;
use crate::params::ScoreParams;
use crate::scale::{
    note_frequency, playback_rate, BASS_NATIVE_HZ, HARMONY_NATIVE_HZ, MELODY_NATIVE_HZ,
};

/// Number of melody steps in a piece.
pub const MELODY_STEPS: usize = 32;

/// One planned melody note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MelodyNote {
    /// 0-indexed step.
    pub step: usize,
    /// Seed code unit that produced the note (0 for an empty seed).
    pub char_code: u32,
    /// Scale index, always in 16..=31.
    pub pitch_index: u32,
    /// Target frequency in Hz.
    pub frequency: f64,
    /// Playback-rate multiplier against the melody instrument.
    pub rate: f64,
}

/// The full deterministic plan derived from a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    /// Normalized control values.
    pub params: ScoreParams,
    /// Bass target frequency: half the scale tone at the center's x.
    pub bass_frequency: f64,
    /// Bass playback rate against its 65.41 Hz native pitch.
    pub bass_rate: f64,
    /// Harmony target frequency: the scale tone four steps above the
    /// center's y.
    pub harmony_frequency: f64,
    /// Harmony playback rate against its 440 Hz native pitch.
    pub harmony_rate: f64,
    /// Tremolo LFO rate in Hz for the harmony gain.
    pub tremolo_rate: f64,
    /// The 32 melody notes in step order.
    pub melody: Vec<MelodyNote>,
}

impl Score {
    /// Computes the plan for a gap.
    ///
    /// Pure: the same gap always yields the same score, in either
    /// playback mode.
    pub fn from_gap(gap: &Gap) -> Self {
        let params = ScoreParams::from_gap(gap);
        let [center_x, center_y] = gap.center;

        let bass_frequency = note_frequency(center_x) / 2.0;
        let harmony_frequency = note_frequency(center_y + 4.0);
        let tremolo_rate = if center_y.is_finite() {
            0.2 + center_y.abs() * 0.5
        } else {
            0.2
        };

        let seed = gap.seed_units();
        let melody = (0..MELODY_STEPS)
            .map(|step| {
                let char_code = if seed.is_empty() {
                    0
                } else {
                    seed[step % seed.len()] as u32
                };
                let pitch_index = ((char_code as usize + step) % 16 + 16) as u32;
                let frequency = note_frequency(pitch_index as f64);
                MelodyNote {
                    step,
                    char_code,
                    pitch_index,
                    frequency,
                    rate: playback_rate(frequency, MELODY_NATIVE_HZ),
                }
            })
            .collect();

        Self {
            params,
            bass_frequency,
            bass_rate: playback_rate(bass_frequency, BASS_NATIVE_HZ),
            harmony_frequency,
            harmony_rate: playback_rate(harmony_frequency, HARMONY_NATIVE_HZ),
            tremolo_rate,
            melody,
        }
    }
}

/// Computes the jittered onset schedule for a piece.
///
/// The first note lands at 0; each subsequent onset is a half step plus
/// a jitter draw of `uniform(-0.5, 0.5) * jitter_amount * step_time`
/// after the previous one. The returned vector holds one entry past the
/// last note: the instant the piece ends and the master fade begins.
///
/// Jitter never exceeds 40% of a step, so onsets are strictly
/// increasing.
pub fn melody_onsets(params: &ScoreParams, rng: &mut Pcg32) -> Vec<f64> {
    let mut onsets = Vec::with_capacity(MELODY_STEPS + 1);
    let mut t = 0.0;
    for _ in 0..=MELODY_STEPS {
        onsets.push(t);
        let jitter = (rng.gen::<f64>() - 0.5) * params.jitter_amount * params.step_time;
        t += params.step_time / 2.0 + jitter;
    }
    onsets
}
