//! Scale and pitch mapping.
//!
//! An eight-note ascending scale spanning arbitrary octaves, plus the
//! playback-rate helper that turns a target frequency into a sample
//! speed multiplier. Both functions are pure; every voice's pitch
//! derives from them.

/// The eight-note base scale in Hz, A3 through B4.
pub const SCALE: [f64; 8] = [
    220.00, 246.94, 261.63, 293.66, 329.63, 392.00, 440.00, 493.88,
];

/// Native pitch of the bass instrument (C2).
pub const BASS_NATIVE_HZ: f64 = 65.41;

/// Native pitch of the harmony instrument (A4).
pub const HARMONY_NATIVE_HZ: f64 = 440.0;

/// Native pitch of the melody instrument (C5).
pub const MELODY_NATIVE_HZ: f64 = 523.25;

/// Maps a scale index to a frequency in Hz.
///
/// The index is floored; the scale position is its euclidean remainder
/// mod 8, so negative indices wrap instead of crashing
/// (`note_frequency(-1.0)` is the top of the base octave). The octave
/// offset is the truncating quotient `floor(index) / 8`, which keeps
/// exact doubling for non-negative indices. A non-finite index yields
/// NaN so downstream rate computation falls back to its guard value.
///
/// # Arguments
/// * `index` - Scale index, may be negative or fractional
///
/// # Returns
/// Frequency in Hz
///
/// # Examples
/// ```
/// use gapsong_engine::scale::note_frequency;
///
/// assert_eq!(note_frequency(0.0), 220.00);
/// assert_eq!(note_frequency(8.0), 440.00);
/// assert_eq!(note_frequency(-1.0), 493.88);
/// assert_eq!(note_frequency(2.9), note_frequency(2.0));
/// ```
pub fn note_frequency(index: f64) -> f64 {
    if !index.is_finite() {
        return f64::NAN;
    }
    let floored = index.floor() as i64;
    let position = floored.rem_euclid(8) as usize;
    let octave = floored / 8;
    SCALE[position] * (octave as f64).exp2()
}

/// Computes the playback-rate multiplier that retunes a sample from its
/// native pitch to a target pitch.
///
/// Returns `target / base`, substituting `1.0` whenever the quotient is
/// non-finite (zero or non-finite base, non-finite target), so a bad
/// input degrades to the sample's native pitch rather than an error.
///
/// # Examples
/// ```
/// use gapsong_engine::scale::playback_rate;
///
/// assert_eq!(playback_rate(880.0, 440.0), 2.0);
/// assert_eq!(playback_rate(440.0, 0.0), 1.0);
/// ```
pub fn playback_rate(target: f64, base: f64) -> f64 {
    let ratio = target / base;
    if ratio.is_finite() {
        ratio
    } else {
        1.0
    }
}
