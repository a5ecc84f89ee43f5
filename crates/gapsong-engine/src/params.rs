//! Parameter normalization.
//!
//! Derives the musical control values of a piece (tempo, step timing,
//! rhythmic jitter, filter cutoff) from a gap's similarity and distance
//! fields, substituting documented defaults for non-finite input.

use crate::gap::Gap;

/// Default similarity when the gap's value is non-finite.
pub const DEFAULT_SIMILARITY: f64 = 0.1;

/// Default distance when the gap's value is non-finite.
pub const DEFAULT_DISTANCE: f64 = 1.0;

/// Resonance Q of the melody lowpass stage.
pub const FILTER_Q: f64 = 2.0;

/// Normalized musical control values for one piece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreParams {
    /// Similarity after default substitution.
    pub similarity: f64,
    /// Distance after default substitution.
    pub distance: f64,
    /// Tempo in BPM: `80 + similarity * 100`.
    pub tempo: f64,
    /// Seconds per beat: `60 / tempo`.
    pub step_time: f64,
    /// Fraction of a half step used as maximum timing randomness,
    /// clamped to 0.4. A non-finite distance means the timing is
    /// unbounded as far as the record can tell, so it clamps to the
    /// maximum rather than inheriting the normalized default.
    pub jitter_amount: f64,
    /// Melody lowpass cutoff in Hz: `1000 + similarity * 5000`.
    pub filter_cutoff: f64,
}

impl ScoreParams {
    /// Derives control values from a gap.
    pub fn from_gap(gap: &Gap) -> Self {
        let similarity = if gap.semantic_similarity.is_finite() {
            gap.semantic_similarity
        } else {
            DEFAULT_SIMILARITY
        };
        let distance = if gap.distance.is_finite() {
            gap.distance
        } else {
            DEFAULT_DISTANCE
        };
        let jitter_amount = if gap.distance.is_finite() {
            (gap.distance / 20.0).min(0.4)
        } else {
            0.4
        };

        let tempo = 80.0 + similarity * 100.0;
        Self {
            similarity,
            distance,
            tempo,
            step_time: 60.0 / tempo,
            jitter_amount,
            filter_cutoff: 1000.0 + similarity * 5000.0,
        }
    }
}
