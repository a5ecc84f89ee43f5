//! Low-frequency oscillator.

use std::f64::consts::PI;

/// Sine LFO producing bipolar output in [-1, 1].
///
/// The harmony voice multiplies this into its gain for tremolo.
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f64,
    increment: f64,
}

impl Lfo {
    /// Creates an LFO at `frequency` Hz, starting at phase zero.
    pub fn new(frequency: f64, sample_rate: f64) -> Self {
        Self {
            phase: 0.0,
            increment: frequency / sample_rate,
        }
    }

    /// Generates the next LFO sample.
    pub fn next_sample(&mut self) -> f64 {
        let value = (2.0 * PI * self.phase).sin();
        self.phase += self.increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        value
    }
}
