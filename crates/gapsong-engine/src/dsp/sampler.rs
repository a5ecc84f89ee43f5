//! Pitch-shifting sample playback.

use std::sync::Arc;

use crate::instrument::Instrument;

/// Plays an [`Instrument`] buffer at an arbitrary pitch ratio.
///
/// The read head advances by `pitch_ratio * source_rate / output_rate`
/// frames per output sample, with linear interpolation between frames.
/// Advancing the head is exactly equivalent to resampling the buffer up
/// front and stepping through it by the pitch ratio alone, so sessions
/// at any output rate hear the same instrument.
#[derive(Debug, Clone)]
pub struct Sampler {
    source: Arc<Instrument>,
    position: f64,
    step: f64,
    looping: bool,
    finished: bool,
}

impl Sampler {
    fn new(source: Arc<Instrument>, pitch_ratio: f64, output_rate: f64, looping: bool) -> Self {
        let step = pitch_ratio * source.sample_rate / output_rate;
        Self {
            source,
            position: 0.0,
            step,
            looping,
            finished: false,
        }
    }

    /// Creates a sampler that wraps around at the end of the buffer.
    pub fn looping(source: Arc<Instrument>, pitch_ratio: f64, output_rate: f64) -> Self {
        Self::new(source, pitch_ratio, output_rate, true)
    }

    /// Creates a sampler that plays the buffer once and goes silent.
    pub fn one_shot(source: Arc<Instrument>, pitch_ratio: f64, output_rate: f64) -> Self {
        Self::new(source, pitch_ratio, output_rate, false)
    }

    /// Returns true once a one-shot sampler has run off the end of its
    /// buffer, or after [`stop`](Self::stop).
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Silences the sampler immediately. Stopping twice is a no-op.
    pub fn stop(&mut self) {
        self.finished = true;
    }

    /// Generates the next output sample.
    pub fn next_sample(&mut self) -> f64 {
        if self.finished {
            return 0.0;
        }

        let samples = &self.source.samples;
        let len = samples.len();
        let index = self.position as usize;
        let frac = self.position - index as f64;

        let current = samples[index];
        let next = if index + 1 < len {
            samples[index + 1]
        } else if self.looping {
            samples[0]
        } else {
            0.0
        };
        let value = current + (next - current) * frac;

        self.position += self.step;
        if self.position >= len as f64 {
            if self.looping {
                self.position %= len as f64;
            } else {
                self.finished = true;
            }
        }

        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_instrument(len: usize, sample_rate: f64) -> Arc<Instrument> {
        let samples: Vec<f64> = (0..len).map(|i| i as f64).collect();
        Arc::new(Instrument::new(samples, sample_rate, 440.0).unwrap())
    }

    #[test]
    fn test_unity_rate_reads_straight_through() {
        let source = ramp_instrument(16, 1000.0);
        let mut sampler = Sampler::one_shot(source, 1.0, 1000.0);

        for expected in 0..16 {
            assert_eq!(sampler.next_sample(), expected as f64);
        }
        assert!(sampler.is_finished());
        assert_eq!(sampler.next_sample(), 0.0);
    }

    #[test]
    fn test_half_rate_interpolates_midpoints() {
        let source = ramp_instrument(4, 1000.0);
        let mut sampler = Sampler::one_shot(source, 0.5, 1000.0);

        assert_eq!(sampler.next_sample(), 0.0);
        assert_eq!(sampler.next_sample(), 0.5);
        assert_eq!(sampler.next_sample(), 1.0);
        assert_eq!(sampler.next_sample(), 1.5);
    }

    #[test]
    fn test_output_rate_scales_step() {
        // Doubling the output rate halves the per-sample step
        let source = ramp_instrument(8, 1000.0);
        let mut sampler = Sampler::one_shot(source, 1.0, 2000.0);

        assert_eq!(sampler.next_sample(), 0.0);
        assert_eq!(sampler.next_sample(), 0.5);
        assert_eq!(sampler.next_sample(), 1.0);
    }

    #[test]
    fn test_looping_wraps_around() {
        let source = ramp_instrument(4, 1000.0);
        let mut sampler = Sampler::looping(source, 1.0, 1000.0);

        let first_pass: Vec<f64> = (0..4).map(|_| sampler.next_sample()).collect();
        let second_pass: Vec<f64> = (0..4).map(|_| sampler.next_sample()).collect();
        assert_eq!(first_pass, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(second_pass, first_pass);
        assert!(!sampler.is_finished());
    }

    #[test]
    fn test_one_shot_tail_interpolates_to_silence() {
        let source = ramp_instrument(2, 1000.0);
        let mut sampler = Sampler::one_shot(source, 0.5, 1000.0);

        assert_eq!(sampler.next_sample(), 0.0);
        assert_eq!(sampler.next_sample(), 0.5);
        assert_eq!(sampler.next_sample(), 1.0);
        // Past the last frame the far endpoint is silence
        assert_eq!(sampler.next_sample(), 0.5);
        assert!(sampler.is_finished());
    }

    #[test]
    fn test_stop_silences_immediately() {
        let source = ramp_instrument(16, 1000.0);
        let mut sampler = Sampler::looping(source, 1.0, 1000.0);

        sampler.next_sample();
        sampler.stop();
        assert!(sampler.is_finished());
        assert_eq!(sampler.next_sample(), 0.0);
        sampler.stop();
        assert_eq!(sampler.next_sample(), 0.0);
    }
}
