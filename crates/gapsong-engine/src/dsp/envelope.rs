//! Gain envelopes.
//!
//! Two shapes cover every voice in a session: a linear ramp that holds
//! its target (master attack, bass swell, closing fades) and a
//! percussive attack-decay envelope for melody notes.

/// Linear gain ramp that holds its target once reached.
#[derive(Debug, Clone)]
pub struct LinearRamp {
    start: f64,
    target: f64,
    total_samples: u64,
    position: u64,
}

impl LinearRamp {
    /// Creates a ramp from `start` to `target` over `duration` seconds.
    ///
    /// A zero or negative duration jumps straight to the target.
    pub fn new(start: f64, target: f64, duration: f64, sample_rate: f64) -> Self {
        let total_samples = (duration * sample_rate).round().max(0.0) as u64;
        Self {
            start,
            target,
            total_samples,
            position: 0,
        }
    }

    /// Creates a ramp already sitting at `level`.
    pub fn hold(level: f64) -> Self {
        Self {
            start: level,
            target: level,
            total_samples: 0,
            position: 0,
        }
    }

    /// The level the next call to [`next_sample`](Self::next_sample) will produce.
    pub fn level(&self) -> f64 {
        if self.position >= self.total_samples {
            self.target
        } else {
            let progress = self.position as f64 / self.total_samples as f64;
            self.start + (self.target - self.start) * progress
        }
    }

    /// Advances the ramp by one sample and returns the level for it.
    pub fn next_sample(&mut self) -> f64 {
        let value = self.level();
        if self.position < self.total_samples {
            self.position += 1;
        }
        value
    }

    /// Returns true once the ramp has reached its target.
    pub fn is_done(&self) -> bool {
        self.position >= self.total_samples
    }
}

/// Melody note envelope phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotePhase {
    /// Linear rise from silence to the peak.
    Attack,
    /// Exponential fall from the peak towards the floor.
    Decay,
    /// Envelope spent. Output is silence.
    Done,
}

/// Percussive note envelope.
///
/// Rises linearly to `peak` over the attack, then decays exponentially
/// so that it reaches `floor` exactly at `total` seconds from the
/// start, after which the note is spent.
#[derive(Debug, Clone)]
pub struct NoteEnvelope {
    peak: f64,
    attack_samples: u64,
    decay_samples: u64,
    decay_factor: f64,
    position: u64,
    level: f64,
    phase: NotePhase,
}

impl NoteEnvelope {
    /// Creates a note envelope.
    ///
    /// # Arguments
    /// * `peak` - Level reached at the end of the attack
    /// * `floor` - Level the exponential decay lands on
    /// * `attack` - Attack time in seconds
    /// * `total` - Time from the start at which the floor is reached
    /// * `sample_rate` - Audio sample rate in Hz
    pub fn new(peak: f64, floor: f64, attack: f64, total: f64, sample_rate: f64) -> Self {
        let attack_samples = (attack * sample_rate).round().max(1.0) as u64;
        let total_samples = (total * sample_rate).round().max(0.0) as u64;
        let decay_samples = total_samples.saturating_sub(attack_samples).max(1);
        // Exponential ramps need strictly positive endpoints
        let decay_factor = if peak > 0.0 && floor > 0.0 {
            (floor / peak).powf(1.0 / decay_samples as f64)
        } else {
            0.0
        };

        Self {
            peak,
            attack_samples,
            decay_samples,
            decay_factor,
            position: 0,
            level: peak,
            phase: NotePhase::Attack,
        }
    }

    /// Gets the current envelope phase.
    pub fn phase(&self) -> NotePhase {
        self.phase
    }

    /// Returns true once the envelope is spent.
    pub fn is_done(&self) -> bool {
        self.phase == NotePhase::Done
    }

    /// Generates the next envelope sample.
    pub fn next_sample(&mut self) -> f64 {
        match self.phase {
            NotePhase::Attack => {
                let value = self.peak * self.position as f64 / self.attack_samples as f64;
                self.position += 1;
                if self.position >= self.attack_samples {
                    self.phase = NotePhase::Decay;
                    self.position = 0;
                    self.level = self.peak;
                }
                value
            }
            NotePhase::Decay => {
                let value = self.level;
                self.level *= self.decay_factor;
                self.position += 1;
                if self.position >= self.decay_samples {
                    self.phase = NotePhase::Done;
                }
                value
            }
            NotePhase::Done => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_ramp_midpoint_and_hold() {
        let mut ramp = LinearRamp::new(0.0, 1.0, 0.1, 1000.0);

        assert_eq!(ramp.next_sample(), 0.0);
        for _ in 0..49 {
            ramp.next_sample();
        }
        // Sample 50 of 100 sits at the midpoint
        assert!((ramp.next_sample() - 0.5).abs() < 0.02);

        for _ in 0..60 {
            ramp.next_sample();
        }
        assert!(ramp.is_done());
        assert_eq!(ramp.next_sample(), 1.0);
        assert_eq!(ramp.next_sample(), 1.0);
    }

    #[test]
    fn test_linear_ramp_zero_duration_jumps() {
        let mut ramp = LinearRamp::new(0.0, 0.7, 0.0, 44100.0);
        assert!(ramp.is_done());
        assert_eq!(ramp.next_sample(), 0.7);
    }

    #[test]
    fn test_linear_ramp_level_does_not_advance() {
        let mut ramp = LinearRamp::new(0.0, 1.0, 0.01, 1000.0);
        assert_eq!(ramp.level(), 0.0);
        assert_eq!(ramp.level(), 0.0);
        assert_eq!(ramp.next_sample(), 0.0);
        assert!(ramp.level() > 0.0);
    }

    #[test]
    fn test_linear_ramp_downward_fade() {
        let mut ramp = LinearRamp::new(0.7, 0.0, 0.1, 1000.0);

        let first = ramp.next_sample();
        assert!((first - 0.7).abs() < 1e-12);
        for _ in 0..100 {
            ramp.next_sample();
        }
        assert!(ramp.is_done());
        assert_eq!(ramp.next_sample(), 0.0);
    }

    #[test]
    fn test_note_envelope_attack_reaches_peak() {
        let mut env = NoteEnvelope::new(0.4, 0.001, 0.005, 0.25, 1000.0);

        assert_eq!(env.next_sample(), 0.0);
        for _ in 0..4 {
            env.next_sample();
        }
        // First decay sample is the full peak
        assert!((env.next_sample() - 0.4).abs() < 1e-12);
        assert_eq!(env.phase(), NotePhase::Decay);
    }

    #[test]
    fn test_note_envelope_decay_is_monotone() {
        let mut env = NoteEnvelope::new(0.4, 0.001, 0.005, 0.25, 1000.0);
        for _ in 0..5 {
            env.next_sample();
        }

        let mut previous = env.next_sample();
        while !env.is_done() {
            let value = env.next_sample();
            if env.is_done() {
                break;
            }
            assert!(value < previous);
            assert!(value > 0.0);
            previous = value;
        }
    }

    #[test]
    fn test_note_envelope_spent_at_total() {
        let sample_rate = 1000.0;
        let mut env = NoteEnvelope::new(0.4, 0.001, 0.005, 0.25, sample_rate);

        let mut emitted = 0;
        while !env.is_done() {
            env.next_sample();
            emitted += 1;
            assert!(emitted <= 1000, "envelope never finished");
        }
        // 5 attack samples plus 245 decay samples
        assert_eq!(emitted, 250);
        assert_eq!(env.next_sample(), 0.0);
    }

    #[test]
    fn test_note_envelope_lands_near_floor() {
        let mut env = NoteEnvelope::new(0.4, 0.001, 0.005, 0.25, 1000.0);

        let mut last = 0.0;
        while !env.is_done() {
            let value = env.next_sample();
            if value > 0.0 {
                last = value;
            }
        }
        assert!(last > 0.0005);
        assert!(last < 0.002);
    }

    #[test]
    fn test_note_envelope_short_total_still_finishes() {
        // Total shorter than the attack collapses the decay to one sample
        let mut env = NoteEnvelope::new(0.4, 0.001, 0.005, 0.002, 1000.0);
        let mut emitted = 0;
        while !env.is_done() {
            env.next_sample();
            emitted += 1;
            assert!(emitted <= 100);
        }
        assert!(emitted >= 2);
    }
}
