//! The playback session.
//!
//! A [`Session`] owns every voice of one piece and produces its stereo
//! mix block by block. The live player drains it into a device ring
//! buffer and the offline renderer drains it into a [`Vec`]; both hear
//! the same thing because there is only this one signal path.
//!
//! Signal flow per sample: the bass and harmony loops and the filtered
//! melody bus are summed, shaped by the master gain, then split into a
//! dry tap and a convolution reverb. Melody notes trigger sample-
//! accurately at their precomputed onsets.

use std::sync::Arc;

use rand_pcg::Pcg32;

use crate::dsp::convolver::{reverb_impulse, StereoConvolver};
use crate::dsp::envelope::{LinearRamp, NoteEnvelope};
use crate::dsp::filter::BiquadFilter;
use crate::dsp::lfo::Lfo;
use crate::dsp::sampler::Sampler;
use crate::error::{EngineError, EngineResult};
use crate::gap::Gap;
use crate::instrument::{Instrument, InstrumentBank};
use crate::params::FILTER_Q;
use crate::rng::{create_rng, entropy_rng};
use crate::score::{melody_onsets, Score, MELODY_STEPS};

/// Frames produced per [`Session::process_block`] call.
pub const BLOCK_FRAMES: usize = 512;

/// Closing fade when a live session stops or ends.
pub const LIVE_FADE_SECONDS: f64 = 0.1;
/// Closing fade at the end of an offline render.
pub const OFFLINE_FADE_SECONDS: f64 = 0.5;

/// Master level after the anti-click attack.
const MASTER_LEVEL: f64 = 0.7;
/// Master attack length in seconds.
const MASTER_ATTACK_SECONDS: f64 = 0.1;
/// Dry tap level.
const DRY_LEVEL: f64 = 0.5;
/// Bass gain once its swell completes.
const BASS_LEVEL: f64 = 0.5;
/// Bass swell length in seconds.
const BASS_SWELL_SECONDS: f64 = 1.5;
/// Harmony base gain.
const HARMONY_LEVEL: f64 = 0.2;
/// Tremolo depth around the harmony base gain.
const TREMOLO_DEPTH: f64 = 0.1;
/// Melody note peak gain.
const MELODY_PEAK: f64 = 0.4;
/// Floor the melody note decay lands on.
const MELODY_FLOOR: f64 = 0.001;
/// Melody note attack in seconds.
const MELODY_ATTACK_SECONDS: f64 = 0.005;

/// Which driver consumes the session.
///
/// The musical content is identical in both modes; only the length of
/// the closing fade at the natural end differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Feeding an audio device in real time.
    Live,
    /// Rendering into a buffer faster than real time.
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    /// Voices sounding, melody notes still triggering.
    Running,
    /// Master gain ramping to zero.
    Fading,
    /// Sources silent, reverb tail flushing.
    Draining { blocks_left: usize },
    /// Nothing left to hear.
    Finished,
}

/// One melody note currently sounding.
struct ActiveNote {
    sampler: Sampler,
    envelope: NoteEnvelope,
}

/// Sample-domain state of one playing piece.
pub struct Session {
    sample_rate: f64,
    mode: SessionMode,
    score: Score,

    bass: Sampler,
    bass_swell: LinearRamp,
    harmony: Sampler,
    tremolo: Lfo,
    melody_buffer: Arc<Instrument>,
    active_notes: Vec<ActiveNote>,
    melody_filter: BiquadFilter,

    master: LinearRamp,
    convolver: StereoConvolver,
    mono_block: Vec<f64>,

    onsets: Vec<f64>,
    onset_frames: Vec<u64>,
    next_note: usize,
    frame_clock: u64,
    stage: Stage,
    ended_naturally: bool,
    natural_fade: f64,
}

impl Session {
    /// Creates a session with fresh entropy for the jitter and reverb
    /// impulse. Two sessions for the same gap will sound alike but not
    /// sample-identical.
    ///
    /// # Errors
    /// Returns an error if `sample_rate` is not finite and positive.
    pub fn new(
        gap: &Gap,
        bank: &InstrumentBank,
        sample_rate: f64,
        mode: SessionMode,
    ) -> EngineResult<Self> {
        Self::build(gap, bank, sample_rate, mode, entropy_rng())
    }

    /// Creates a fully deterministic session: the same gap, bank, rate,
    /// mode, and seed always produce the same samples.
    pub fn seeded(
        gap: &Gap,
        bank: &InstrumentBank,
        sample_rate: f64,
        mode: SessionMode,
        seed: u32,
    ) -> EngineResult<Self> {
        Self::build(gap, bank, sample_rate, mode, create_rng(seed))
    }

    fn build(
        gap: &Gap,
        bank: &InstrumentBank,
        sample_rate: f64,
        mode: SessionMode,
        mut rng: Pcg32,
    ) -> EngineResult<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(EngineError::invalid_param(
                "sample_rate",
                "must be finite and positive",
            ));
        }

        let score = Score::from_gap(gap);
        // Draw order matters for seeded reproducibility: onsets first,
        // then the impulse response
        let onsets = melody_onsets(&score.params, &mut rng);
        let onset_frames: Vec<u64> = onsets
            .iter()
            .map(|&t| (t * sample_rate).round() as u64)
            .collect();
        let (impulse_left, impulse_right) = reverb_impulse(sample_rate, &mut rng);
        let convolver = StereoConvolver::new(&impulse_left, &impulse_right, BLOCK_FRAMES);

        let natural_fade = match mode {
            SessionMode::Live => LIVE_FADE_SECONDS,
            SessionMode::Offline => OFFLINE_FADE_SECONDS,
        };

        Ok(Self {
            sample_rate,
            mode,
            bass: Sampler::looping(Arc::clone(&bank.bass), score.bass_rate, sample_rate),
            bass_swell: LinearRamp::new(0.0, BASS_LEVEL, BASS_SWELL_SECONDS, sample_rate),
            harmony: Sampler::looping(Arc::clone(&bank.harmony), score.harmony_rate, sample_rate),
            tremolo: Lfo::new(score.tremolo_rate, sample_rate),
            melody_buffer: Arc::clone(&bank.melody),
            active_notes: Vec::new(),
            melody_filter: BiquadFilter::lowpass(score.params.filter_cutoff, FILTER_Q, sample_rate),
            master: LinearRamp::new(0.0, MASTER_LEVEL, MASTER_ATTACK_SECONDS, sample_rate),
            convolver,
            mono_block: vec![0.0; BLOCK_FRAMES],
            onsets,
            onset_frames,
            next_note: 0,
            frame_clock: 0,
            stage: Stage::Running,
            ended_naturally: false,
            natural_fade,
            score,
        })
    }

    /// The deterministic plan this session is playing.
    pub fn score(&self) -> &Score {
        &self.score
    }

    /// Melody onset instants in seconds. 33 entries; the last one is
    /// the end instant at which the closing fade begins.
    pub fn onsets(&self) -> &[f64] {
        &self.onsets
    }

    /// The instant the piece ends and starts fading, in seconds.
    pub fn end_time(&self) -> f64 {
        self.onsets[MELODY_STEPS]
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// True once the closing fade and the reverb tail have both run out.
    pub fn finished(&self) -> bool {
        self.stage == Stage::Finished
    }

    /// True if the piece reached the end of its 32-step melody on its
    /// own. Stays false when [`stop`](Self::stop) cut it short.
    pub fn ended_naturally(&self) -> bool {
        self.ended_naturally
    }

    /// Cuts the piece short: pending notes are cancelled, sources go
    /// silent, and the master gain fades out over 100 ms. Stopping an
    /// already stopping or finished session is a no-op.
    pub fn stop(&mut self) {
        match self.stage {
            Stage::Running => {
                self.next_note = MELODY_STEPS;
                self.silence_sources();
                self.begin_fade(LIVE_FADE_SECONDS);
            }
            Stage::Fading => {
                self.silence_sources();
            }
            Stage::Draining { .. } | Stage::Finished => {}
        }
    }

    /// Fills one block of the stereo mix. Both slices must be
    /// [`BLOCK_FRAMES`] long. A finished session fills silence.
    pub fn process_block(&mut self, out_left: &mut [f64], out_right: &mut [f64]) {
        debug_assert_eq!(out_left.len(), BLOCK_FRAMES);
        debug_assert_eq!(out_right.len(), BLOCK_FRAMES);

        out_left.fill(0.0);
        out_right.fill(0.0);

        for i in 0..BLOCK_FRAMES {
            let value = self.next_bus_sample();
            self.mono_block[i] = value;
        }

        // Wet path, then the dry tap on top
        self.convolver
            .process_add(&self.mono_block, out_left, out_right);
        for i in 0..BLOCK_FRAMES {
            let dry = self.mono_block[i] * DRY_LEVEL;
            out_left[i] += dry;
            out_right[i] += dry;
        }

        self.advance_stage();
    }

    /// One sample of the post-master mono bus.
    fn next_bus_sample(&mut self) -> f64 {
        let frame = self.frame_clock;
        self.frame_clock += 1;

        match self.stage {
            Stage::Draining { .. } | Stage::Finished => return 0.0,
            Stage::Running => {
                while self.next_note < MELODY_STEPS && frame >= self.onset_frames[self.next_note] {
                    self.spawn_note(self.next_note);
                    self.next_note += 1;
                }
                if frame >= self.onset_frames[MELODY_STEPS] {
                    self.ended_naturally = true;
                    self.begin_fade(self.natural_fade);
                }
            }
            Stage::Fading => {}
        }

        let bass = self.bass.next_sample() * self.bass_swell.next_sample();
        let tremolo_gain = HARMONY_LEVEL + TREMOLO_DEPTH * self.tremolo.next_sample();
        let harmony = self.harmony.next_sample() * tremolo_gain;

        let mut melody = 0.0;
        for note in self.active_notes.iter_mut() {
            melody += note.sampler.next_sample() * note.envelope.next_sample();
        }
        self.active_notes
            .retain(|note| !note.envelope.is_done() && !note.sampler.is_finished());
        let melody = self.melody_filter.process(melody);

        (bass + harmony + melody) * self.master.next_sample()
    }

    fn spawn_note(&mut self, index: usize) {
        let note = self.score.melody[index];
        self.active_notes.push(ActiveNote {
            sampler: Sampler::one_shot(
                Arc::clone(&self.melody_buffer),
                note.rate,
                self.sample_rate,
            ),
            envelope: NoteEnvelope::new(
                MELODY_PEAK,
                MELODY_FLOOR,
                MELODY_ATTACK_SECONDS,
                self.score.params.step_time / 2.0,
                self.sample_rate,
            ),
        });
    }

    fn begin_fade(&mut self, duration: f64) {
        let level = self.master.level();
        self.master = LinearRamp::new(level, 0.0, duration, self.sample_rate);
        self.stage = Stage::Fading;
    }

    fn silence_sources(&mut self) {
        self.bass.stop();
        self.harmony.stop();
        self.active_notes.clear();
    }

    fn advance_stage(&mut self) {
        match self.stage {
            Stage::Fading if self.master.is_done() => {
                self.silence_sources();
                self.stage = Stage::Draining {
                    blocks_left: self.convolver.tail_blocks(),
                };
            }
            Stage::Draining { blocks_left } => {
                self.stage = if blocks_left <= 1 {
                    Stage::Finished
                } else {
                    Stage::Draining {
                        blocks_left: blocks_left - 1,
                    }
                };
            }
            _ => {}
        }
    }
}
