//! Instrument buffers and the three-voice bank.
//!
//! The engine plays three stored waveforms: a low sustained tone (bass),
//! a mid sustained tone (harmony), and a short plucked tone (melody).
//! Each is a mono f64 buffer with a known native pitch and source sample
//! rate; voices retune them purely by playback rate. Buffers are shared
//! read-only through `Arc`, so any number of sessions and renders can
//! run against one bank without copying.
//!
//! Two acquisition paths exist: a deterministic builtin bank synthesized
//! from BLAKE3-derived seeds, and WAV files decoded with hound.

use std::f64::consts::TAU;
use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use rand_pcg::Pcg32;

use crate::error::{EngineError, EngineResult};
use crate::rng::{create_rng, derive_component_seed};
use crate::scale::{BASS_NATIVE_HZ, HARMONY_NATIVE_HZ, MELODY_NATIVE_HZ};

/// Base seed for the builtin bank's synthesis streams.
const BUILTIN_BANK_SEED: u32 = 0x4741_5053;

/// Peak level the builtin buffers are normalized to.
const BUILTIN_PEAK: f64 = 0.9;

/// A decoded instrument waveform.
#[derive(Debug, Clone)]
pub struct Instrument {
    /// Mono time-domain samples in [-1, 1].
    pub samples: Vec<f64>,
    /// Sample rate the buffer was recorded or synthesized at.
    pub sample_rate: f64,
    /// Pitch of the recorded tone in Hz; playback rate 1.0 reproduces it.
    pub native_pitch: f64,
}

impl Instrument {
    /// Creates an instrument from raw samples.
    ///
    /// # Errors
    /// Returns an error if the buffer is empty or the sample rate or
    /// native pitch is not a positive finite number.
    pub fn new(samples: Vec<f64>, sample_rate: f64, native_pitch: f64) -> EngineResult<Self> {
        if samples.is_empty() {
            return Err(EngineError::invalid_param("samples", "must not be empty"));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(EngineError::invalid_param(
                "sample_rate",
                format!("must be positive, got {sample_rate}"),
            ));
        }
        if !(native_pitch.is_finite() && native_pitch > 0.0) {
            return Err(EngineError::invalid_param(
                "native_pitch",
                format!("must be positive, got {native_pitch}"),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
            native_pitch,
        })
    }

    /// Duration of the buffer in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// Loads an instrument from a WAV file.
    ///
    /// Multi-channel files are averaged to mono; 8/16/24/32-bit integer
    /// and 32-bit float PCM are accepted. The file's sample rate is
    /// preserved; samplers rescale to the session rate at playback time.
    pub fn from_wav_file(path: &Path, native_pitch: f64) -> EngineResult<Self> {
        let mut reader = hound::WavReader::open(path).map_err(|e| EngineError::InstrumentLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
        let spec = reader.spec();

        let read_err = |e: hound::Error| EngineError::InstrumentLoad {
            path: path.to_path_buf(),
            source: e,
        };

        let mono = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Float, 32) => {
                let samples: Vec<f32> =
                    reader.samples::<f32>().collect::<Result<_, _>>().map_err(read_err)?;
                to_mono(&samples, spec.channels, |s| s as f64)
            }
            (hound::SampleFormat::Int, 8) => {
                let samples: Vec<i8> =
                    reader.samples::<i8>().collect::<Result<_, _>>().map_err(read_err)?;
                to_mono(&samples, spec.channels, |s| s as f64 / 128.0)
            }
            (hound::SampleFormat::Int, 16) => {
                let samples: Vec<i16> =
                    reader.samples::<i16>().collect::<Result<_, _>>().map_err(read_err)?;
                to_mono(&samples, spec.channels, |s| s as f64 / 32768.0)
            }
            (hound::SampleFormat::Int, 24) => {
                let samples: Vec<i32> =
                    reader.samples::<i32>().collect::<Result<_, _>>().map_err(read_err)?;
                to_mono(&samples, spec.channels, |s| s as f64 / 8_388_608.0)
            }
            (hound::SampleFormat::Int, 32) => {
                let samples: Vec<i32> =
                    reader.samples::<i32>().collect::<Result<_, _>>().map_err(read_err)?;
                to_mono(&samples, spec.channels, |s| s as f64 / 2_147_483_648.0)
            }
            (format, bits) => {
                return Err(EngineError::invalid_param(
                    "bits_per_sample",
                    format!(
                        "unsupported WAV format in '{}': {bits}-bit {format:?}",
                        path.display()
                    ),
                ));
            }
        };

        Instrument::new(mono, spec.sample_rate as f64, native_pitch)
    }
}

/// Averages interleaved multi-channel samples to mono.
fn to_mono<T: Copy>(samples: &[T], channels: u16, normalize: impl Fn(T) -> f64) -> Vec<f64> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return samples.iter().map(|&s| normalize(s)).collect();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().map(|&s| normalize(s)).sum::<f64>() / channels as f64)
        .collect()
}

/// The three shared instrument buffers a piece plays.
#[derive(Debug, Clone)]
pub struct InstrumentBank {
    /// Low sustained tone, native pitch 65.41 Hz (C2).
    pub bass: Arc<Instrument>,
    /// Mid sustained tone, native pitch 440 Hz (A4).
    pub harmony: Arc<Instrument>,
    /// Short plucked tone, native pitch 523.25 Hz (C5).
    pub melody: Arc<Instrument>,
}

impl InstrumentBank {
    /// Wraps three instruments into a shared bank.
    pub fn new(bass: Instrument, harmony: Instrument, melody: Instrument) -> Self {
        Self {
            bass: Arc::new(bass),
            harmony: Arc::new(harmony),
            melody: Arc::new(melody),
        }
    }

    /// Synthesizes the builtin bank at the given sample rate.
    ///
    /// Fully deterministic: the same sample rate always produces the
    /// same three buffers. The sustained tones are additive drones cut
    /// to a whole number of cycles so they loop without a seam; the
    /// melody tone is a plucked string.
    pub fn builtin(sample_rate: f64) -> Self {
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            44_100.0
        };

        let mut bass_rng = create_rng(derive_component_seed(BUILTIN_BANK_SEED, "bass"));
        let mut harmony_rng = create_rng(derive_component_seed(BUILTIN_BANK_SEED, "harmony"));
        let mut melody_rng = create_rng(derive_component_seed(BUILTIN_BANK_SEED, "melody"));

        let bass = additive_drone(
            BASS_NATIVE_HZ,
            sample_rate,
            2.0,
            &[1.0, 0.45, 0.18, 0.07],
            &mut bass_rng,
        );
        let harmony = additive_drone(
            HARMONY_NATIVE_HZ,
            sample_rate,
            2.0,
            &[1.0, 0.25, 0.3, 0.12, 0.08],
            &mut harmony_rng,
        );
        let melody = plucked_tone(MELODY_NATIVE_HZ, sample_rate, 1.0, &mut melody_rng);

        Self {
            bass: Arc::new(Instrument {
                samples: bass,
                sample_rate,
                native_pitch: BASS_NATIVE_HZ,
            }),
            harmony: Arc::new(Instrument {
                samples: harmony,
                sample_rate,
                native_pitch: HARMONY_NATIVE_HZ,
            }),
            melody: Arc::new(Instrument {
                samples: melody,
                sample_rate,
                native_pitch: MELODY_NATIVE_HZ,
            }),
        }
    }

    /// Loads `bass.wav`, `harmony.wav`, and `melody.wav` from a directory.
    ///
    /// # Errors
    /// Returns the first load failure; a partially loaded directory never
    /// produces a bank.
    pub fn load_dir(dir: &Path) -> EngineResult<Self> {
        let load = |file: &str, pitch: f64, name: &str| -> EngineResult<Instrument> {
            let instrument = Instrument::from_wav_file(&dir.join(file), pitch)?;
            if instrument.samples.is_empty() {
                return Err(EngineError::empty_instrument(name));
            }
            Ok(instrument)
        };
        Ok(Self::new(
            load("bass.wav", BASS_NATIVE_HZ, "bass")?,
            load("harmony.wav", HARMONY_NATIVE_HZ, "harmony")?,
            load("melody.wav", MELODY_NATIVE_HZ, "melody")?,
        ))
    }
}

/// Synthesizes a loopable additive drone.
///
/// The buffer length is snapped to a whole number of fundamental cycles
/// and the frequency adjusted to fit exactly, so looping the buffer
/// produces no phase discontinuity. Partial phases are drawn from the
/// RNG.
fn additive_drone(
    frequency: f64,
    sample_rate: f64,
    seconds: f64,
    partial_amps: &[f64],
    rng: &mut Pcg32,
) -> Vec<f64> {
    let cycles = (seconds * frequency).round().max(1.0);
    let len = ((cycles * sample_rate) / frequency).round().max(1.0) as usize;
    let exact_freq = cycles * sample_rate / len as f64;

    let phases: Vec<f64> = partial_amps.iter().map(|_| rng.gen::<f64>() * TAU).collect();

    let mut out = vec![0.0; len];
    for (k, (&amp, &phase)) in partial_amps.iter().zip(phases.iter()).enumerate() {
        let partial_freq = exact_freq * (k + 1) as f64;
        let step = TAU * partial_freq / sample_rate;
        for (i, sample) in out.iter_mut().enumerate() {
            *sample += amp * (step * i as f64 + phase).sin();
        }
    }

    normalize_peak(&mut out, BUILTIN_PEAK);
    out
}

/// Synthesizes a plucked-string tone: a noise burst circulating through
/// a delay line with a two-point average lowpass and per-pass decay.
fn plucked_tone(frequency: f64, sample_rate: f64, seconds: f64, rng: &mut Pcg32) -> Vec<f64> {
    let delay_len = ((sample_rate / frequency).round() as usize).max(2);
    let mut delay: Vec<f64> = (0..delay_len).map(|_| rng.gen::<f64>() * 2.0 - 1.0).collect();

    let num_samples = (seconds * sample_rate).round().max(1.0) as usize;
    let mut out = Vec::with_capacity(num_samples);
    let mut pos = 0;
    let decay = 0.997;
    let blend = 0.6;

    for _ in 0..num_samples {
        let next = (pos + 1) % delay_len;
        let current = delay[pos];
        let filtered = blend * current + (1.0 - blend) * delay[next];
        delay[pos] = filtered * decay;
        out.push(current);
        pos = next;
    }

    normalize_peak(&mut out, BUILTIN_PEAK);
    out
}

/// Scales a buffer so its absolute peak hits `target`.
fn normalize_peak(samples: &mut [f64], target: f64) {
    let peak = samples.iter().fold(0.0_f64, |m, &s| m.max(s.abs()));
    if peak > 0.0 {
        let scale = target / peak;
        for s in samples.iter_mut() {
            *s *= scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_bank_is_deterministic() {
        let a = InstrumentBank::builtin(44_100.0);
        let b = InstrumentBank::builtin(44_100.0);
        assert_eq!(a.bass.samples, b.bass.samples);
        assert_eq!(a.harmony.samples, b.harmony.samples);
        assert_eq!(a.melody.samples, b.melody.samples);
    }

    #[test]
    fn test_builtin_bank_shape() {
        let bank = InstrumentBank::builtin(44_100.0);
        assert!(!bank.bass.samples.is_empty());
        assert!(!bank.harmony.samples.is_empty());
        assert!(!bank.melody.samples.is_empty());
        assert_eq!(bank.bass.native_pitch, BASS_NATIVE_HZ);
        assert_eq!(bank.harmony.native_pitch, HARMONY_NATIVE_HZ);
        assert_eq!(bank.melody.native_pitch, MELODY_NATIVE_HZ);
        // Drones are roughly two seconds, pluck one second.
        assert!((bank.bass.duration() - 2.0).abs() < 0.05);
        assert!((bank.melody.duration() - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_builtin_peak_bounded() {
        let bank = InstrumentBank::builtin(44_100.0);
        for inst in [&bank.bass, &bank.harmony, &bank.melody] {
            let peak = inst.samples.iter().fold(0.0_f64, |m, &s| m.max(s.abs()));
            assert!(peak <= BUILTIN_PEAK + 1e-9);
            assert!(peak > 0.1);
        }
    }

    #[test]
    fn test_drone_loops_cleanly() {
        let bank = InstrumentBank::builtin(44_100.0);
        let samples = &bank.bass.samples;
        // The synthesized value one past the end equals the first sample
        // when the buffer holds whole cycles; check the wrap step is no
        // larger than the typical adjacent-sample step.
        let wrap_jump = (samples[0] - samples[samples.len() - 1]).abs();
        let max_step = samples
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0_f64, f64::max);
        assert!(wrap_jump <= max_step * 1.5 + 1e-6);
    }

    #[test]
    fn test_pluck_decays() {
        let bank = InstrumentBank::builtin(44_100.0);
        let samples = &bank.melody.samples;
        let early: f64 = samples[0..2000].iter().map(|s| s * s).sum();
        let late: f64 = samples[samples.len() - 2000..].iter().map(|s| s * s).sum();
        assert!(early > late * 4.0);
    }

    #[test]
    fn test_instrument_new_rejects_empty() {
        assert!(Instrument::new(vec![], 44_100.0, 440.0).is_err());
    }

    #[test]
    fn test_instrument_new_rejects_bad_rate() {
        assert!(Instrument::new(vec![0.0], 0.0, 440.0).is_err());
        assert!(Instrument::new(vec![0.0], f64::NAN, 440.0).is_err());
        assert!(Instrument::new(vec![0.0], 44_100.0, -1.0).is_err());
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = Instrument::from_wav_file(&dir.path().join("missing.wav"), 440.0);
        assert!(err.is_err());
    }

    #[test]
    fn test_wav_round_trip_mono_16bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..1000_i32 {
            let value = ((i as f64 * 0.05).sin() * 16_000.0) as i16;
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();

        let inst = Instrument::from_wav_file(&path, 440.0).unwrap();
        assert_eq!(inst.samples.len(), 1000);
        assert_eq!(inst.sample_rate, 22_050.0);
        assert!(inst.samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_wav_stereo_averages_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(16_000_i16).unwrap();
            writer.write_sample(-16_000_i16).unwrap();
        }
        writer.finalize().unwrap();

        let inst = Instrument::from_wav_file(&path, 440.0).unwrap();
        assert_eq!(inst.samples.len(), 100);
        for &s in &inst.samples {
            assert!(s.abs() < 1e-9, "opposite channels should cancel, got {s}");
        }
    }
}
