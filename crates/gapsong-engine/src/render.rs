//! Offline rendering.
//!
//! Drives a [`Session`] in offline mode faster than real time and
//! collects the output into a [`StereoBuffer`], optionally encoding it
//! straight to a WAV blob with a download-ready filename.

use crate::buffer::StereoBuffer;
use crate::error::EngineResult;
use crate::gap::Gap;
use crate::instrument::InstrumentBank;
use crate::session::{Session, SessionMode, BLOCK_FRAMES, OFFLINE_FADE_SECONDS};
use crate::wav::{encode_wav, wav_filename};
use crate::DEFAULT_SAMPLE_RATE;

/// Length floor for the offline buffer, in melody step times.
const MIN_RENDER_STEPS: f64 = 18.0;

/// A fully encoded piece ready for a download or upload path.
#[derive(Debug, Clone)]
pub struct RenderedSong {
    /// Complete WAV blob, 44-byte header plus PCM data.
    pub wav: Vec<u8>,
    /// Suggested filename derived from the gap's endpoint titles.
    pub filename: String,
    /// Sample rate the piece was rendered at.
    pub sample_rate: u32,
}

/// Renders a gap's piece to a stereo buffer at the default rate.
///
/// # Errors
/// Propagates session construction failures.
pub fn render(gap: &Gap, bank: &InstrumentBank) -> EngineResult<StereoBuffer> {
    render_with(gap, bank, DEFAULT_SAMPLE_RATE, None)
}

/// Renders with an explicit sample rate and optional seed.
///
/// A seed pins the onset jitter and the reverb impulse, making the
/// output fully reproducible; without one each render differs slightly,
/// just as live playback does.
pub fn render_with(
    gap: &Gap,
    bank: &InstrumentBank,
    sample_rate: u32,
    seed: Option<u32>,
) -> EngineResult<StereoBuffer> {
    let rate = f64::from(sample_rate);
    let mut session = match seed {
        Some(seed) => Session::seeded(gap, bank, rate, SessionMode::Offline, seed)?,
        None => Session::new(gap, bank, rate, SessionMode::Offline)?,
    };

    // Long enough for the whole melody plus its closing fade, but never
    // shorter than the fixed floor
    let step_time = session.score().params.step_time;
    let duration = (step_time * MIN_RENDER_STEPS).max(session.end_time() + OFFLINE_FADE_SECONDS);
    let frames = (duration * rate).round() as usize;

    let mut buffer = StereoBuffer::new(frames);
    let mut block_left = [0.0; BLOCK_FRAMES];
    let mut block_right = [0.0; BLOCK_FRAMES];
    let mut done = 0;
    while done < frames {
        session.process_block(&mut block_left, &mut block_right);
        let take = BLOCK_FRAMES.min(frames - done);
        buffer.left[done..done + take].copy_from_slice(&block_left[..take]);
        buffer.right[done..done + take].copy_from_slice(&block_right[..take]);
        done += take;
    }

    Ok(buffer)
}

/// Renders and encodes a piece in one step at the default rate.
///
/// # Errors
/// Propagates session construction failures.
pub fn render_song(gap: &Gap, bank: &InstrumentBank) -> EngineResult<RenderedSong> {
    render_song_with(gap, bank, DEFAULT_SAMPLE_RATE, None)
}

/// Renders and encodes with an explicit sample rate and optional seed.
///
/// # Errors
/// Propagates session construction failures.
pub fn render_song_with(
    gap: &Gap,
    bank: &InstrumentBank,
    sample_rate: u32,
    seed: Option<u32>,
) -> EngineResult<RenderedSong> {
    let buffer = render_with(gap, bank, sample_rate, seed)?;
    Ok(RenderedSong {
        wav: encode_wav(&buffer, sample_rate),
        filename: wav_filename(gap),
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEST_RATE: u32 = 800;

    fn test_gap() -> Gap {
        serde_json::from_str(
            r#"{
                "id": "render-test",
                "semanticSimilarity": 0.5,
                "distance": 4.0,
                "center": [1.0, 2.0],
                "from": { "title": "alpha" },
                "to": { "title": "omega" }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_render_length_covers_melody_and_fade() {
        let gap = test_gap();
        let bank = InstrumentBank::builtin(f64::from(TEST_RATE));
        let buffer = render_with(&gap, &bank, TEST_RATE, Some(11)).unwrap();

        // similarity 0.5: tempo 130, step time 60/130
        let step_time = 60.0 / 130.0;
        let min_frames = (step_time * 18.0 * f64::from(TEST_RATE)).round() as usize;
        assert!(buffer.len() >= min_frames);

        // The natural end sits near 16 step times; the buffer must
        // reach past it by the closing fade
        let end_estimate = step_time * 16.0;
        let reach = (end_estimate + 0.4) * f64::from(TEST_RATE);
        assert!(buffer.len() as f64 > reach);
    }

    #[test]
    fn test_render_is_audible_and_bounded() {
        let gap = test_gap();
        let bank = InstrumentBank::builtin(f64::from(TEST_RATE));
        let buffer = render_with(&gap, &bank, TEST_RATE, Some(4)).unwrap();

        assert!(buffer.peak() > 0.01);
        assert!(buffer.left.iter().all(|s| s.is_finite()));
        assert!(buffer.right.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_seeded_render_is_reproducible() {
        let gap = test_gap();
        let bank = InstrumentBank::builtin(f64::from(TEST_RATE));

        let first = render_with(&gap, &bank, TEST_RATE, Some(77)).unwrap();
        let second = render_with(&gap, &bank, TEST_RATE, Some(77)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_song_bundles_wav_and_filename() {
        let gap = test_gap();
        let bank = InstrumentBank::builtin(f64::from(TEST_RATE));
        let song = render_song_with(&gap, &bank, TEST_RATE, Some(11)).unwrap();

        assert_eq!(song.filename, "SongFromGap_alpha_to_omega.wav");
        assert_eq!(song.sample_rate, TEST_RATE);
        assert_eq!(&song.wav[0..4], b"RIFF");
        assert!(song.wav.len() > 44);

        // Encoded length matches the rendered frame count
        let buffer = render_with(&gap, &bank, TEST_RATE, Some(11)).unwrap();
        assert_eq!(song.wav.len(), buffer.len() * 4 + 44);
    }
}
