//! The playback facade.
//!
//! [`Player`] turns gap records into sound on the default output
//! device. The output stream and the instrument bank are brought up on
//! the first play and reused for every piece after that.

use std::path::PathBuf;

use tracing::{debug, warn};

use gapsong_engine::{Gap, InstrumentBank, Session, SessionMode};

use crate::error::{PlaybackError, PlaybackResult};
use crate::feeder::{FeederCommand, OnEnded};
use crate::output::LiveOutput;

/// Observable player lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No piece is sounding.
    Idle,
    /// The output and instrument bank are being brought up.
    Starting,
    /// A piece is sounding.
    Playing,
    /// A stop was requested; the fade and reverb tail are draining.
    Stopping,
}

/// Plays gap pieces through the default output device.
///
/// At most one piece sounds at a time; playing again replaces the
/// current piece. Dropping the player tears the stream down immediately
/// and cuts off whatever is still sounding.
pub struct Player {
    instruments_dir: Option<PathBuf>,
    bank: Option<InstrumentBank>,
    output: Option<LiveOutput>,
    state: PlayerState,
}

impl Player {
    /// A player over the deterministic builtin instrument bank.
    pub fn new() -> Self {
        Self {
            instruments_dir: None,
            bank: None,
            output: None,
            state: PlayerState::Idle,
        }
    }

    /// A player that loads `bass.wav`, `harmony.wav`, and `melody.wav`
    /// from `dir` instead of synthesizing the builtin bank.
    ///
    /// Loading happens on the first play. A failure is returned from
    /// that call and loading is retried on the next one.
    pub fn with_instruments_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            instruments_dir: Some(dir.into()),
            ..Self::new()
        }
    }

    /// Starts playing `gap`, replacing any current piece.
    ///
    /// `on_ended` runs on the feeder thread, exactly once, if the piece
    /// reaches its natural end. It does not run when the piece is
    /// stopped or replaced.
    ///
    /// # Errors
    /// Returns an error if no output device is available, the stream
    /// cannot be built, or the instrument bank fails to load. The
    /// player is left idle and the next call starts from scratch.
    pub fn play<F>(&mut self, gap: &Gap, on_ended: F) -> PlaybackResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.state = PlayerState::Starting;
        match self.start(gap, Box::new(on_ended)) {
            Ok(()) => {
                self.state = PlayerState::Playing;
                Ok(())
            }
            Err(err) => {
                self.state = PlayerState::Idle;
                Err(err)
            }
        }
    }

    /// Stops the current piece with its short closing fade.
    ///
    /// Safe to call at any time; stopping an idle player is a no-op.
    /// The stopped piece's completion callback never runs.
    pub fn stop(&mut self) {
        let Some(output) = &self.output else {
            return;
        };
        if matches!(self.state, PlayerState::Starting | PlayerState::Playing) {
            self.state = PlayerState::Stopping;
        }
        if let Err(err) = output.send(FeederCommand::Stop) {
            warn!("stop command not delivered: {}", err);
        }
    }

    /// The player's current lifecycle state.
    ///
    /// `Playing` and `Stopping` resolve to `Idle` once the feeder has
    /// drained the piece, whether it ended naturally or was stopped.
    pub fn state(&self) -> PlayerState {
        match self.state {
            PlayerState::Playing | PlayerState::Stopping => match &self.output {
                Some(output) if output.is_alive() && output.is_busy() => self.state,
                _ => PlayerState::Idle,
            },
            other => other,
        }
    }

    fn start(&mut self, gap: &Gap, on_ended: OnEnded) -> PlaybackResult<()> {
        let rate = f64::from(self.ensure_output()?.sample_rate());
        let bank = self.ensure_bank(rate)?;
        let session = Session::new(gap, &bank, rate, SessionMode::Live)?;
        debug!("starting piece for gap '{}'", gap.id);
        self.ensure_output()?.send(FeederCommand::Play {
            session: Box::new(session),
            on_ended: Some(on_ended),
        })
    }

    /// Opens the output on first use and replaces it if its feeder
    /// thread has died.
    fn ensure_output(&mut self) -> PlaybackResult<&LiveOutput> {
        if self.output.as_ref().is_some_and(|output| !output.is_alive()) {
            warn!("feeder thread is gone, reopening the output");
            self.output = None;
        }
        if self.output.is_none() {
            self.output = Some(LiveOutput::open()?);
        }
        self.output
            .as_ref()
            .ok_or(PlaybackError::FeederDisconnected)
    }

    /// Returns the memoized bank, loading or synthesizing it on first
    /// use. A load failure leaves the slot empty so the next call
    /// retries.
    fn ensure_bank(&mut self, sample_rate: f64) -> PlaybackResult<InstrumentBank> {
        if let Some(bank) = &self.bank {
            return Ok(bank.clone());
        }
        let bank = match &self.instruments_dir {
            Some(dir) => InstrumentBank::load_dir(dir).map_err(|err| {
                warn!("loading instruments from {} failed: {}", dir.display(), err);
                err
            })?,
            None => InstrumentBank::builtin(sample_rate),
        };
        debug!("instrument bank ready");
        self.bank = Some(bank.clone());
        Ok(bank)
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn write_test_instrument(path: &std::path::Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..400_i32 {
            let value = ((i as f64 * 0.2).sin() * 12_000.0) as i16;
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_new_player_is_idle() {
        let player = Player::new();
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn test_stop_when_idle_is_a_noop() {
        let mut player = Player::new();
        player.stop();
        player.stop();
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn test_builtin_bank_is_memoized() {
        let mut player = Player::new();
        let first = player.ensure_bank(8_000.0).unwrap();
        let second = player.ensure_bank(8_000.0).unwrap();
        assert!(Arc::ptr_eq(&first.bass, &second.bass));
        assert!(Arc::ptr_eq(&first.melody, &second.melody));
    }

    #[test]
    fn test_bank_load_failure_retries_on_the_next_call() {
        let dir = tempfile::tempdir().unwrap();
        let instruments = dir.path().join("instruments");
        let mut player = Player::with_instruments_dir(&instruments);

        // Nothing there yet: the load fails and nothing is memoized
        assert!(player.ensure_bank(8_000.0).is_err());
        assert!(player.bank.is_none());

        std::fs::create_dir(&instruments).unwrap();
        write_test_instrument(&instruments.join("bass.wav"));
        write_test_instrument(&instruments.join("harmony.wav"));
        write_test_instrument(&instruments.join("melody.wav"));

        let bank = player.ensure_bank(8_000.0).unwrap();
        assert!(player.bank.is_some());
        assert_eq!(bank.bass.samples.len(), 400);
        assert_eq!(bank.bass.sample_rate, 8_000.0);
    }

    #[test]
    fn test_partial_instrument_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_test_instrument(&dir.path().join("bass.wav"));

        let mut player = Player::with_instruments_dir(dir.path());
        assert!(player.ensure_bank(8_000.0).is_err());
        assert!(player.bank.is_none());
    }
}
