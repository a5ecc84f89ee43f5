//! Error types for the live playback layer.

use thiserror::Error;

use gapsong_engine::EngineError;

/// Result type for playback operations.
pub type PlaybackResult<T> = Result<T, PlaybackError>;

/// Errors that can occur while bringing up or driving the output stream.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The host has no default output device.
    #[error("no audio output device available")]
    NoOutputDevice,

    /// The default output configuration could not be queried.
    #[error("failed to query the output configuration: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    /// The device wants a sample format the stream builder does not
    /// handle.
    #[error("unsupported output sample format {0:?}")]
    UnsupportedSampleFormat(cpal::SampleFormat),

    /// The output stream could not be built.
    #[error("failed to build the output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    /// The output stream refused to start.
    #[error("failed to start the output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The feeder thread is no longer accepting commands.
    #[error("audio feeder thread disconnected")]
    FeederDisconnected,

    /// A failure inside the sonification engine.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}
