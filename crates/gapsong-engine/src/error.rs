//! Error types for the sonification engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while building or rendering a piece.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An instrument buffer contained no samples.
    #[error("instrument '{name}' has no samples")]
    EmptyInstrument {
        /// Instrument name (bass, harmony, melody).
        name: String,
    },

    /// An instrument WAV file could not be read or decoded.
    #[error("failed to load instrument from {path}: {source}")]
    InstrumentLoad {
        /// Path of the file that failed.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: hound::Error,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates an invalid parameter error.
    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an empty-instrument error.
    pub fn empty_instrument(name: impl Into<String>) -> Self {
        Self::EmptyInstrument { name: name.into() }
    }
}
