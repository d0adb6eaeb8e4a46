//! Error types for audio-channel.
//!
//! The taxonomy is deliberately small. A full channel and an empty channel
//! are steady-state signals carried in the return values of
//! [`Producer::try_push`](crate::Producer::try_push) and
//! [`Consumer::try_pop`](crate::Consumer::try_pop), not errors - they are
//! never logged and never surface here. The types below cover the only
//! hard failures: construction-time misuse and the playback glue around
//! devices and files.

use std::path::PathBuf;

/// The one hard failure the channel itself can produce.
///
/// Returned from [`channel()`](crate::channel) when the requested capacity
/// cannot be honored. Construction fails loudly rather than clamping the
/// capacity to something the caller did not ask for.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The capacity is zero, or rounding it up to a power of two would
    /// overflow `usize`.
    #[error("invalid channel capacity: {requested}")]
    InvalidCapacity {
        /// The capacity that was requested.
        requested: usize,
    },
}

/// Errors from the playback glue: device binding, WAV parsing, file I/O.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    /// The requested output device was not found.
    #[error("output device not found: {name}")]
    DeviceNotFound {
        /// Name of the device that wasn't found.
        name: String,
    },

    /// No default output device is configured on this system.
    #[error("no default output device configured")]
    NoDefaultDevice,

    /// The device does not offer a sample format we can fill.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The format that wasn't supported.
        format: String,
    },

    /// The device cannot play at the file's sample rate.
    #[error("sample rate {requested}Hz not supported (available: {available:?})")]
    UnsupportedSampleRate {
        /// The requested sample rate.
        requested: u32,
        /// Sample rates the device reported as supported.
        available: Vec<u32>,
    },

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    BackendError(String),

    /// The input file is not a WAV file this crate can play.
    #[error("not a playable WAV file: {reason}")]
    InvalidWav {
        /// What was wrong with the file.
        reason: String,
    },

    /// A file could not be opened.
    #[error("file error: {path}: {source}")]
    FileError {
        /// Path to the file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while reading audio data.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel construction failed while setting up the block pool.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl PlaybackError {
    /// Creates an `InvalidWav` error with the given reason.
    pub fn invalid_wav(reason: impl Into<String>) -> Self {
        Self::InvalidWav {
            reason: reason.into(),
        }
    }
}
