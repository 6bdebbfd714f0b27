//! Error types and handling
//!
//! Top-level errors returned by recording control operations.

use crate::capture::LocateError;
use crate::sink::SinkError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a control operation on the recorder failed.
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("recording target unavailable: {0}")]
    TargetUnavailable(#[from] LocateError),

    #[error("could not create output directory {path:?}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not open video sink: {0}")]
    SinkOpenFailed(#[from] SinkError),

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording is in progress")]
    NotRecording,

    #[error("recording is not paused")]
    NotPaused,

    #[error("frame rate must be greater than zero")]
    InvalidFrameRate,
}

/// Result type alias using RecorderError
pub type RecorderResult<T> = Result<T, RecorderError>;
