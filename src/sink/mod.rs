//! Video sink contracts
//!
//! A sink is an open encoding stream bound to a fixed frame size, frame
//! rate, and output path. Frames are appended in capture order by exactly
//! one writer; `close` finalizes the container and is idempotent.

pub mod ffmpeg;

use crate::capture::frame::Frame;
use crate::capture::geometry::FrameSize;
use std::io;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub use ffmpeg::{ffmpeg_available, FfmpegSink, FfmpegSinkFactory};

/// Why a sink could not be opened, written, or finalized.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("ffmpeg binary not found on PATH")]
    EncoderMissing,

    #[error("could not launch encoder: {0}")]
    Spawn(io::Error),

    #[error("frame write failed: {0}")]
    Io(#[from] io::Error),

    #[error("frame size {got} does not match sink size {expected}")]
    SizeMismatch { expected: FrameSize, got: FrameSize },

    #[error("sink is closed")]
    Closed,

    #[error("encoder exited with {status}: {stderr}")]
    Encoder {
        status: std::process::ExitStatus,
        stderr: String,
    },
}

impl SinkError {
    /// Whether a retry on the next tick could possibly succeed. A broken
    /// encoder pipe, a write after close, or a frame of the wrong size
    /// cannot recover; the session auto-stops on these.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Closed | Self::SizeMismatch { .. } => true,
            Self::Io(err) => err.kind() == io::ErrorKind::BrokenPipe,
            _ => false,
        }
    }
}

/// An open video-encoding stream.
pub trait FrameSink: Send + Sync {
    /// Appends one frame; its dimensions must equal the size the sink was
    /// opened with.
    fn write(&self, frame: &Frame) -> Result<(), SinkError>;

    /// Finalizes the container. Safe to call once; a no-op afterwards.
    fn close(&self) -> Result<(), SinkError>;
}

/// Opens sinks; the seam the recording loop uses so tests can substitute
/// a recording double for the encoder.
pub trait SinkFactory: Send + Sync {
    fn open(
        &self,
        path: &Path,
        frame_size: FrameSize,
        fps: u32,
    ) -> Result<Arc<dyn FrameSink>, SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_pipe_is_fatal() {
        let err = SinkError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_interrupted_write_is_transient() {
        let err = SinkError::Io(io::Error::new(io::ErrorKind::Interrupted, "try again"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_closed_and_size_mismatch_are_fatal() {
        assert!(SinkError::Closed.is_fatal());
        assert!(SinkError::SizeMismatch {
            expected: FrameSize::new(800, 600),
            got: FrameSize::new(1000, 700),
        }
        .is_fatal());
    }

    #[test]
    fn test_missing_encoder_is_not_fatal_classified() {
        // Start-time failure; never reaches the tick path.
        assert!(!SinkError::EncoderMissing.is_fatal());
    }
}
