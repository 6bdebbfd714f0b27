//! Recording state management
//!
//! Defines the recording state machine and session tracking.

use crate::capture::{FrameSize, RecordingTarget};
use crate::output;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Default capture rate in frames per second
pub const DEFAULT_FPS: u32 = 30;

/// Frame rates offered by the control surface
pub const STANDARD_FRAME_RATES: [u32; 3] = [15, 30, 60];

/// Current state of the recording system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    Idle,
    /// Currently recording
    Recording,
    /// Recording is paused
    Paused,
    /// Recording is being finalized
    Stopped,
}

impl RecordingState {
    /// Whether the capture loop should keep running in this state.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }

    /// Human-readable label shown on the control surface.
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Idle => "Ready to record",
            Self::Recording => "Recording...",
            Self::Paused => "Paused",
            Self::Stopped => "Saving...",
        }
    }
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Configuration for starting a recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingConfig {
    /// What to capture
    pub target: RecordingTarget,

    /// Directory the output file is written into
    pub output_dir: PathBuf,

    /// Output file name; a timestamped name is generated when absent
    pub file_name: Option<String>,

    /// Capture rate in frames per second
    pub fps: u32,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            target: RecordingTarget::PrimaryScreen,
            output_dir: output::default_output_dir(),
            file_name: None,
            fps: DEFAULT_FPS,
        }
    }
}

/// Information about an in-progress recording session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    /// Unique session id
    pub id: Uuid,

    /// What is being captured
    pub target: RecordingTarget,

    /// File the recording is written to
    pub output_path: PathBuf,

    /// Frame size the sink was opened with
    pub frame_size: FrameSize,

    /// Capture rate in frames per second
    pub fps: u32,

    /// When recording started
    pub started_at: DateTime<Utc>,
}

/// Result of a completed recording
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingResult {
    /// Session this result belongs to
    pub session_id: Uuid,

    /// File the recording was written to
    pub output_path: PathBuf,

    /// Number of frames handed to the sink
    pub frames_written: u64,

    /// Recorded time in whole seconds, pauses excluded
    pub elapsed_seconds: u64,

    /// When recording stopped
    pub stopped_at: DateTime<Utc>,
}

/// Snapshot of the recorder for display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatus {
    /// Current state
    pub state: RecordingState,

    /// Status line, e.g. "Recording..." or the last error
    pub message: String,

    /// Recorded time in whole seconds, pauses excluded
    pub elapsed_seconds: u64,

    /// Recorded time formatted as HH:MM:SS
    pub elapsed: String,

    /// Number of frames handed to the sink so far
    pub frames_written: u64,

    /// Output file of the active session, if any
    pub output_path: Option<PathBuf>,
}

/// Formats whole seconds as HH:MM:SS.
pub fn format_elapsed(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
