//! Recording system module
//!
//! This module implements the recording lifecycle:
//! - RecordingState machine with pause/resume
//! - RecordingCoordinator driving the capture loop and the video sink

pub mod coordinator;
pub mod state;

pub use coordinator::{RecordingCoordinator, RecordingEvent};
pub use state::{
    format_elapsed, RecordingConfig, RecordingResult, RecordingSession, RecordingState,
    RecordingStatus, DEFAULT_FPS, STANDARD_FRAME_RATES,
};
