//! winrec - Window and screen recording, made simple.
//!
//! This is the main library crate for the winrec recorder. It provides
//! window discovery, fixed-rate frame capture, and MP4 encoding behind a
//! pausable recording coordinator.

pub mod capture;
pub mod error;
pub mod output;
pub mod recorder;
pub mod sink;

pub use capture::{
    platform_locator, platform_source, CaptureError, CaptureRegion, DiscoveredWindow, Frame,
    FrameSize, FrameSource, LocateError, RecordingTarget, ScreenBounds, WindowLocator,
};
pub use error::{RecorderError, RecorderResult};
pub use recorder::{
    RecordingConfig, RecordingCoordinator, RecordingEvent, RecordingResult, RecordingSession,
    RecordingState, RecordingStatus, DEFAULT_FPS, STANDARD_FRAME_RATES,
};
pub use sink::{ffmpeg_available, FfmpegSinkFactory, FrameSink, SinkError, SinkFactory};
