//! Platform-specific capture implementations
//!
//! This module provides window geometry lookup and frame capture for each
//! platform, behind the locator/source traits the recording loop consumes.

pub mod frame;
pub mod geometry;
pub mod traits;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "windows")]
pub mod windows;

pub use frame::Frame;
pub use geometry::{
    clamp_to_screen, CaptureRegion, FrameSize, ScreenBounds, WindowBounds,
    FALLBACK_SCREEN_BOUNDS,
};
pub use traits::{
    CaptureError, DiscoveredWindow, FrameSource, LocateError, RecordingTarget, WindowLocator,
};

use std::sync::Arc;

/// The window locator for the host platform.
pub fn platform_locator() -> Result<Arc<dyn WindowLocator>, CaptureError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::Win32WindowLocator::new()))
    }

    #[cfg(target_os = "macos")]
    {
        Ok(Arc::new(macos::QuartzWindowLocator::new()))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Err(CaptureError::Unsupported)
    }
}

/// The frame source for the host platform.
pub fn platform_source() -> Result<Arc<dyn FrameSource>, CaptureError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::GdiFrameSource::new()))
    }

    #[cfg(target_os = "macos")]
    {
        Ok(Arc::new(macos::QuartzFrameSource::new()))
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Err(CaptureError::Unsupported)
    }
}
