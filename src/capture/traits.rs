//! Capture trait definitions
//!
//! Platform-agnostic contracts for the two capture collaborators: the
//! window locator (geometry + enumeration) and the frame source (pixels).
//! The resolution and filtering policies live here as pure functions so
//! every platform backend shares one tested behavior.

use crate::capture::frame::Frame;
use crate::capture::geometry::{clamp_to_screen, CaptureRegion, ScreenBounds};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// What a recording session captures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecordingTarget {
    /// A specific window, looked up by title on every tick.
    Window { title: String },

    /// The whole primary screen.
    PrimaryScreen,
}

impl RecordingTarget {
    pub fn window(title: impl Into<String>) -> Self {
        Self::Window {
            title: title.into(),
        }
    }
}

impl fmt::Display for RecordingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Window { title } => write!(f, "window \"{title}\""),
            Self::PrimaryScreen => write!(f, "primary screen"),
        }
    }
}

/// Why a target could not be resolved to a region.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("window \"{title}\" was not found")]
    NotFound { title: String },

    #[error("window \"{title}\" is minimized")]
    Minimized { title: String },
}

/// Why a frame could not be captured.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("screen capture is not supported on this platform")]
    Unsupported,

    #[error("frame capture failed: {0}")]
    Platform(String),

    #[error("captured buffer has {got} bytes, expected {expected}")]
    InvalidFrame { expected: usize, got: usize },
}

/// Resolves targets to clamped screen regions.
pub trait WindowLocator: Send + Sync {
    /// Candidate window titles: non-minimized, non-empty, sorted.
    fn list_targets(&self) -> Vec<String>;

    /// Current clamped geometry of `target`; re-queried on every tick
    /// because the window may move or resize mid-recording.
    fn locate(&self, target: &RecordingTarget) -> Result<CaptureRegion, LocateError>;
}

/// Captures one bitmap per call.
pub trait FrameSource: Send + Sync {
    /// Grabs the pixels of `region` at the moment of the call. The
    /// returned frame's dimensions equal the region's.
    fn capture(&self, region: CaptureRegion) -> Result<Frame, CaptureError>;
}

/// One window as reported by a platform enumeration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredWindow {
    pub title: String,
    pub minimized: bool,
    pub bounds: crate::capture::geometry::WindowBounds,
}

/// Shared resolution policy for [`WindowLocator::locate`].
///
/// An exact title match wins; otherwise the first case-insensitive
/// substring match in enumeration order is taken. A minimized match
/// resolves to [`LocateError::Minimized`]; the primary screen always
/// resolves to the full (fallback-corrected) screen bounds.
pub fn resolve_target(
    windows: &[DiscoveredWindow],
    target: &RecordingTarget,
    screen: ScreenBounds,
) -> Result<CaptureRegion, LocateError> {
    match target {
        RecordingTarget::PrimaryScreen => Ok(CaptureRegion::full_screen(screen)),
        RecordingTarget::Window { title } => {
            if title.is_empty() {
                return Err(LocateError::NotFound {
                    title: title.clone(),
                });
            }
            let needle = title.to_lowercase();
            let found = windows
                .iter()
                .find(|w| w.title == *title)
                .or_else(|| windows.iter().find(|w| w.title.to_lowercase().contains(&needle)))
                .ok_or_else(|| LocateError::NotFound {
                    title: title.clone(),
                })?;
            if found.minimized {
                return Err(LocateError::Minimized {
                    title: found.title.clone(),
                });
            }
            Ok(clamp_to_screen(found.bounds, screen))
        }
    }
}

/// Shared listing policy for [`WindowLocator::list_targets`]: drops
/// minimized and blank-titled windows, sorts, and deduplicates.
pub fn sorted_target_titles(windows: &[DiscoveredWindow]) -> Vec<String> {
    let mut titles: Vec<String> = windows
        .iter()
        .filter(|w| !w.minimized && !w.title.trim().is_empty())
        .map(|w| w.title.clone())
        .collect();
    titles.sort();
    titles.dedup();
    titles
}
