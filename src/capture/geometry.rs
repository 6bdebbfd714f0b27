//! Screen-space geometry
//!
//! Raw window rectangles come straight from the platform and can hang off
//! any edge of the screen; capture always works on a clamped region.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Screen size substituted when display metrics are unavailable or report
/// a degenerate size. Clamping and full-screen capture fall back to a
/// 1080p desktop.
pub const FALLBACK_SCREEN_BOUNDS: ScreenBounds = ScreenBounds {
    width: 1920,
    height: 1080,
};

/// Raw window geometry as reported by the windowing system.
///
/// Unvalidated: the origin may be negative (window dragged past the top or
/// left edge) and the extent may overhang the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Pixel size of the primary screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenBounds {
    pub width: i32,
    pub height: i32,
}

impl ScreenBounds {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Applies the fallback policy: any degenerate dimension replaces the
    /// whole measurement with [`FALLBACK_SCREEN_BOUNDS`].
    pub fn or_fallback(self) -> Self {
        if self.width < 1 || self.height < 1 {
            FALLBACK_SCREEN_BOUNDS
        } else {
            self
        }
    }
}

impl fmt::Display for ScreenBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A clamped screen rectangle to capture for one frame.
///
/// Invariants: the origin lies on the screen, `width >= 1`, `height >= 1`,
/// and `x + width` / `y + height` do not exceed the screen bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    /// The whole primary screen.
    pub fn full_screen(screen: ScreenBounds) -> Self {
        let screen = screen.or_fallback();
        Self {
            x: 0,
            y: 0,
            width: screen.width as u32,
            height: screen.height as u32,
        }
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

impl fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Fixed pixel dimensions of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Byte length of one tightly packed 32-bit frame of this size.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Clamps raw window geometry to the screen.
///
/// The origin is moved inside `[0, screen - 1]`, the extent is cut at the
/// screen edge, and both dimensions are floored at one pixel, so the
/// result is always a valid on-screen region even for a window dragged
/// entirely off the desktop.
pub fn clamp_to_screen(bounds: WindowBounds, screen: ScreenBounds) -> CaptureRegion {
    let screen = screen.or_fallback();
    let x = bounds.x.clamp(0, screen.width - 1);
    let y = bounds.y.clamp(0, screen.height - 1);
    let width = bounds.width.min(screen.width - x).max(1) as u32;
    let height = bounds.height.min(screen.height - y).max(1) as u32;
    CaptureRegion {
        x,
        y,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: ScreenBounds = ScreenBounds {
        width: 1920,
        height: 1080,
    };

    fn bounds(x: i32, y: i32, width: i32, height: i32) -> WindowBounds {
        WindowBounds {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_region_inside_screen_is_unchanged() {
        let region = clamp_to_screen(bounds(100, 100, 800, 600), SCREEN);
        assert_eq!(
            region,
            CaptureRegion {
                x: 100,
                y: 100,
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn test_negative_origin_is_clamped_to_zero() {
        let region = clamp_to_screen(bounds(-150, -40, 800, 600), SCREEN);
        assert_eq!(region.x, 0);
        assert_eq!(region.y, 0);
        assert_eq!(region.width, 800);
        assert_eq!(region.height, 600);
    }

    #[test]
    fn test_overhang_is_cut_at_screen_edge() {
        let region = clamp_to_screen(bounds(1800, 1000, 800, 600), SCREEN);
        assert_eq!(region.x, 1800);
        assert_eq!(region.y, 1000);
        assert_eq!(region.width, 120);
        assert_eq!(region.height, 80);
        assert!(region.x + region.width as i32 <= SCREEN.width);
        assert!(region.y + region.height as i32 <= SCREEN.height);
    }

    #[test]
    fn test_window_fully_off_screen_still_yields_valid_region() {
        let region = clamp_to_screen(bounds(5000, 5000, 300, 200), SCREEN);
        assert_eq!(region.x, SCREEN.width - 1);
        assert_eq!(region.y, SCREEN.height - 1);
        assert_eq!(region.width, 1);
        assert_eq!(region.height, 1);
    }

    #[test]
    fn test_degenerate_window_size_is_floored_at_one_pixel() {
        let region = clamp_to_screen(bounds(10, 10, 0, -5), SCREEN);
        assert_eq!(region.width, 1);
        assert_eq!(region.height, 1);
    }

    #[test]
    fn test_missing_screen_metrics_fall_back_to_default_bounds() {
        let region = clamp_to_screen(bounds(0, 0, 2560, 1440), ScreenBounds::new(0, 0));
        assert_eq!(region.width, FALLBACK_SCREEN_BOUNDS.width as u32);
        assert_eq!(region.height, FALLBACK_SCREEN_BOUNDS.height as u32);
    }

    #[test]
    fn test_full_screen_region_covers_fallback_when_metrics_missing() {
        let region = CaptureRegion::full_screen(ScreenBounds::new(-1, 900));
        assert_eq!(region.size(), FrameSize::new(1920, 1080));
    }

    #[test]
    fn test_frame_size_byte_len() {
        assert_eq!(FrameSize::new(800, 600).byte_len(), 800 * 600 * 4);
        assert_eq!(FrameSize::new(1, 1).byte_len(), 4);
    }
}
