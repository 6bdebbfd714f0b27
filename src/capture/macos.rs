//! macOS window capture via Quartz window services
//!
//! Enumeration walks the CGWindowList info dictionaries; frames come from
//! CGWindowListCreateImage redrawn through a BGRA bitmap context sized to
//! the requested region, which also folds Retina scaling back to region
//! pixels.

use crate::capture::frame::Frame;
use crate::capture::geometry::{CaptureRegion, ScreenBounds, WindowBounds};
use crate::capture::traits::{
    resolve_target, sorted_target_titles, CaptureError, DiscoveredWindow, FrameSource,
    LocateError, RecordingTarget, WindowLocator,
};

use core_foundation::array::{CFArray, CFArrayRef};
use core_foundation::base::TCFType;
use core_foundation::boolean::CFBoolean;
use core_foundation::dictionary::CFDictionary;
use core_foundation::number::CFNumber;
use core_foundation::string::CFString;
use core_graphics::color_space::CGColorSpace;
use core_graphics::context::CGContext;
use core_graphics::display::CGDisplay;
use core_graphics::geometry::{CGPoint, CGRect, CGSize};
use core_graphics::image::CGImage;
use foreign_types_shared::ForeignType;

const KCG_WINDOW_LIST_OPTION_ON_SCREEN_ONLY: u32 = 1 << 0;
const KCG_WINDOW_LIST_EXCLUDE_DESKTOP_ELEMENTS: u32 = 1 << 4;
const KCG_NULL_WINDOW_ID: u32 = 0;
const KCG_WINDOW_IMAGE_DEFAULT: u32 = 0;
// CGBitmapInfo byte order for little-endian 32-bit pixels; combined with
// premultiplied-first alpha this yields BGRA in memory.
const KCG_BITMAP_BYTE_ORDER_32_LITTLE: u32 = 2 << 12;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGWindowListCopyWindowInfo(option: u32, relative_to_window: u32) -> CFArrayRef;
    fn CGWindowListCreateImage(
        screen_bounds: CGRect,
        list_option: u32,
        window_id: u32,
        image_option: u32,
    ) -> *mut core_graphics::sys::CGImage;
}

fn dict_number(dict: &CFDictionary, key: &'static str) -> Option<i64> {
    let key = CFString::from_static_string(key);
    dict.find(key.as_CFTypeRef() as *const _).and_then(|val| {
        let number = unsafe { CFNumber::wrap_under_get_rule(val.cast()) };
        number.to_i64()
    })
}

fn dict_bool(dict: &CFDictionary, key: &'static str) -> bool {
    let key = CFString::from_static_string(key);
    dict.find(key.as_CFTypeRef() as *const _)
        .map(|val| {
            let flag = unsafe { CFBoolean::wrap_under_get_rule(val.cast()) };
            bool::from(flag)
        })
        .unwrap_or(false)
}

fn dict_string(dict: &CFDictionary, key: &'static str) -> Option<String> {
    let key = CFString::from_static_string(key);
    dict.find(key.as_CFTypeRef() as *const _).map(|val| {
        let string = unsafe { CFString::wrap_under_get_rule(val.cast()) };
        string.to_string()
    })
}

/// Walks the window-info list: layer-0 windows with a title, their bounds,
/// and whether they are currently on screen (minimized windows are not).
fn enumerate_windows() -> Vec<DiscoveredWindow> {
    let mut windows = Vec::new();

    unsafe {
        let list_ref = CGWindowListCopyWindowInfo(KCG_WINDOW_LIST_EXCLUDE_DESKTOP_ELEMENTS, 0);
        if list_ref.is_null() {
            return windows;
        }
        let list = CFArray::<CFDictionary>::wrap_under_create_rule(list_ref);

        for i in 0..list.len() {
            let Some(dict) = list.get(i) else {
                continue;
            };

            // Only normal windows; panels and system chrome live on other
            // layers.
            if dict_number(&dict, "kCGWindowLayer").unwrap_or(-1) != 0 {
                continue;
            }

            let Some(title) = dict_string(&dict, "kCGWindowName") else {
                continue;
            };
            if title.is_empty() {
                continue;
            }

            let bounds_key = CFString::from_static_string("kCGWindowBounds");
            let Some(bounds_ref) = dict.find(bounds_key.as_CFTypeRef() as *const _) else {
                continue;
            };
            let bounds_dict = CFDictionary::wrap_under_get_rule(bounds_ref.cast());
            let Some(rect) = CGRect::from_dict_representation(&bounds_dict) else {
                continue;
            };

            windows.push(DiscoveredWindow {
                title,
                minimized: !dict_bool(&dict, "kCGWindowIsOnscreen"),
                bounds: WindowBounds {
                    x: rect.origin.x as i32,
                    y: rect.origin.y as i32,
                    width: rect.size.width as i32,
                    height: rect.size.height as i32,
                },
            });
        }
    }

    windows
}

fn screen_bounds() -> ScreenBounds {
    let bounds = CGDisplay::main().bounds();
    ScreenBounds::new(bounds.size.width as i32, bounds.size.height as i32).or_fallback()
}

/// Locator backed by the Quartz window list.
pub struct QuartzWindowLocator;

impl QuartzWindowLocator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for QuartzWindowLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowLocator for QuartzWindowLocator {
    fn list_targets(&self) -> Vec<String> {
        sorted_target_titles(&enumerate_windows())
    }

    fn locate(&self, target: &RecordingTarget) -> Result<CaptureRegion, LocateError> {
        resolve_target(&enumerate_windows(), target, screen_bounds())
    }
}

/// Frame source backed by CGWindowListCreateImage.
pub struct QuartzFrameSource;

impl QuartzFrameSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for QuartzFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for QuartzFrameSource {
    fn capture(&self, region: CaptureRegion) -> Result<Frame, CaptureError> {
        capture_region(region)
    }
}

fn capture_region(region: CaptureRegion) -> Result<Frame, CaptureError> {
    let rect = CGRect::new(
        &CGPoint::new(region.x as f64, region.y as f64),
        &CGSize::new(region.width as f64, region.height as f64),
    );

    let image_ptr = unsafe {
        CGWindowListCreateImage(
            rect,
            KCG_WINDOW_LIST_OPTION_ON_SCREEN_ONLY,
            KCG_NULL_WINDOW_ID,
            KCG_WINDOW_IMAGE_DEFAULT,
        )
    };
    if image_ptr.is_null() {
        return Err(CaptureError::Platform(
            "CGWindowListCreateImage returned null; screen recording permission may be missing"
                .to_string(),
        ));
    }
    let image: CGImage = unsafe { CGImage::from_ptr(image_ptr) };

    // Redraw into a context of exactly the region size: normalizes stride,
    // Retina scaling, and channel order in one pass.
    let width = region.width as usize;
    let height = region.height as usize;
    let bytes_per_row = width * 4;
    let mut pixel_data = vec![0u8; bytes_per_row * height];

    let color_space = CGColorSpace::create_device_rgb();
    let context = CGContext::create_bitmap_context(
        Some(pixel_data.as_mut_ptr() as *mut _),
        width,
        height,
        8,
        bytes_per_row,
        &color_space,
        core_graphics::base::kCGImageAlphaPremultipliedFirst | KCG_BITMAP_BYTE_ORDER_32_LITTLE,
    );
    context.draw_image(
        CGRect::new(
            &CGPoint::new(0.0, 0.0),
            &CGSize::new(width as f64, height as f64),
        ),
        &image,
    );
    drop(context);

    Frame::from_bgra(pixel_data, region.width, region.height)
}
