//! Windows window capture using Win32 + GDI BitBlt
//!
//! The locator enumerates top-level windows and measures the target with
//! GetWindowRect; the source BitBlts the clamped region out of the screen
//! DC and reads it back as top-down 32-bit BGRA.

use crate::capture::frame::Frame;
use crate::capture::geometry::{CaptureRegion, ScreenBounds, WindowBounds};
use crate::capture::traits::{
    resolve_target, sorted_target_titles, CaptureError, DiscoveredWindow, FrameSource,
    LocateError, RecordingTarget, WindowLocator,
};
use std::sync::Once;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT};
use windows::Win32::Graphics::Gdi::{
    BitBlt, CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDC, GetDIBits,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, SRCCOPY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetDesktopWindow, GetSystemMetrics, GetWindowRect, GetWindowTextLengthW,
    GetWindowTextW, IsIconic, IsWindowVisible, SetProcessDPIAware, SM_CXSCREEN, SM_CYSCREEN,
};

static DPI_AWARE: Once = Once::new();

/// Marks the process DPI-aware once, before any geometry is read, so
/// GetWindowRect and GetSystemMetrics report physical pixels.
fn ensure_dpi_aware() {
    DPI_AWARE.call_once(|| unsafe {
        let _ = SetProcessDPIAware();
    });
}

fn screen_bounds() -> ScreenBounds {
    let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
    ScreenBounds::new(width, height).or_fallback()
}

unsafe extern "system" fn enum_windows_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let windows = &mut *(lparam.0 as *mut Vec<DiscoveredWindow>);

    if !IsWindowVisible(hwnd).as_bool() {
        return BOOL::from(true);
    }

    let length = GetWindowTextLengthW(hwnd);
    if length == 0 {
        return BOOL::from(true);
    }
    let mut buffer = vec![0u16; (length + 1) as usize];
    let read = GetWindowTextW(hwnd, &mut buffer);
    if read == 0 {
        return BOOL::from(true);
    }
    let title = String::from_utf16_lossy(&buffer[..read as usize]);

    let mut rect = RECT::default();
    if GetWindowRect(hwnd, &mut rect).is_err() {
        return BOOL::from(true);
    }

    windows.push(DiscoveredWindow {
        title,
        minimized: IsIconic(hwnd).as_bool(),
        bounds: WindowBounds {
            x: rect.left,
            y: rect.top,
            width: rect.right - rect.left,
            height: rect.bottom - rect.top,
        },
    });

    BOOL::from(true)
}

fn enumerate_windows() -> Vec<DiscoveredWindow> {
    let mut windows: Vec<DiscoveredWindow> = Vec::new();
    unsafe {
        let _ = EnumWindows(
            Some(enum_windows_callback),
            LPARAM(&mut windows as *mut _ as isize),
        );
    }
    windows
}

/// Locator backed by EnumWindows/GetWindowRect.
pub struct Win32WindowLocator;

impl Win32WindowLocator {
    pub fn new() -> Self {
        ensure_dpi_aware();
        Self
    }
}

impl Default for Win32WindowLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowLocator for Win32WindowLocator {
    fn list_targets(&self) -> Vec<String> {
        sorted_target_titles(&enumerate_windows())
    }

    fn locate(&self, target: &RecordingTarget) -> Result<CaptureRegion, LocateError> {
        resolve_target(&enumerate_windows(), target, screen_bounds())
    }
}

/// Frame source backed by BitBlt from the desktop DC.
pub struct GdiFrameSource;

impl GdiFrameSource {
    pub fn new() -> Self {
        ensure_dpi_aware();
        Self
    }
}

impl Default for GdiFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for GdiFrameSource {
    fn capture(&self, region: CaptureRegion) -> Result<Frame, CaptureError> {
        capture_region(region)
    }
}

/// BitBlts `region` out of the screen and reads it back as BGRA.
fn capture_region(region: CaptureRegion) -> Result<Frame, CaptureError> {
    use std::mem::zeroed;

    let width = region.width as i32;
    let height = region.height as i32;

    unsafe {
        let hwnd = GetDesktopWindow();
        let hdc_screen = GetDC(hwnd);
        if hdc_screen.is_invalid() {
            return Err(CaptureError::Platform("GetDC failed".to_string()));
        }

        let hdc_mem = CreateCompatibleDC(hdc_screen);
        if hdc_mem.is_invalid() {
            ReleaseDC(hwnd, hdc_screen);
            return Err(CaptureError::Platform(
                "CreateCompatibleDC failed".to_string(),
            ));
        }

        let hbitmap = CreateCompatibleBitmap(hdc_screen, width, height);
        if hbitmap.is_invalid() {
            DeleteDC(hdc_mem);
            ReleaseDC(hwnd, hdc_screen);
            return Err(CaptureError::Platform(
                "CreateCompatibleBitmap failed".to_string(),
            ));
        }

        let old_bitmap = SelectObject(hdc_mem, hbitmap);

        let blit = BitBlt(
            hdc_mem,
            0,
            0,
            width,
            height,
            hdc_screen,
            region.x,
            region.y,
            SRCCOPY,
        );
        if !blit.as_bool() {
            SelectObject(hdc_mem, old_bitmap);
            DeleteObject(hbitmap);
            DeleteDC(hdc_mem);
            ReleaseDC(hwnd, hdc_screen);
            return Err(CaptureError::Platform("BitBlt failed".to_string()));
        }

        let mut bmi: BITMAPINFO = zeroed();
        bmi.bmiHeader.biSize = std::mem::size_of::<BITMAPINFOHEADER>() as u32;
        bmi.bmiHeader.biWidth = width;
        bmi.bmiHeader.biHeight = -height; // Negative for top-down rows
        bmi.bmiHeader.biPlanes = 1;
        bmi.bmiHeader.biBitCount = 32; // BGRA
        bmi.bmiHeader.biCompression = BI_RGB.0;

        let mut buffer = vec![0u8; region.size().byte_len()];
        let lines = GetDIBits(
            hdc_mem,
            hbitmap,
            0,
            region.height,
            Some(buffer.as_mut_ptr() as *mut _),
            &mut bmi,
            DIB_RGB_COLORS,
        );

        SelectObject(hdc_mem, old_bitmap);
        DeleteObject(hbitmap);
        DeleteDC(hdc_mem);
        ReleaseDC(hwnd, hdc_screen);

        if lines == 0 {
            return Err(CaptureError::Platform("GetDIBits failed".to_string()));
        }

        Frame::from_bgra(buffer, region.width, region.height)
    }
}
