//! Captured frame buffers
//!
//! Frames are 32-bit BGRA, tightly packed, top-down row order: the layout
//! GDI and Quartz hand back and the layout the ffmpeg sink consumes. The
//! resampler treats pixels as opaque 4-byte groups, so channel order is
//! preserved through rescaling.

use crate::capture::geometry::FrameSize;
use crate::capture::traits::CaptureError;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba};

/// Bytes per BGRA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// One captured bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wraps a BGRA buffer, validating its length against the dimensions.
    pub fn from_bgra(data: Vec<u8>, width: u32, height: u32) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(CaptureError::InvalidFrame {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// A frame of uniform color, `bgra` byte order.
    pub fn filled(size: FrameSize, bgra: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(size.byte_len());
        for _ in 0..(size.width as usize * size.height as usize) {
            data.extend_from_slice(&bgra);
        }
        Self {
            data,
            width: size.width,
            height: size.height,
        }
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Rescales to `target`; a frame already at `target` passes through
    /// untouched.
    pub fn into_resized(self, target: FrameSize) -> Frame {
        if self.size() == target {
            return self;
        }
        let Frame {
            data,
            width,
            height,
        } = self;
        // Construction validates the buffer length, so this cannot fail;
        // a blank frame keeps the sink fed if it ever does.
        let Some(source) = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, data) else {
            return Frame::filled(target, [0, 0, 0, 255]);
        };
        let resized = imageops::resize(&source, target.width, target.height, FilterType::Triangle);
        Frame {
            data: resized.into_raw(),
            width: target.width,
            height: target.height,
        }
    }
}
