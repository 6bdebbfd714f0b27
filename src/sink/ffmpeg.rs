//! FFmpeg-backed video sink
//!
//! Spawns an ffmpeg child process that reads raw BGRA frames on stdin
//! and encodes them into an H.264 MP4.

use crate::capture::frame::Frame;
use crate::capture::geometry::FrameSize;
use crate::sink::{FrameSink, SinkError, SinkFactory};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;

/// Checks whether an `ffmpeg` binary is reachable on PATH.
pub fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Builds the ffmpeg argument list for one recording.
///
/// Input is raw BGRA over stdin at the capture size and rate. Output is
/// libx264/yuv420p; yuv420p requires even dimensions, so odd capture
/// sizes are scaled up by one pixel.
fn encoder_args(output_path: &Path, frame_size: FrameSize, fps: u32) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pixel_format".to_string(),
        "bgra".to_string(),
        "-video_size".to_string(),
        format!("{}x{}", frame_size.width, frame_size.height),
        "-framerate".to_string(),
        fps.to_string(),
        "-i".to_string(),
        "-".to_string(),
    ];

    let even_width = frame_size.width + frame_size.width % 2;
    let even_height = frame_size.height + frame_size.height % 2;
    if even_width != frame_size.width || even_height != frame_size.height {
        args.extend([
            "-vf".to_string(),
            format!("scale={}:{}", even_width, even_height),
        ]);
    }

    args.extend([
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-crf".to_string(),
        "18".to_string(),
        "-g".to_string(),
        (fps * 2).to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output_path.to_string_lossy().to_string(),
    ]);

    args
}

/// Sink writing frames into a running ffmpeg process.
pub struct FfmpegSink {
    child: Mutex<Option<Child>>,
    frame_size: FrameSize,
    output_path: PathBuf,
}

impl FfmpegSink {
    /// Launches ffmpeg for the given output path, frame size, and rate.
    pub fn open(output_path: &Path, frame_size: FrameSize, fps: u32) -> Result<Self, SinkError> {
        let args = encoder_args(output_path, frame_size, fps);

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => SinkError::EncoderMissing,
                _ => SinkError::Spawn(e),
            })?;

        tracing::info!(
            "Started ffmpeg encoder: {} @ {}fps, output: {:?}",
            frame_size,
            fps,
            output_path
        );

        Ok(Self {
            child: Mutex::new(Some(child)),
            frame_size,
            output_path: output_path.to_path_buf(),
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl FrameSink for FfmpegSink {
    fn write(&self, frame: &Frame) -> Result<(), SinkError> {
        if frame.size() != self.frame_size {
            return Err(SinkError::SizeMismatch {
                expected: self.frame_size,
                got: frame.size(),
            });
        }

        let mut guard = self.child.lock();
        let Some(child) = guard.as_mut() else {
            return Err(SinkError::Closed);
        };
        let Some(stdin) = child.stdin.as_mut() else {
            return Err(SinkError::Closed);
        };
        stdin.write_all(frame.data())?;
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        let mut guard = self.child.lock();
        let Some(mut child) = guard.take() else {
            return Ok(());
        };

        // Closing stdin signals EOF so ffmpeg can finalize the container.
        drop(child.stdin.take());
        let output = child.wait_with_output().map_err(SinkError::Io)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(SinkError::Encoder {
                status: output.status,
                stderr,
            });
        }

        tracing::info!("Encoder finished: {:?}", self.output_path);
        Ok(())
    }
}

/// Opens [`FfmpegSink`]s; the production [`SinkFactory`].
#[derive(Debug, Default)]
pub struct FfmpegSinkFactory;

impl FfmpegSinkFactory {
    pub fn new() -> Self {
        Self
    }
}

impl SinkFactory for FfmpegSinkFactory {
    fn open(
        &self,
        path: &Path,
        frame_size: FrameSize,
        fps: u32,
    ) -> Result<Arc<dyn FrameSink>, SinkError> {
        Ok(Arc::new(FfmpegSink::open(path, frame_size, fps)?))
    }
}
