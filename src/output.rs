//! Output path resolution
//!
//! Where recordings land on disk and how output files are named.

use crate::error::{RecorderError, RecorderResult};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// Container extension for recordings
pub const OUTPUT_EXTENSION: &str = "mp4";

/// Default directory for new recordings.
///
/// Prefers the user's videos directory, falls back to documents, and as
/// a last resort uses the current working directory.
pub fn default_output_dir() -> PathBuf {
    dirs::video_dir()
        .or_else(dirs::document_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Timestamped default file name, e.g. `recording_20240305_143009`.
pub fn default_file_name() -> String {
    timestamped_name(Local::now())
}

fn timestamped_name(at: DateTime<Local>) -> String {
    format!("recording_{}", at.format("%Y%m%d_%H%M%S"))
}

/// Joins the output directory and file name, appending the container
/// extension when the name has none.
pub fn resolve_output_path(dir: &Path, file_name: Option<&str>) -> PathBuf {
    let name = match file_name {
        Some(name) => name.to_string(),
        None => default_file_name(),
    };

    let mut path = dir.join(name);
    if path.extension().is_none() {
        path.set_extension(OUTPUT_EXTENSION);
    }
    path
}

/// Creates the output directory if it does not exist yet.
pub fn ensure_output_dir(dir: &Path) -> RecorderResult<()> {
    fs::create_dir_all(dir).map_err(|source| RecorderError::DirectoryCreationFailed {
        path: dir.to_path_buf(),
        source,
    })
}
