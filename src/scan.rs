// 🔎 Directory scanner - photo and track file discovery
//
// Non-recursive by default. Hidden files and ignore files are not special:
// every regular file with an allowed extension is returned, sorted by path.

use crate::error::RunError;
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Image extensions accepted as photos (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "bmp", "gif", "heic", "heif", "jpeg", "jpg", "nef", "png", "raw", "tif", "tiff", "webp",
];

pub const TRACK_EXTENSIONS: &[&str] = &["gpx"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Descend into subdirectories
    pub recursive: bool,

    /// Follow symbolic links
    pub follow_links: bool,
}

pub fn scan_photos(dir: &Path, options: ScanOptions) -> Result<Vec<PathBuf>, RunError> {
    scan(dir, IMAGE_EXTENSIONS, options)
}

pub fn scan_tracks(dir: &Path, options: ScanOptions) -> Result<Vec<PathBuf>, RunError> {
    scan(dir, TRACK_EXTENSIONS, options)
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// List regular files under `dir` whose extension is in `extensions`
pub fn scan(dir: &Path, extensions: &[&str], options: ScanOptions) -> Result<Vec<PathBuf>, RunError> {
    if !dir.is_dir() {
        return Err(RunError::NotADirectory(dir.to_path_buf()));
    }

    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(options.follow_links)
        .max_depth(if options.recursive { None } else { Some(1) })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| RunError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;

        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    debug!(dir = %dir.display(), found = files.len(), "scanned directory");
    Ok(files)
}
