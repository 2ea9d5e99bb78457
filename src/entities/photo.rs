// 📷 Photo Entity - a file with a known capture instant
//
// Created by the TimestampExtractor, read-only afterwards.

use super::track::file_stem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which source produced the capture time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampOrigin {
    /// Parsed from the file name with the given pattern (e.g. "YYYYMMDD_HHMMSS")
    Filename { pattern: String },

    /// Read from an EXIF tag (e.g. "DateTimeOriginal")
    Exif { tag: String },
}

impl fmt::Display for TimestampOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampOrigin::Filename { pattern } => write!(f, "filename:{pattern}"),
            TimestampOrigin::Exif { tag } => write!(f, "exif:{tag}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub path: PathBuf,

    /// File stem, used as the waypoint name
    pub name: String,

    /// Capture instant normalized to UTC
    pub time: DateTime<Utc>,

    pub origin: TimestampOrigin,
}

impl Photo {
    pub fn new(path: PathBuf, time: DateTime<Utc>, origin: TimestampOrigin) -> Self {
        let name = file_stem(&path).unwrap_or_else(|| path.display().to_string());
        Photo {
            path,
            name,
            time,
            origin,
        }
    }
}
