// ❗ Error taxonomy
// Per-photo errors are recovered and reported, per-track errors exclude the
// track from candidacy, run errors abort the batch.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// PHOTO ERRORS (recovered, listed in the run report)
// ============================================================================

#[derive(Debug, Error)]
pub enum PhotoError {
    /// Neither the file name nor the embedded metadata produced a capture time
    #[error("no usable capture timestamp for {}: {}", .path.display(), .reason)]
    MissingTimestamp { path: PathBuf, reason: String },

    /// A capture time exists but cannot be placed on the UTC timeline
    #[error("ambiguous timezone for {}: {}", .path.display(), .reason)]
    AmbiguousTimezone { path: PathBuf, reason: String },
}

impl PhotoError {
    pub fn path(&self) -> &PathBuf {
        match self {
            PhotoError::MissingTimestamp { path, .. } => path,
            PhotoError::AmbiguousTimezone { path, .. } => path,
        }
    }

    /// Short machine-friendly code used in reports
    pub fn code(&self) -> &'static str {
        match self {
            PhotoError::MissingTimestamp { .. } => "missing_timestamp",
            PhotoError::AmbiguousTimezone { .. } => "ambiguous_timezone",
        }
    }
}

// ============================================================================
// TRACK ERRORS (track skipped, batch continues)
// ============================================================================

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("track has {points} timed point(s), at least 2 are required")]
    EmptyTrack { points: usize },

    #[error("track point #{index} ({current}) is earlier than its predecessor ({previous})")]
    UnorderedTrack {
        index: usize,
        previous: String,
        current: String,
    },

    #[error("track time '{value}' carries no UTC offset")]
    AmbiguousTimezone { value: String },

    #[error("invalid GPX: {0}")]
    InvalidGpx(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("failed to emit GPX: {0}")]
    Write(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrackError {
    pub fn code(&self) -> &'static str {
        match self {
            TrackError::EmptyTrack { .. } => "empty_track",
            TrackError::UnorderedTrack { .. } => "unordered_track",
            TrackError::AmbiguousTimezone { .. } => "ambiguous_timezone",
            TrackError::InvalidGpx(_) => "invalid_gpx",
            TrackError::Xml(_) => "xml",
            TrackError::Write(_) => "write",
            TrackError::Io(_) => "io",
        }
    }
}

// ============================================================================
// RUN ERRORS (fatal)
// ============================================================================

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("no {what} found in {}", .path.display())]
    NoInput { what: &'static str, path: PathBuf },

    #[error("none of the {0} track file(s) could be loaded")]
    NoUsableTracks(usize),

    #[error("cannot scan {}: {}", .path.display(), .source)]
    Scan {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },

    #[error("cannot write {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot render output for {}: {}", .path.display(), .source)]
    Render {
        path: PathBuf,
        #[source]
        source: TrackError,
    },

    #[error("CSV report: {0}")]
    Csv(#[from] csv::Error),

    #[error("GeoJSON export: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot start worker pool: {0}")]
    ThreadPool(String),
}
