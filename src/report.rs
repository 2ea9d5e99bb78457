// 📊 Run Report - what happened to every photo and track
//
// Per-photo failures and unassigned photos never abort the batch; they are
// collected here and summarized at the end of the run. Exports:
// - CSV: one row per photo
// - GeoJSON: matched photo locations as a FeatureCollection

use crate::entities::track::format_time;
use crate::entities::{Photo, Waypoint};
use crate::error::RunError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

// ============================================================================
// PHOTO OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhotoOutcome {
    Matched {
        photo: Photo,
        /// Index into the run's (sorted) track list
        track_index: usize,
        track_name: String,
        waypoint: Waypoint,
        /// Seconds between capture time and matched point
        offset_seconds: i64,
        /// Several tracks contained the photo; tie-break applied
        ambiguous: bool,
    },

    /// Capture time known, but outside every track span
    Unassigned { photo: Photo },

    /// No usable capture time
    Failed {
        path: PathBuf,
        code: String,
        reason: String,
    },
}

impl PhotoOutcome {
    pub fn path(&self) -> &Path {
        match self {
            PhotoOutcome::Matched { photo, .. } => &photo.path,
            PhotoOutcome::Unassigned { photo } => &photo.path,
            PhotoOutcome::Failed { path, .. } => path,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            PhotoOutcome::Matched { .. } => "matched",
            PhotoOutcome::Unassigned { .. } => "unassigned",
            PhotoOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, PhotoOutcome::Matched { .. })
    }
}

// ============================================================================
// SKIPPED TRACK
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTrack {
    pub path: PathBuf,
    pub code: String,
    pub reason: String,
}

// ============================================================================
// RUN REPORT
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub photos: Vec<PhotoOutcome>,
    pub tracks_loaded: usize,
    pub skipped_tracks: Vec<SkippedTrack>,
    /// Output files written (empty on a dry run)
    pub written: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_photos: usize,
    pub matched: usize,
    pub unassigned: usize,
    pub failed: usize,
    pub ambiguous: usize,
    pub tracks_loaded: usize,
    pub tracks_skipped: usize,
    pub files_written: usize,
}

impl RunSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} photos: {} matched, {} unassigned, {} failed | {} tracks loaded, {} skipped | {} files written",
            self.total_photos,
            self.matched,
            self.unassigned,
            self.failed,
            self.tracks_loaded,
            self.tracks_skipped,
            self.files_written
        )
    }
}

impl RunReport {
    pub fn summarize(&self) -> RunSummary {
        let count = |status: &str| self.photos.iter().filter(|o| o.status() == status).count();

        RunSummary {
            total_photos: self.photos.len(),
            matched: count("matched"),
            unassigned: count("unassigned"),
            failed: count("failed"),
            ambiguous: self
                .photos
                .iter()
                .filter(|o| matches!(o, PhotoOutcome::Matched { ambiguous: true, .. }))
                .count(),
            tracks_loaded: self.tracks_loaded,
            tracks_skipped: self.skipped_tracks.len(),
            files_written: self.written.len(),
        }
    }

    pub fn summary(&self) -> String {
        self.summarize().summary()
    }

    pub fn unassigned(&self) -> impl Iterator<Item = &Photo> {
        self.photos.iter().filter_map(|o| match o {
            PhotoOutcome::Unassigned { photo } => Some(photo),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = &PhotoOutcome> {
        self.photos
            .iter()
            .filter(|o| matches!(o, PhotoOutcome::Failed { .. }))
    }

    /// Human-readable report: summary line, then every photo and track that needs attention
    pub fn write_text<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "{}", self.summary())?;

        let summary = self.summarize();
        if summary.ambiguous > 0 {
            writeln!(
                out,
                "{} photo(s) fell inside overlapping tracks (tightest span chosen)",
                summary.ambiguous
            )?;
        }

        let unassigned: Vec<&Photo> = self.unassigned().collect();
        if !unassigned.is_empty() {
            writeln!(out, "\nUnassigned photos (outside every track):")?;
            for photo in unassigned {
                writeln!(out, "  {} ({})", photo.path.display(), format_time(photo.time))?;
            }
        }

        let failed: Vec<&PhotoOutcome> = self.failed().collect();
        if !failed.is_empty() {
            writeln!(out, "\nPhotos without a usable timestamp:")?;
            for outcome in failed {
                if let PhotoOutcome::Failed { path, reason, .. } = outcome {
                    writeln!(out, "  {}: {}", path.display(), reason)?;
                }
            }
        }

        if !self.skipped_tracks.is_empty() {
            writeln!(out, "\nSkipped tracks:")?;
            for track in &self.skipped_tracks {
                writeln!(out, "  {}: {}", track.path.display(), track.reason)?;
            }
        }

        if !self.written.is_empty() {
            writeln!(out, "\nWritten:")?;
            for path in &self.written {
                writeln!(out, "  {}", path.display())?;
            }
        }

        Ok(())
    }

    // ========================================================================
    // EXPORTS
    // ========================================================================

    /// One CSV row per photo
    pub fn write_csv(&self, path: &Path) -> Result<(), RunError> {
        let mut writer = csv::Writer::from_path(path)?;
        for outcome in &self.photos {
            writer.serialize(CsvRow::from(outcome))?;
        }
        writer.flush().map_err(|source| RunError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Matched photo locations as a GeoJSON FeatureCollection
    pub fn to_geojson(&self) -> serde_json::Value {
        let features: Vec<serde_json::Value> = self
            .photos
            .iter()
            .filter_map(|outcome| match outcome {
                PhotoOutcome::Matched {
                    photo,
                    track_name,
                    waypoint,
                    offset_seconds,
                    ..
                } => {
                    let mut coordinates = vec![waypoint.lon, waypoint.lat];
                    if let Some(elevation) = waypoint.elevation {
                        coordinates.push(elevation);
                    }
                    Some(json!({
                        "type": "Feature",
                        "geometry": { "type": "Point", "coordinates": coordinates },
                        "properties": {
                            "photo": photo.name,
                            "photo_src": photo.path.display().to_string(),
                            "time": format_time(photo.time),
                            "point_time": format_time(waypoint.time),
                            "offset_seconds": offset_seconds,
                            "track": track_name,
                        }
                    }))
                }
                _ => None,
            })
            .collect();

        json!({ "type": "FeatureCollection", "features": features })
    }

    pub fn write_geojson(&self, path: &Path) -> Result<(), RunError> {
        let file = File::create(path).map_err(|source| RunError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.to_geojson())?;
        writer.flush().map_err(|source| RunError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

// ============================================================================
// CSV ROW
// ============================================================================

#[derive(Debug, Serialize)]
struct CsvRow {
    photo: String,
    status: &'static str,
    capture_time: Option<String>,
    timestamp_source: Option<String>,
    track: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    elevation: Option<f64>,
    point_time: Option<String>,
    offset_seconds: Option<i64>,
    ambiguous: Option<bool>,
    detail: Option<String>,
}

impl From<&PhotoOutcome> for CsvRow {
    fn from(outcome: &PhotoOutcome) -> Self {
        let mut row = CsvRow {
            photo: outcome.path().display().to_string(),
            status: outcome.status(),
            capture_time: None,
            timestamp_source: None,
            track: None,
            latitude: None,
            longitude: None,
            elevation: None,
            point_time: None,
            offset_seconds: None,
            ambiguous: None,
            detail: None,
        };

        match outcome {
            PhotoOutcome::Matched {
                photo,
                track_name,
                waypoint,
                offset_seconds,
                ambiguous,
                ..
            } => {
                row.capture_time = Some(format_time(photo.time));
                row.timestamp_source = Some(photo.origin.to_string());
                row.track = Some(track_name.clone());
                row.latitude = Some(waypoint.lat);
                row.longitude = Some(waypoint.lon);
                row.elevation = waypoint.elevation;
                row.point_time = Some(format_time(waypoint.time));
                row.offset_seconds = Some(*offset_seconds);
                row.ambiguous = Some(*ambiguous);
            }
            PhotoOutcome::Unassigned { photo } => {
                row.capture_time = Some(format_time(photo.time));
                row.timestamp_source = Some(photo.origin.to_string());
                row.detail = Some("outside every track span".to_string());
            }
            PhotoOutcome::Failed { code, reason, .. } => {
                row.detail = Some(format!("{code}: {reason}"));
            }
        }

        row
    }
}

// ============================================================================
// TESTS
// ============================================================================
