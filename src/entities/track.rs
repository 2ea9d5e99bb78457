// 🗺️ Track Entity - ordered GPS fixes of one outing
//
// A Track is only constructed through `Track::new`, which enforces:
// - at least 2 timed points (a span needs two ends)
// - non-decreasing point times (or a deliberate re-sort, see OrderPolicy)

use crate::error::TrackError;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

// ============================================================================
// TRACK POINT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
}

impl TrackPoint {
    pub fn new(time: DateTime<Utc>, lat: f64, lon: f64) -> Self {
        TrackPoint {
            time,
            lat,
            lon,
            elevation: None,
        }
    }

    /// Builder pattern: add elevation in meters
    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }
}

// ============================================================================
// ORDER POLICY
// ============================================================================

/// What to do with a track whose points are not in time order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderPolicy {
    /// Reject the track with `UnorderedTrack`
    #[default]
    Reject,

    /// Stable-sort the points by time and log a warning
    Sort,
}

// ============================================================================
// TRACK
// ============================================================================

#[derive(Debug, Clone)]
pub struct Track {
    /// Source GPX file
    pub path: PathBuf,

    /// `<trk><name>` or the file stem
    pub name: String,

    points: Vec<TrackPoint>,

    /// Raw GPX text, re-emitted verbatim by the writer
    source: String,
}

impl Track {
    pub fn new(
        path: PathBuf,
        name: String,
        mut points: Vec<TrackPoint>,
        source: String,
        policy: OrderPolicy,
    ) -> Result<Self, TrackError> {
        if points.len() < 2 {
            return Err(TrackError::EmptyTrack {
                points: points.len(),
            });
        }

        if let Some(index) = first_out_of_order(&points) {
            match policy {
                OrderPolicy::Reject => {
                    return Err(TrackError::UnorderedTrack {
                        index,
                        previous: format_time(points[index - 1].time),
                        current: format_time(points[index].time),
                    });
                }
                OrderPolicy::Sort => {
                    warn!(
                        track = %path.display(),
                        index,
                        "track points out of time order, re-sorting"
                    );
                    points.sort_by_key(|p| p.time);
                }
            }
        }

        Ok(Track {
            path,
            name,
            points,
            source,
        })
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: construction rejects tracks with fewer than 2 points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.points[0].time
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.points[self.points.len() - 1].time
    }

    pub fn span(&self) -> TimeDelta {
        self.end() - self.start()
    }

    /// Inclusive on both ends
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start() <= time && time <= self.end()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// File stem used to name the output file
    pub fn file_stem(&self) -> String {
        file_stem(&self.path).unwrap_or_else(|| self.name.clone())
    }
}

fn first_out_of_order(points: &[TrackPoint]) -> Option<usize> {
    points
        .windows(2)
        .position(|pair| pair[1].time < pair[0].time)
        .map(|i| i + 1)
}

pub(crate) fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}

pub(crate) fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// ============================================================================
// TESTS
// ============================================================================
