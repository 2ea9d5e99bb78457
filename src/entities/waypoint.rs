// 📍 Waypoint Entity - a photo pinned to the nearest track point
//
// Lives in the annotated output layer of exactly one track; the track's own
// point sequence is never touched.

use super::photo::Photo;
use super::track::TrackPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    // Position (copied from the matched track point)
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,

    // Photo identity
    pub photo_name: String,
    pub photo_path: PathBuf,
    pub photo_time: DateTime<Utc>,
}

impl Waypoint {
    pub fn from_match(photo: &Photo, point: &TrackPoint) -> Self {
        Waypoint {
            time: point.time,
            lat: point.lat,
            lon: point.lon,
            elevation: point.elevation,
            photo_name: photo.name.clone(),
            photo_path: photo.path.clone(),
            photo_time: photo.time,
        }
    }
}
