// Entity Models
//
// Plain immutable value records shared by every stage of the pipeline:
// - Photo: file + capture instant (UTC)
// - Track / TrackPoint: validated, time-ordered GPS fixes
// - Waypoint: a photo pinned to a track point

pub mod photo;
pub mod track;
pub mod waypoint;

pub use photo::{Photo, TimestampOrigin};
pub use track::{OrderPolicy, Track, TrackPoint};
pub use waypoint::Waypoint;
