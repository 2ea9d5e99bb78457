// Phototracks - Core Library
// Places photos on GPX tracks by matching capture times to track point times.
// Exposes all modules for use in the CLI and tests.

pub mod assign;     // Track Assigner
pub mod entities;   // Photo, Track, TrackPoint, Waypoint
pub mod error;
pub mod loader;     // Track Loader (GPX → Track)
pub mod matcher;    // Nearest-Point Matcher
pub mod metadata;   // EXIF access
pub mod pipeline;
pub mod report;
pub mod scan;
pub mod timestamp;  // Timestamp Extractor
pub mod writer;     // Waypoint Writer

// Re-export commonly used types
pub use assign::{assign, assign_at, Assignment};
pub use entities::{OrderPolicy, Photo, TimestampOrigin, Track, TrackPoint, Waypoint};
pub use error::{PhotoError, RunError, TrackError};
pub use matcher::{nearest_point, NearestPoint};
pub use pipeline::{run, RunConfig};
pub use report::{PhotoOutcome, RunReport, RunSummary, SkippedTrack};
pub use scan::ScanOptions;
pub use timestamp::{TimestampExtractor, TimezonePolicy};
pub use writer::{render, TrackOutput};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
