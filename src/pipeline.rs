// 🔄 Pipeline - photos + tracks → annotated GPX files
//
// Flow:
//   1. Scan both directories (fatal if either holds nothing usable)
//   2. Load every track; broken tracks are skipped and reported
//   3. Extract, assign and match every photo (optionally in parallel)
//   4. Group waypoints per track and write one file per used track
//
// Only directory, scan and write failures abort the run.

use crate::assign::assign;
use crate::entities::{OrderPolicy, Track, Waypoint};
use crate::error::RunError;
use crate::loader;
use crate::matcher::nearest_point;
use crate::report::{PhotoOutcome, RunReport, SkippedTrack};
use crate::scan::{scan_photos, scan_tracks, ScanOptions};
use crate::timestamp::{TimestampExtractor, TimezonePolicy};
use crate::writer::{persist, TrackOutput};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub photos_dir: PathBuf,
    pub tracks_dir: PathBuf,
    pub output_dir: PathBuf,

    pub timezone: TimezonePolicy,
    pub order: OrderPolicy,
    pub scan: ScanOptions,

    /// Worker threads for photo processing (1 = sequential)
    pub jobs: usize,

    /// Compute everything, write no GPX files
    pub dry_run: bool,

    pub report_csv: Option<PathBuf>,
    pub geojson: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            photos_dir: PathBuf::from("photos"),
            tracks_dir: PathBuf::from("tracks"),
            output_dir: PathBuf::from("output"),
            timezone: TimezonePolicy::default(),
            order: OrderPolicy::default(),
            scan: ScanOptions::default(),
            jobs: 1,
            dry_run: false,
            report_csv: None,
            geojson: None,
        }
    }
}

// ============================================================================
// RUN
// ============================================================================

pub fn run(config: &RunConfig) -> Result<RunReport, RunError> {
    info!(
        photos = %config.photos_dir.display(),
        tracks = %config.tracks_dir.display(),
        timezone = %config.timezone,
        "starting run"
    );

    let track_paths = scan_tracks(&config.tracks_dir, config.scan)?;
    if track_paths.is_empty() {
        return Err(RunError::NoInput {
            what: "GPX tracks",
            path: config.tracks_dir.clone(),
        });
    }

    let photo_paths = scan_photos(&config.photos_dir, config.scan)?;
    if photo_paths.is_empty() {
        return Err(RunError::NoInput {
            what: "photos",
            path: config.photos_dir.clone(),
        });
    }

    let (tracks, skipped_tracks) = load_tracks(&track_paths, config.order);
    if tracks.is_empty() {
        return Err(RunError::NoUsableTracks(track_paths.len()));
    }

    let extractor = TimestampExtractor::new(config.timezone);
    let photos = locate_all(&extractor, &photo_paths, &tracks, config.jobs)?;

    let outputs = collect_outputs(&tracks, &photos);
    let written = if config.dry_run {
        info!("dry run, no GPX files written");
        Vec::new()
    } else {
        persist(&outputs, &config.output_dir)?
    };

    let report = RunReport {
        photos,
        tracks_loaded: tracks.len(),
        skipped_tracks,
        written,
    };

    if let Some(path) = &config.report_csv {
        report.write_csv(path)?;
        info!(report = %path.display(), "wrote CSV report");
    }
    if let Some(path) = &config.geojson {
        report.write_geojson(path)?;
        info!(geojson = %path.display(), "wrote GeoJSON");
    }

    info!("{}", report.summary());
    Ok(report)
}

// ============================================================================
// STAGES
// ============================================================================

/// Load every track file; failures are logged and returned, never fatal
///
/// Loaded tracks are ordered by (start, path) so track indices, and with them
/// the assigner's last tie-break, do not depend on directory listing order.
pub fn load_tracks(paths: &[PathBuf], policy: OrderPolicy) -> (Vec<Track>, Vec<SkippedTrack>) {
    let mut tracks = Vec::new();
    let mut skipped = Vec::new();

    for path in paths {
        match loader::load(path, policy) {
            Ok(track) => tracks.push(track),
            Err(e) => {
                warn!(track = %path.display(), code = e.code(), "skipping track: {e}");
                skipped.push(SkippedTrack {
                    path: path.clone(),
                    code: e.code().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    tracks.sort_by(|a, b| a.start().cmp(&b.start()).then_with(|| a.path.cmp(&b.path)));
    (tracks, skipped)
}

/// Timestamp, assign and match a single photo
pub fn locate(extractor: &TimestampExtractor, path: &Path, tracks: &[Track]) -> PhotoOutcome {
    let photo = match extractor.extract(path) {
        Ok(photo) => photo,
        Err(e) => {
            warn!(photo = %path.display(), code = e.code(), "{e}");
            return PhotoOutcome::Failed {
                path: path.to_path_buf(),
                code: e.code().to_string(),
                reason: e.to_string(),
            };
        }
    };

    let assignment = assign(&photo, tracks);
    let Some(track_index) = assignment.track_index() else {
        info!(photo = %path.display(), time = %photo.time, "photo outside every track");
        return PhotoOutcome::Unassigned { photo };
    };

    let track = &tracks[track_index];
    if assignment.is_ambiguous() {
        warn!(
            photo = %path.display(),
            chosen = %track.path.display(),
            "photo falls inside several tracks, using the tightest one"
        );
    }

    let nearest = nearest_point(track, photo.time);
    let waypoint = Waypoint::from_match(&photo, nearest.point);
    let offset_seconds = (nearest.point.time - photo.time).num_seconds();

    PhotoOutcome::Matched {
        photo,
        track_index,
        track_name: track.name.clone(),
        waypoint,
        offset_seconds,
        ambiguous: assignment.is_ambiguous(),
    }
}

/// Locate every photo; outcomes keep the order of `paths`
pub fn locate_all(
    extractor: &TimestampExtractor,
    paths: &[PathBuf],
    tracks: &[Track],
    jobs: usize,
) -> Result<Vec<PhotoOutcome>, RunError> {
    if jobs > 1 {
        return locate_parallel(extractor, paths, tracks, jobs);
    }

    Ok(paths
        .iter()
        .map(|path| locate(extractor, path, tracks))
        .collect())
}

#[cfg(feature = "parallel")]
fn locate_parallel(
    extractor: &TimestampExtractor,
    paths: &[PathBuf],
    tracks: &[Track],
    jobs: usize,
) -> Result<Vec<PhotoOutcome>, RunError> {
    use rayon::prelude::*;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| RunError::ThreadPool(e.to_string()))?;

    Ok(pool.install(|| {
        paths
            .par_iter()
            .map(|path| locate(extractor, path, tracks))
            .collect()
    }))
}

#[cfg(not(feature = "parallel"))]
fn locate_parallel(
    extractor: &TimestampExtractor,
    paths: &[PathBuf],
    tracks: &[Track],
    jobs: usize,
) -> Result<Vec<PhotoOutcome>, RunError> {
    warn!(jobs, "built without the `parallel` feature, processing sequentially");
    locate_all(extractor, paths, tracks, 1)
}

/// Group matched waypoints by track, one output per loaded track
pub fn collect_outputs<'a>(tracks: &'a [Track], outcomes: &[PhotoOutcome]) -> Vec<TrackOutput<'a>> {
    let mut outputs: Vec<TrackOutput> = tracks.iter().map(TrackOutput::new).collect();

    for outcome in outcomes {
        if let PhotoOutcome::Matched {
            track_index,
            waypoint,
            ..
        } = outcome
        {
            if let Some(output) = outputs.get_mut(*track_index) {
                output.push(waypoint.clone());
            }
        }
    }

    outputs
}

// ============================================================================
// TESTS
// ============================================================================
