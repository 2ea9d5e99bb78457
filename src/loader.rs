// 📂 Track Loader - GPX file → Track
//
// Streams the document with quick-xml and keeps every <trkpt> of every
// <trk>/<trkseg> in file order. Route points and existing waypoints are not
// track points. Points without <time> cannot be matched and are skipped.

use crate::entities::{OrderPolicy, Track, TrackPoint};
use crate::error::TrackError;
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Load and validate a GPX track file
pub fn load(path: &Path, policy: OrderPolicy) -> Result<Track, TrackError> {
    let source = fs::read_to_string(path)?;
    let track = parse(path, source, policy)?;
    info!(
        track = %path.display(),
        name = %track.name,
        points = track.len(),
        start = %track.start(),
        end = %track.end(),
        "loaded track"
    );
    Ok(track)
}

/// Parse GPX text; `path` only provides identity (name fallback, output name)
pub fn parse(path: &Path, source: String, policy: OrderPolicy) -> Result<Track, TrackError> {
    let parsed = parse_points(source.strip_prefix('\u{feff}').unwrap_or(&source))?;

    if parsed.untimed > 0 {
        debug!(
            track = %path.display(),
            skipped = parsed.untimed,
            "skipped track points without <time>"
        );
    }

    let name = parsed
        .name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| crate::entities::track::file_stem(path))
        .unwrap_or_else(|| path.display().to_string());

    Track::new(path.to_path_buf(), name, parsed.points, source, policy)
}

// ============================================================================
// XML WALK
// ============================================================================

struct ParsedGpx {
    name: Option<String>,
    points: Vec<TrackPoint>,
    untimed: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    TrackName,
    Elevation,
    Time,
}

/// A <trkpt> whose children are still being read
struct PendingPoint {
    lat: f64,
    lon: f64,
    elevation: Option<f64>,
    time: Option<DateTime<Utc>>,
}

fn parse_points(source: &str) -> Result<ParsedGpx, TrackError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut parsed = ParsedGpx {
        name: None,
        points: Vec::new(),
        untimed: 0,
    };
    let mut trk_depth = 0usize;
    // open elements, and the count at which the pending <trkpt> was opened
    let mut depth = 0usize;
    let mut point_depth = 0usize;
    let mut pending: Option<PendingPoint> = None;
    let mut field: Option<Field> = None;
    let mut saw_gpx = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            TrackError::Xml(format!("at byte {}: {e}", reader.buffer_position()))
        })?;

        match event {
            Event::Start(e) => {
                // only direct children of <trkpt>, not vendor <extensions>
                let in_point = pending.is_some() && depth == point_depth + 1;
                match e.local_name().as_ref() {
                    b"gpx" => saw_gpx = true,
                    b"trk" => trk_depth += 1,
                    b"trkpt" if trk_depth > 0 => {
                        pending = Some(start_point(&e)?);
                        point_depth = depth;
                    }
                    b"ele" if in_point => field = Some(Field::Elevation),
                    b"time" if in_point => field = Some(Field::Time),
                    b"name" if trk_depth > 0 && pending.is_none() && parsed.name.is_none() => {
                        field = Some(Field::TrackName)
                    }
                    _ => field = None,
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"trkpt" && trk_depth > 0 {
                    // <trkpt lat=".." lon=".."/> has no <time>
                    start_point(&e)?;
                    parsed.untimed += 1;
                }
            }
            Event::Text(t) => {
                if let Some(current) = field {
                    let text = t
                        .unescape()
                        .map_err(|e| TrackError::Xml(e.to_string()))?
                        .trim()
                        .to_string();
                    match current {
                        Field::TrackName => parsed.name = Some(text),
                        Field::Elevation => {
                            if let Some(point) = pending.as_mut() {
                                point.elevation = Some(parse_number("ele", &text)?);
                            }
                        }
                        Field::Time => {
                            if let Some(point) = pending.as_mut() {
                                point.time = Some(parse_time(&text)?);
                            }
                        }
                    }
                }
            }
            Event::End(e) => {
                field = None;
                depth = depth.saturating_sub(1);
                match e.local_name().as_ref() {
                    b"trk" => trk_depth = trk_depth.saturating_sub(1),
                    b"trkpt" => {
                        if let Some(point) = pending.take() {
                            match point.time {
                                Some(time) => parsed.points.push(TrackPoint {
                                    time,
                                    lat: point.lat,
                                    lon: point.lon,
                                    elevation: point.elevation,
                                }),
                                None => parsed.untimed += 1,
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_gpx {
        return Err(TrackError::InvalidGpx("missing <gpx> root element".to_string()));
    }

    Ok(parsed)
}

fn start_point(e: &BytesStart) -> Result<PendingPoint, TrackError> {
    let mut lat = None;
    let mut lon = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|e| TrackError::Xml(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| TrackError::Xml(e.to_string()))?;
        match attr.key.local_name().as_ref() {
            b"lat" => lat = Some(parse_number("lat", &value)?),
            b"lon" => lon = Some(parse_number("lon", &value)?),
            _ => {}
        }
    }

    let lat = lat.ok_or_else(|| TrackError::InvalidGpx("trkpt without lat".to_string()))?;
    let lon = lon.ok_or_else(|| TrackError::InvalidGpx("trkpt without lon".to_string()))?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(TrackError::InvalidGpx(format!(
            "coordinates out of range: lat={lat} lon={lon}"
        )));
    }

    Ok(PendingPoint {
        lat,
        lon,
        elevation: None,
        time: None,
    })
}

fn parse_number(what: &str, text: &str) -> Result<f64, TrackError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| TrackError::InvalidGpx(format!("invalid {what} value '{text}'")))
}

/// GPX times are xsd:dateTime; anything without an offset is refused
fn parse_time(text: &str) -> Result<DateTime<Utc>, TrackError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    if NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").is_ok() {
        return Err(TrackError::AmbiguousTimezone {
            value: text.to_string(),
        });
    }

    Err(TrackError::InvalidGpx(format!("invalid time '{text}'")))
}

// ============================================================================
// TESTS
// ============================================================================
