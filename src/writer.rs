// ✍️ Waypoint Writer - annotated copy of a GPX track
//
// The source document is never re-serialized: quick-xml only locates the
// insertion point, and the <wpt> block is spliced into the raw text there.
// <wpt> elements go in as direct children of <gpx> in front of the first
// <rte>, <trk> or <extensions> (GPX 1.1 child order), or before </gpx>.
// Every byte outside the inserted block, BOM included, is kept as is.

use crate::entities::track::format_time;
use crate::entities::{Track, Waypoint};
use crate::error::{RunError, TrackError};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix appended to the track file stem for output files
pub const OUTPUT_SUFFIX: &str = "_with_imgs";

// ============================================================================
// TRACK OUTPUT (annotated layer)
// ============================================================================

/// A loaded track plus the waypoints matched against it
#[derive(Debug, Clone)]
pub struct TrackOutput<'a> {
    pub track: &'a Track,
    waypoints: Vec<Waypoint>,
}

impl<'a> TrackOutput<'a> {
    pub fn new(track: &'a Track) -> Self {
        TrackOutput {
            track,
            waypoints: Vec::new(),
        }
    }

    pub fn push(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoints ordered by instant, ties by photo name
    pub fn sorted_waypoints(&self) -> Vec<Waypoint> {
        let mut sorted = self.waypoints.clone();
        sorted.sort_by(|a, b| {
            a.time
                .cmp(&b.time)
                .then_with(|| a.photo_time.cmp(&b.photo_time))
                .then_with(|| a.photo_name.cmp(&b.photo_name))
        });
        sorted
    }

    /// `<stem>_with_imgs.gpx`
    pub fn file_name(&self) -> String {
        format!("{}{OUTPUT_SUFFIX}.gpx", self.track.file_stem())
    }

    pub fn render(&self) -> Result<String, TrackError> {
        render(self.track, &self.sorted_waypoints())
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn emit<W: Write>(writer: &mut Writer<W>, event: Event) -> Result<(), TrackError> {
    writer
        .write_event(event)
        .map_err(|e| TrackError::Write(e.to_string()))
}

fn is_after_waypoints(local_name: &[u8]) -> bool {
    matches!(local_name, b"rte" | b"trk" | b"extensions")
}

/// Copy of the track's GPX source with `waypoints` inserted, in the given order
pub fn render(track: &Track, waypoints: &[Waypoint]) -> Result<String, TrackError> {
    let source = track.source();
    if waypoints.is_empty() {
        return Ok(source.to_string());
    }

    let (at, separator) = insertion_point(source)?;

    let mut block = Writer::new(Vec::new());
    write_waypoints(&mut block, waypoints, &separator)?;
    let block = String::from_utf8(block.into_inner()).map_err(|e| TrackError::Write(e.to_string()))?;

    let mut out = String::with_capacity(source.len() + block.len());
    out.push_str(&source[..at]);
    out.push_str(&block);
    out.push_str(&source[at..]);
    Ok(out)
}

/// Byte offset of the tag the waypoints go in front of, plus the whitespace
/// separating <gpx> children (reused to indent the inserted elements)
fn insertion_point(source: &str) -> Result<(usize, String), TrackError> {
    // reader positions are relative to the text after the BOM
    let body = source.strip_prefix('\u{feff}').unwrap_or(source);
    let offset = source.len() - body.len();

    let mut reader = Reader::from_str(body);
    let mut depth = 0usize;
    let mut separator = String::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            TrackError::Xml(format!("at byte {}: {e}", reader.buffer_position()))
        })?;

        let insert_here = depth == 1
            && match &event {
                Event::Start(e) | Event::Empty(e) => is_after_waypoints(e.local_name().as_ref()),
                Event::End(_) => true,
                _ => false,
            };
        if insert_here {
            // the event ends right after its '>'; tags contain no other '<'
            let end = reader.buffer_position() as usize;
            let tag_start = body[..end].rfind('<').ok_or_else(|| {
                TrackError::InvalidGpx(format!("cannot locate tag ending at byte {end}"))
            })?;
            return Ok((offset + tag_start, separator));
        }

        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(t) if depth == 1 => {
                if t.iter().all(|b| b.is_ascii_whitespace()) {
                    separator = String::from_utf8_lossy(t).into_owned();
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(TrackError::InvalidGpx(
        "no <gpx> root element to attach waypoints to".to_string(),
    ))
}

fn write_waypoints<W: Write>(
    writer: &mut Writer<W>,
    waypoints: &[Waypoint],
    separator: &str,
) -> Result<(), TrackError> {
    let child_separator = if separator.is_empty() {
        String::new()
    } else {
        format!("{separator}  ")
    };

    for waypoint in waypoints {
        let mut wpt = BytesStart::new("wpt");
        wpt.push_attribute(("lat", waypoint.lat.to_string().as_str()));
        wpt.push_attribute(("lon", waypoint.lon.to_string().as_str()));
        emit(writer, Event::Start(wpt))?;

        let mut children: Vec<(&str, String)> = Vec::new();
        if let Some(elevation) = waypoint.elevation {
            children.push(("ele", elevation.to_string()));
        }
        children.push(("time", format_time(waypoint.time)));
        children.push(("name", waypoint.photo_name.clone()));
        children.push(("cmt", waypoint.photo_path.display().to_string()));
        children.push(("desc", format!("photo taken {}", format_time(waypoint.photo_time))));

        for (tag, text) in &children {
            if !child_separator.is_empty() {
                emit(writer, Event::Text(BytesText::new(&child_separator)))?;
            }
            emit(writer, Event::Start(BytesStart::new(*tag)))?;
            emit(writer, Event::Text(BytesText::new(text)))?;
            emit(writer, Event::End(BytesEnd::new(*tag)))?;
        }

        if !separator.is_empty() {
            emit(writer, Event::Text(BytesText::new(separator)))?;
        }
        emit(writer, Event::End(BytesEnd::new("wpt")))?;
        if !separator.is_empty() {
            emit(writer, Event::Text(BytesText::new(separator)))?;
        }
    }

    Ok(())
}

// ============================================================================
// PERSISTENCE
// ============================================================================

/// Write one file per track that received at least one waypoint
///
/// Tracks without waypoints produce no file. Output names that collide (two
/// tracks with the same stem from different folders) get a numeric suffix.
pub fn persist(outputs: &[TrackOutput], dir: &Path) -> Result<Vec<PathBuf>, RunError> {
    let mut written = Vec::new();
    let mut used_names = HashSet::new();

    let pending: Vec<&TrackOutput> = outputs.iter().filter(|o| !o.is_empty()).collect();
    if pending.is_empty() {
        debug!("no track received waypoints, nothing to write");
        return Ok(written);
    }

    fs::create_dir_all(dir).map_err(|source| RunError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for output in pending {
        let path = dir.join(unique_name(&output.file_name(), &mut used_names));
        let content = output.render().map_err(|source| RunError::Render {
            path: output.track.path.clone(),
            source,
        })?;

        fs::write(&path, content).map_err(|source| RunError::Io {
            path: path.clone(),
            source,
        })?;

        info!(
            output = %path.display(),
            waypoints = output.waypoints().len(),
            "wrote track"
        );
        written.push(path);
    }

    Ok(written)
}

fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let stem = name.trim_end_matches(".gpx");
    let mut n = 2;
    loop {
        let candidate = format!("{stem}_{n}.gpx");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

// ============================================================================
// TESTS
// ============================================================================
