// ⏱️ Timestamp Extractor - photo file → capture instant (UTC)
//
// An ordered chain of sources, tried until one yields a value:
//   1. FilenameTimestamp  (strict patterns, see FilenamePattern)
//   2. ExifTimestamp      (DateTimeOriginal, then DateTime)
//
// Every value is normalized to UTC through a TimezonePolicy. Naive wall-clock
// values are never silently assumed to be UTC.

use crate::entities::{Photo, TimestampOrigin};
use crate::error::PhotoError;
use crate::metadata::{ExifReader, MetadataReader};
use anyhow::Result;
use chrono::offset::LocalResult;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;
use tracing::debug;

// ============================================================================
// CAPTURE TIME
// ============================================================================

/// A capture time before timezone normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTime {
    /// Wall-clock time without offset (file names, most EXIF)
    Naive(NaiveDateTime),

    /// Time with an explicit offset (EXIF 2.31 OffsetTime*)
    Zoned(DateTime<FixedOffset>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub time: CaptureTime,
    pub origin: TimestampOrigin,
}

// ============================================================================
// TIMEZONE POLICY
// ============================================================================

/// How naive capture times are placed on the UTC timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimezonePolicy {
    /// Interpret naive times as wall-clock time in this zone
    Assume(Tz),

    /// Refuse naive times (`AmbiguousTimezone`)
    Strict,
}

impl Default for TimezonePolicy {
    fn default() -> Self {
        TimezonePolicy::Assume(Tz::UTC)
    }
}

impl fmt::Display for TimezonePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimezonePolicy::Assume(tz) => write!(f, "{}", tz.name()),
            TimezonePolicy::Strict => write!(f, "strict (offset required)"),
        }
    }
}

impl TimezonePolicy {
    /// Normalize to UTC; the error string explains why it could not be done
    pub fn normalize(&self, time: CaptureTime) -> std::result::Result<DateTime<Utc>, String> {
        match (time, self) {
            (CaptureTime::Zoned(dt), _) => Ok(dt.with_timezone(&Utc)),
            (CaptureTime::Naive(naive), TimezonePolicy::Strict) => Err(format!(
                "capture time {naive} has no UTC offset and no timezone was given"
            )),
            (CaptureTime::Naive(naive), TimezonePolicy::Assume(tz)) => {
                match tz.from_local_datetime(&naive) {
                    LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
                    LocalResult::Ambiguous(a, b) => Err(format!(
                        "{naive} occurs twice in {} ({} and {})",
                        tz.name(),
                        a.with_timezone(&Utc),
                        b.with_timezone(&Utc)
                    )),
                    LocalResult::None => {
                        Err(format!("{naive} does not exist in {}", tz.name()))
                    }
                }
            }
        }
    }
}

// ============================================================================
// TIMESTAMP SOURCES
// ============================================================================

/// One strategy of the extractor chain
///
/// `Ok(None)` means "this source does not apply to the file"; an error means
/// the source applied but failed. Either way the chain moves on.
pub trait TimestampSource: Send + Sync {
    fn name(&self) -> &str;

    fn capture(&self, path: &Path) -> Result<Option<Capture>>;
}

/// File name layouts recognized by `FilenameTimestamp`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenamePattern {
    /// `YYYYMMDD_HHMMSS`, e.g. `20230601_140000.jpg`
    Full,

    /// `YYMMDD_HHMM`, e.g. `230601_1400.nef`
    Short,
}

// A pattern must cover the start of the stem and be followed either by the
// end of the stem or a non-digit separator.
static FULL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})(\d{2})(\d{2})_(\d{2})(\d{2})(\d{2})(?:[_\-~( ].*)?$")
        .expect("valid regex")
});

static SHORT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2})(\d{2})(\d{2})_(\d{2})(\d{2})(?:[_\-~( ].*)?$").expect("valid regex")
});

impl FilenamePattern {
    pub const ALL: [FilenamePattern; 2] = [FilenamePattern::Full, FilenamePattern::Short];

    pub fn label(&self) -> &'static str {
        match self {
            FilenamePattern::Full => "YYYYMMDD_HHMMSS",
            FilenamePattern::Short => "YYMMDD_HHMM",
        }
    }

    /// Parse a file stem; `None` unless the stem strictly matches
    pub fn parse(&self, stem: &str) -> Option<NaiveDateTime> {
        match self {
            FilenamePattern::Full => {
                let caps = FULL_PATTERN.captures(stem)?;
                let n = |i: usize| caps[i].parse::<u32>().ok();
                let year = caps[1].parse::<i32>().ok()?;
                NaiveDate::from_ymd_opt(year, n(2)?, n(3)?)?.and_hms_opt(n(4)?, n(5)?, n(6)?)
            }
            FilenamePattern::Short => {
                let caps = SHORT_PATTERN.captures(stem)?;
                let n = |i: usize| caps[i].parse::<u32>().ok();
                // strptime %y pivot: 69-99 → 19xx, 00-68 → 20xx
                let yy = caps[1].parse::<i32>().ok()?;
                let year = if yy < 69 { 2000 + yy } else { 1900 + yy };
                NaiveDate::from_ymd_opt(year, n(2)?, n(3)?)?.and_hms_opt(n(4)?, n(5)?, 0)
            }
        }
    }
}

/// Capture time embedded in the file name
pub struct FilenameTimestamp {
    patterns: Vec<FilenamePattern>,
}

impl FilenameTimestamp {
    pub fn new() -> Self {
        FilenameTimestamp {
            patterns: FilenamePattern::ALL.to_vec(),
        }
    }

    pub fn with_patterns(patterns: Vec<FilenamePattern>) -> Self {
        FilenameTimestamp { patterns }
    }
}

impl Default for FilenameTimestamp {
    fn default() -> Self {
        Self::new()
    }
}

impl TimestampSource for FilenameTimestamp {
    fn name(&self) -> &str {
        "filename"
    }

    fn capture(&self, path: &Path) -> Result<Option<Capture>> {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            return Ok(None);
        };

        for pattern in &self.patterns {
            if let Some(naive) = pattern.parse(stem) {
                return Ok(Some(Capture {
                    time: CaptureTime::Naive(naive),
                    origin: TimestampOrigin::Filename {
                        pattern: pattern.label().to_string(),
                    },
                }));
            }
        }

        Ok(None)
    }
}

/// Capture time from embedded metadata
pub struct ExifTimestamp {
    reader: Box<dyn MetadataReader>,
}

impl ExifTimestamp {
    pub fn new(reader: Box<dyn MetadataReader>) -> Self {
        ExifTimestamp { reader }
    }
}

impl Default for ExifTimestamp {
    fn default() -> Self {
        Self::new(Box::new(ExifReader::new()))
    }
}

impl TimestampSource for ExifTimestamp {
    fn name(&self) -> &str {
        "exif"
    }

    fn capture(&self, path: &Path) -> Result<Option<Capture>> {
        let Some(raw) = self.reader.capture_time(path)? else {
            return Ok(None);
        };

        let naive = NaiveDateTime::parse_from_str(&raw.datetime, "%Y:%m:%d %H:%M:%S")
            .map_err(|e| anyhow::anyhow!("{} '{}' is malformed: {e}", raw.tag, raw.datetime))?;

        let time = match raw.offset.as_deref().and_then(parse_offset) {
            Some(offset) => match offset.from_local_datetime(&naive) {
                LocalResult::Single(dt) => CaptureTime::Zoned(dt),
                _ => CaptureTime::Naive(naive),
            },
            None => CaptureTime::Naive(naive),
        };

        Ok(Some(Capture {
            time,
            origin: TimestampOrigin::Exif {
                tag: raw.tag.to_string(),
            },
        }))
    }
}

/// EXIF offset text: "+02:00", "-05:30"
fn parse_offset(text: &str) -> Option<FixedOffset> {
    let text = text.trim();
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let seconds = hours.parse::<i32>().ok()? * 3600 + minutes.parse::<i32>().ok()? * 60;
    FixedOffset::east_opt(sign * seconds)
}

/// Default chain: file name first, EXIF as fallback
pub fn default_sources() -> Vec<Box<dyn TimestampSource>> {
    vec![
        Box::new(FilenameTimestamp::new()),
        Box::new(ExifTimestamp::default()),
    ]
}

// ============================================================================
// EXTRACTOR
// ============================================================================

pub struct TimestampExtractor {
    sources: Vec<Box<dyn TimestampSource>>,
    timezone: TimezonePolicy,
}

impl TimestampExtractor {
    pub fn new(timezone: TimezonePolicy) -> Self {
        Self::with_sources(default_sources(), timezone)
    }

    pub fn with_sources(sources: Vec<Box<dyn TimestampSource>>, timezone: TimezonePolicy) -> Self {
        TimestampExtractor { sources, timezone }
    }

    pub fn timezone(&self) -> TimezonePolicy {
        self.timezone
    }

    /// First source that yields a value wins; later sources are not consulted
    pub fn extract(&self, path: &Path) -> std::result::Result<Photo, PhotoError> {
        let mut misses = Vec::new();

        for source in &self.sources {
            match source.capture(path) {
                Ok(Some(capture)) => {
                    let time = self.timezone.normalize(capture.time).map_err(|reason| {
                        PhotoError::AmbiguousTimezone {
                            path: path.to_path_buf(),
                            reason,
                        }
                    })?;
                    debug!(photo = %path.display(), origin = %capture.origin, %time, "capture time");
                    return Ok(Photo::new(path.to_path_buf(), time, capture.origin));
                }
                Ok(None) => misses.push(format!("{}: no value", source.name())),
                Err(e) => {
                    debug!(photo = %path.display(), source = source.name(), "source failed: {e:#}");
                    misses.push(format!("{}: {e:#}", source.name()));
                }
            }
        }

        Err(PhotoError::MissingTimestamp {
            path: path.to_path_buf(),
            reason: misses.join("; "),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::RawCaptureTime;
    use std::path::PathBuf;

    fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    /// Stub metadata reader returning a fixed value
    struct FixedMetadata(Option<RawCaptureTime>);

    impl MetadataReader for FixedMetadata {
        fn capture_time(&self, _path: &Path) -> Result<Option<RawCaptureTime>> {
            Ok(self.0.clone())
        }
    }

    struct FailingMetadata;

    impl MetadataReader for FailingMetadata {
        fn capture_time(&self, _path: &Path) -> Result<Option<RawCaptureTime>> {
            Err(anyhow::anyhow!("corrupt header"))
        }
    }

    fn extractor_with(metadata: Box<dyn MetadataReader>, tz: TimezonePolicy) -> TimestampExtractor {
        TimestampExtractor::with_sources(
            vec![
                Box::new(FilenameTimestamp::new()),
                Box::new(ExifTimestamp::new(metadata)),
            ],
            tz,
        )
    }

    fn exif_value(datetime: &str, offset: Option<&str>) -> Option<RawCaptureTime> {
        Some(RawCaptureTime {
            tag: "DateTimeOriginal",
            datetime: datetime.to_string(),
            offset: offset.map(|s| s.to_string()),
        })
    }

    // ------------------------------------------------------------------------
    // File name patterns
    // ------------------------------------------------------------------------

    #[test]
    fn test_full_pattern() {
        assert_eq!(
            FilenamePattern::Full.parse("20230601_140000"),
            Some(naive(2023, 6, 1, 14, 0, 0))
        );
    }

    #[test]
    fn test_full_pattern_with_suffix() {
        assert_eq!(
            FilenamePattern::Full.parse("20230601_140512_2"),
            Some(naive(2023, 6, 1, 14, 5, 12))
        );
        assert_eq!(
            FilenamePattern::Full.parse("20230601_140512-edit"),
            Some(naive(2023, 6, 1, 14, 5, 12))
        );
    }

    #[test]
    fn test_full_pattern_is_strict() {
        // extra digit
        assert_eq!(FilenamePattern::Full.parse("20230601_1400001"), None);
        // missing digit
        assert_eq!(FilenamePattern::Full.parse("20230601_14000"), None);
        // prefix
        assert_eq!(FilenamePattern::Full.parse("IMG_20230601_140000"), None);
        // glued suffix
        assert_eq!(FilenamePattern::Full.parse("20230601_140000abc"), None);
        // month 13
        assert_eq!(FilenamePattern::Full.parse("20231301_140000"), None);
        // 25 o'clock
        assert_eq!(FilenamePattern::Full.parse("20230601_250000"), None);
    }

    #[test]
    fn test_short_pattern() {
        assert_eq!(
            FilenamePattern::Short.parse("230601_1400"),
            Some(naive(2023, 6, 1, 14, 0, 0))
        );
        assert_eq!(
            FilenamePattern::Short.parse("990601_0930_DSC"),
            Some(naive(1999, 6, 1, 9, 30, 0))
        );
        assert_eq!(FilenamePattern::Short.parse("230601_140000"), None);
    }

    #[test]
    fn test_filename_source_reports_pattern() {
        let capture = FilenameTimestamp::new()
            .capture(Path::new("/pics/230601_1400.NEF"))
            .unwrap()
            .unwrap();

        assert_eq!(capture.time, CaptureTime::Naive(naive(2023, 6, 1, 14, 0, 0)));
        assert_eq!(
            capture.origin,
            TimestampOrigin::Filename {
                pattern: "YYMMDD_HHMM".to_string()
            }
        );
    }

    #[test]
    fn test_filename_source_not_applicable() {
        let capture = FilenameTimestamp::new()
            .capture(Path::new("DSC_0042.jpg"))
            .unwrap();
        assert!(capture.is_none());
    }

    // ------------------------------------------------------------------------
    // Timezone policy
    // ------------------------------------------------------------------------

    #[test]
    fn test_assume_utc() {
        let policy = TimezonePolicy::default();
        let t = policy
            .normalize(CaptureTime::Naive(naive(2023, 6, 1, 14, 0, 0)))
            .unwrap();
        assert_eq!(t, utc(2023, 6, 1, 14, 0, 0));
    }

    #[test]
    fn test_assume_named_zone() {
        let policy = TimezonePolicy::Assume(chrono_tz::Europe::Madrid);
        // CEST = UTC+2
        let t = policy
            .normalize(CaptureTime::Naive(naive(2023, 6, 1, 14, 0, 0)))
            .unwrap();
        assert_eq!(t, utc(2023, 6, 1, 12, 0, 0));
    }

    #[test]
    fn test_ambiguous_local_time_is_rejected() {
        let policy = TimezonePolicy::Assume(chrono_tz::Europe::Madrid);
        // clocks fall back 03:00 → 02:00 on 2023-10-29
        let result = policy.normalize(CaptureTime::Naive(naive(2023, 10, 29, 2, 30, 0)));
        assert!(result.unwrap_err().contains("occurs twice"));
    }

    #[test]
    fn test_nonexistent_local_time_is_rejected() {
        let policy = TimezonePolicy::Assume(chrono_tz::Europe::Madrid);
        // clocks spring forward 02:00 → 03:00 on 2023-03-26
        let result = policy.normalize(CaptureTime::Naive(naive(2023, 3, 26, 2, 30, 0)));
        assert!(result.unwrap_err().contains("does not exist"));
    }

    #[test]
    fn test_strict_rejects_naive_accepts_zoned() {
        let policy = TimezonePolicy::Strict;
        assert!(policy
            .normalize(CaptureTime::Naive(naive(2023, 6, 1, 14, 0, 0)))
            .is_err());

        let zoned = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2023, 6, 1, 14, 0, 0)
            .unwrap();
        assert_eq!(
            policy.normalize(CaptureTime::Zoned(zoned)).unwrap(),
            utc(2023, 6, 1, 12, 0, 0)
        );
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("+02:00"), FixedOffset::east_opt(7200));
        assert_eq!(parse_offset("-05:30"), FixedOffset::east_opt(-19800));
        assert_eq!(parse_offset("02:00"), None);
        assert_eq!(parse_offset(""), None);
    }

    // ------------------------------------------------------------------------
    // Extractor chain
    // ------------------------------------------------------------------------

    #[test]
    fn test_filename_wins_over_exif() {
        let extractor = extractor_with(
            Box::new(FixedMetadata(exif_value("2020:01:01 00:00:00", None))),
            TimezonePolicy::default(),
        );

        let photo = extractor.extract(Path::new("20230601_140000.jpg")).unwrap();

        assert_eq!(photo.time, utc(2023, 6, 1, 14, 0, 0));
        assert_eq!(
            photo.origin,
            TimestampOrigin::Filename {
                pattern: "YYYYMMDD_HHMMSS".to_string()
            }
        );
    }

    #[test]
    fn test_falls_back_to_exif() {
        let extractor = extractor_with(
            Box::new(FixedMetadata(exif_value("2023:06:01 14:00:00", None))),
            TimezonePolicy::default(),
        );

        let photo = extractor.extract(Path::new("DSC_0042.NEF")).unwrap();

        assert_eq!(photo.time, utc(2023, 6, 1, 14, 0, 0));
        assert_eq!(photo.name, "DSC_0042");
        assert_eq!(
            photo.origin,
            TimestampOrigin::Exif {
                tag: "DateTimeOriginal".to_string()
            }
        );
    }

    #[test]
    fn test_exif_offset_makes_time_zoned() {
        let extractor = extractor_with(
            Box::new(FixedMetadata(exif_value("2023:06:01 14:00:00", Some("+02:00")))),
            TimezonePolicy::Strict,
        );

        let photo = extractor.extract(Path::new("DSC_0042.jpg")).unwrap();
        assert_eq!(photo.time, utc(2023, 6, 1, 12, 0, 0));
    }

    #[test]
    fn test_missing_timestamp_when_no_source_applies() {
        let extractor = extractor_with(Box::new(FixedMetadata(None)), TimezonePolicy::default());

        let err = extractor.extract(Path::new("holiday.jpg")).unwrap_err();

        assert!(matches!(err, PhotoError::MissingTimestamp { .. }));
        assert_eq!(err.path(), &PathBuf::from("holiday.jpg"));
    }

    #[test]
    fn test_missing_timestamp_keeps_source_failure() {
        let extractor = extractor_with(Box::new(FailingMetadata), TimezonePolicy::default());

        let err = extractor.extract(Path::new("holiday.jpg")).unwrap_err();

        assert!(err.to_string().contains("corrupt header"));
    }

    #[test]
    fn test_malformed_exif_value_is_missing_timestamp() {
        let extractor = extractor_with(
            Box::new(FixedMetadata(exif_value("0000:00:00 00:00:00", None))),
            TimezonePolicy::default(),
        );

        let err = extractor.extract(Path::new("holiday.jpg")).unwrap_err();
        assert!(matches!(err, PhotoError::MissingTimestamp { .. }));
    }

    #[test]
    fn test_strict_policy_gives_ambiguous_timezone() {
        let extractor = extractor_with(Box::new(FixedMetadata(None)), TimezonePolicy::Strict);

        let err = extractor.extract(Path::new("20230601_140000.jpg")).unwrap_err();
        assert!(matches!(err, PhotoError::AmbiguousTimezone { .. }));
        assert_eq!(err.code(), "ambiguous_timezone");
    }
}
