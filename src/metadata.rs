// 🏷️ Image metadata collaborator
//
// The timestamp extractor only needs one thing from an image's metadata:
// the raw capture-time strings. `MetadataReader` is the seam, `ExifReader`
// the production implementation (kamadak-exif).

use anyhow::{anyhow, Context, Result};
use exif::{In, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Raw capture time as stored in the file, not yet parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCaptureTime {
    /// Tag the value came from ("DateTimeOriginal", "DateTime")
    pub tag: &'static str,

    /// EXIF datetime text, normally "YYYY:MM:DD HH:MM:SS"
    pub datetime: String,

    /// Offset text ("+02:00") when the camera recorded one
    pub offset: Option<String>,
}

pub trait MetadataReader: Send + Sync {
    /// `Ok(None)` when the file has no capture-time metadata
    fn capture_time(&self, path: &Path) -> Result<Option<RawCaptureTime>>;
}

// ============================================================================
// EXIF READER
// ============================================================================

/// Capture-time tags in order of preference, each with its offset companion
const CAPTURE_TAGS: [(Tag, &str, Tag); 2] = [
    (Tag::DateTimeOriginal, "DateTimeOriginal", Tag::OffsetTimeOriginal),
    (Tag::DateTime, "DateTime", Tag::OffsetTime),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct ExifReader;

impl ExifReader {
    pub fn new() -> Self {
        ExifReader
    }
}

impl MetadataReader for ExifReader {
    fn capture_time(&self, path: &Path) -> Result<Option<RawCaptureTime>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?;
        let mut reader = BufReader::new(file);

        let exif = match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(anyhow!("EXIF read failed: {e}")),
        };

        for (tag, label, offset_tag) in CAPTURE_TAGS {
            if let Some(datetime) = ascii_field(&exif, tag) {
                return Ok(Some(RawCaptureTime {
                    tag: label,
                    datetime,
                    offset: ascii_field(&exif, offset_tag),
                }));
            }
        }

        Ok(None)
    }
}

fn ascii_field(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match field.value {
        Value::Ascii(ref values) => values
            .first()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .map(|s| s.trim_matches(char::from(0)).trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Minimal little-endian JPEG carrying a single IFD0 DateTime entry
    fn jpeg_with_datetime(datetime: &str) -> Vec<u8> {
        assert_eq!(datetime.len(), 19);

        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II");
        tiff.extend_from_slice(&42u16.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes());
        // IFD0 with one entry
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x0132u16.to_le_bytes()); // DateTime
        tiff.extend_from_slice(&2u16.to_le_bytes()); // ASCII
        tiff.extend_from_slice(&20u32.to_le_bytes());
        tiff.extend_from_slice(&26u32.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes()); // no next IFD
        tiff.extend_from_slice(datetime.as_bytes());
        tiff.push(0);

        wrap_in_jpeg(&tiff)
    }

    /// IFD0 holding only the Exif IFD pointer; the Exif IFD holds
    /// DateTimeOriginal and OffsetTimeOriginal
    fn jpeg_with_original(datetime: &str, offset: &str) -> Vec<u8> {
        assert_eq!(datetime.len(), 19);
        assert_eq!(offset.len(), 6);

        let exif_ifd = 8 + 2 + 12 + 4;
        let datetime_at = exif_ifd + 2 + 2 * 12 + 4;
        let offset_at = datetime_at + 20;

        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II");
        tiff.extend_from_slice(&42u16.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes());
        // IFD0
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x8769u16.to_le_bytes()); // ExifIFDPointer
        tiff.extend_from_slice(&4u16.to_le_bytes()); // LONG
        tiff.extend_from_slice(&1u32.to_le_bytes());
        tiff.extend_from_slice(&(exif_ifd as u32).to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());
        // Exif IFD, entries sorted by tag
        tiff.extend_from_slice(&2u16.to_le_bytes());
        tiff.extend_from_slice(&0x9003u16.to_le_bytes()); // DateTimeOriginal
        tiff.extend_from_slice(&2u16.to_le_bytes());
        tiff.extend_from_slice(&20u32.to_le_bytes());
        tiff.extend_from_slice(&(datetime_at as u32).to_le_bytes());
        tiff.extend_from_slice(&0x9011u16.to_le_bytes()); // OffsetTimeOriginal
        tiff.extend_from_slice(&2u16.to_le_bytes());
        tiff.extend_from_slice(&7u32.to_le_bytes());
        tiff.extend_from_slice(&(offset_at as u32).to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(tiff.len(), datetime_at);
        tiff.extend_from_slice(datetime.as_bytes());
        tiff.push(0);
        tiff.extend_from_slice(offset.as_bytes());
        tiff.push(0);

        wrap_in_jpeg(&tiff)
    }

    fn wrap_in_jpeg(tiff: &[u8]) -> Vec<u8> {
        let mut app1 = b"Exif\0\0".to_vec();
        app1.extend_from_slice(tiff);

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
        jpeg.extend_from_slice(&app1);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }

    #[test]
    fn test_reads_datetime_from_jpeg() {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(&jpeg_with_datetime("2023:06:01 14:00:00")).unwrap();

        let raw = ExifReader::new().capture_time(file.path()).unwrap();

        assert_eq!(
            raw,
            Some(RawCaptureTime {
                tag: "DateTime",
                datetime: "2023:06:01 14:00:00".to_string(),
                offset: None,
            })
        );
    }

    #[test]
    fn test_reads_original_time_and_offset_from_exif_ifd() {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(&jpeg_with_original("2023:06:01 16:00:00", "+02:00"))
            .unwrap();

        let raw = ExifReader::new().capture_time(file.path()).unwrap();

        assert_eq!(
            raw,
            Some(RawCaptureTime {
                tag: "DateTimeOriginal",
                datetime: "2023:06:01 16:00:00".to_string(),
                offset: Some("+02:00".to_string()),
            })
        );
    }

    #[test]
    fn test_not_an_image_is_an_error() {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        file.write_all(b"definitely not a jpeg").unwrap();

        assert!(ExifReader::new().capture_time(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ExifReader::new().capture_time(Path::new("/nonexistent/photo.jpg"));
        assert!(result.is_err());
    }
}
