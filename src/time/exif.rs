//! EXIF capture date reading for images

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{trace, warn};

/// Read the `DateTimeOriginal` field of an image
///
/// Returns `Ok(None)` when the file has no EXIF block, no capture date, or a
/// capture date that cannot be parsed. A container that cannot be parsed at
/// all is an error: the file claims to be an image but is not one we can
/// safely rewrite.
pub fn read_capture_date(path: &Path) -> Result<Option<NaiveDateTime>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let exif = match Reader::new()
        .continue_on_error(true)
        .read_from_container(&mut reader)
        .or_else(|e| {
            e.distill_partial_result(|errors| {
                for error in errors {
                    warn!(?path, %error, "Ignoring malformed EXIF entry");
                }
            })
        }) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => {
            trace!(?path, "No EXIF block");
            return Ok(None);
        }
        Err(exif::Error::Io(e)) => return Err(Error::Io(e)),
        Err(e) => {
            return Err(Error::ExifRead {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }
    };

    let Some(field) = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY) else {
        trace!(?path, "EXIF block without DateTimeOriginal");
        return Ok(None);
    };

    let raw = match field.value {
        Value::Ascii(ref values) => values
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    };

    Ok(raw.as_deref().and_then(parse_exif_datetime))
}

/// Whether the file carries an EXIF block at all
pub fn has_exif_block(path: &Path) -> Result<bool> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    match Reader::new().continue_on_error(true).read_from_container(&mut reader) {
        Ok(_) | Err(exif::Error::PartialResult(_)) => Ok(true),
        Err(exif::Error::NotFound(_)) => Ok(false),
        Err(exif::Error::Io(e)) => Err(Error::Io(e)),
        Err(e) => Err(Error::ExifRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

/// Parse EXIF datetime string format: "YYYY:MM:DD HH:MM:SS"
pub(crate) fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_end_matches('\0').trim_matches('"');

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, super::EXIF_FORMAT) {
        return Some(dt);
    }

    // Try with subseconds
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S%.f") {
        return Some(dt);
    }

    // Some writers ignore the EXIF separators
    let formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    None
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::fs;
    use tempfile::tempdir;

    /// Minimal valid JPEG with no EXIF data (SOI + APP0 JFIF + EOI)
    pub(crate) fn minimal_jpeg() -> Vec<u8> {
        vec![
            0xFF, 0xD8, // SOI
            0xFF, 0xE0, // APP0
            0x00, 0x10, // length 16
            0x4A, 0x46, 0x49, 0x46, 0x00, // "JFIF\0"
            0x01, 0x01, // version 1.1
            0x00, // no density units
            0x00, 0x01, // X density
            0x00, 0x01, // Y density
            0x00, 0x00, // no thumbnail
            0xFF, 0xD9, // EOI
        ]
    }

    #[test]
    fn test_parse_exif_datetime() {
        let dt = parse_exif_datetime("2020:10:18 00:02:24").unwrap();
        assert_eq!(dt.year(), 2020);
        assert_eq!(dt.month(), 10);
        assert_eq!(dt.day(), 18);
        assert_eq!(dt.minute(), 2);
        assert_eq!(dt.second(), 24);

        // NUL-terminated, as stored in the file
        assert!(parse_exif_datetime("2020:10:18 00:02:24\0").is_some());

        // With quotes
        assert!(parse_exif_datetime("\"2020:10:18 00:02:24\"").is_some());

        // Alternative formats
        assert!(parse_exif_datetime("2020-10-18 00:02:24").is_some());

        // Blank or broken values
        assert!(parse_exif_datetime("    :  :     :  :  ").is_none());
        assert!(parse_exif_datetime("invalid").is_none());
    }

    #[test]
    fn test_jpeg_without_exif() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("IMG-20201018-WA0000.jpg");
        fs::write(&path, minimal_jpeg()).unwrap();

        assert_eq!(read_capture_date(&path).unwrap(), None);
        assert!(!has_exif_block(&path).unwrap());
    }

    #[test]
    fn test_not_an_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("IMG-20201018-WA0000.jpg");
        fs::write(&path, b"definitely not a jpeg").unwrap();

        assert!(read_capture_date(&path).is_err());
    }
}
