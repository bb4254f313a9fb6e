//! WhatsApp filename parsing
//!
//! WhatsApp names exported media `IMG-YYYYMMDD-WA####.ext` or
//! `VID-YYYYMMDD-WA####.ext`: the day the file was received and a per-day
//! sequence number. Nothing else about the capture time survives.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;
use tracing::trace;

/// Highest sequence number that still maps to a distinct time of day
pub const MAX_SEQUENCE: u32 = 9999;

/// Pattern: (IMG|VID)-YYYYMMDD-WA<4+ digits>.<ext>
static PATTERN_WHATSAPP: OnceLock<Regex> = OnceLock::new();

fn whatsapp_pattern() -> &'static Regex {
    PATTERN_WHATSAPP.get_or_init(|| {
        Regex::new(r"^(?:IMG|VID)-(\d{4})(\d{2})(\d{2})-WA(\d{4,})\.([A-Za-z0-9]+)$").unwrap()
    })
}

/// Date and sequence number recovered from a WhatsApp filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Day the file was received
    pub date: NaiveDate,
    /// Same-day sequence number, clamped to [`MAX_SEQUENCE`]
    pub sequence: u32,
    /// Sequence number as written in the filename (saturating)
    pub raw_sequence: u64,
    /// File extension as written in the filename
    pub extension: String,
}

impl ParsedName {
    /// Whether the sequence number had to be clamped
    ///
    /// Files past the clamp all share the last slot of the day, so their
    /// relative order is lost.
    pub fn is_clamped(&self) -> bool {
        self.raw_sequence > u64::from(MAX_SEQUENCE)
    }
}

/// Parse a WhatsApp media filename
///
/// Returns `None` when the name does not follow the convention or the
/// embedded date is not a real calendar day. The extension is captured but
/// not checked against any allow-list here.
pub fn parse_whatsapp_name(filename: &str) -> Option<ParsedName> {
    let caps = whatsapp_pattern().captures(filename)?;

    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let day: u32 = caps.get(3)?.as_str().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    // Absurdly long digit runs saturate instead of failing the match
    let raw_sequence = caps.get(4)?.as_str().parse::<u64>().unwrap_or(u64::MAX);
    let sequence = raw_sequence.min(u64::from(MAX_SEQUENCE)) as u32;

    trace!(filename, %date, sequence, "Matched WhatsApp pattern");

    Some(ParsedName {
        date,
        sequence,
        raw_sequence,
        extension: caps.get(5)?.as_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_name() {
        let parsed = parse_whatsapp_name("IMG-20201018-WA0018.jpg").unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2020, 10, 18).unwrap());
        assert_eq!(parsed.sequence, 18);
        assert_eq!(parsed.extension, "jpg");
        assert!(!parsed.is_clamped());
    }

    #[test]
    fn test_video_name() {
        let parsed = parse_whatsapp_name("VID-20190101-WA0000.MP4").unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
        assert_eq!(parsed.sequence, 0);
        assert_eq!(parsed.extension, "MP4");
    }

    #[test]
    fn test_sequence_clamp() {
        let parsed = parse_whatsapp_name("IMG-20201018-WA12345.jpg").unwrap();
        assert_eq!(parsed.sequence, MAX_SEQUENCE);
        assert_eq!(parsed.raw_sequence, 12345);
        assert!(parsed.is_clamped());

        let at_max = parse_whatsapp_name("IMG-20201018-WA9999.jpg").unwrap();
        assert_eq!(at_max.sequence, MAX_SEQUENCE);
        assert!(!at_max.is_clamped());

        let huge = parse_whatsapp_name("IMG-20201018-WA99999999999999999999999.jpg").unwrap();
        assert_eq!(huge.sequence, MAX_SEQUENCE);
        assert!(huge.is_clamped());
    }

    #[test]
    fn test_invalid_names() {
        assert!(parse_whatsapp_name("photo.jpg").is_none());
        assert!(parse_whatsapp_name("IMG-2020-WA1.jpg").is_none());
        assert!(parse_whatsapp_name("IMG-20201018-WA001.jpg").is_none());
        assert!(parse_whatsapp_name("img-20201018-WA0018.jpg").is_none());
        assert!(parse_whatsapp_name("IMG_20201018_WA0018.jpg").is_none());
        assert!(parse_whatsapp_name("IMG-20201018-WA0018").is_none());
        assert!(parse_whatsapp_name("IMG-20201018-WA0018 (1).jpg").is_none());
        assert!(parse_whatsapp_name("AUD-20201018-WA0018.opus").is_none());
    }

    #[test]
    fn test_impossible_date() {
        assert!(parse_whatsapp_name("IMG-20201340-WA0001.jpg").is_none());
        assert!(parse_whatsapp_name("IMG-20210229-WA0001.jpg").is_none());
        assert!(parse_whatsapp_name("IMG-20200229-WA0001.jpg").is_some());
    }
}
