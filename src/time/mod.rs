//! Timestamp derivation
//!
//! This module turns a parsed WhatsApp filename into the full date-time
//! used as the target for every metadata patch:
//! - Filename parsing (`filename`)
//! - EXIF capture date reading (`exif`)
//! - Sequence-to-time-of-day mapping (`derive_timestamp`)

pub mod exif;
pub mod filename;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Timelike};
use filetime::FileTime;
use std::fmt;

pub use filename::{MAX_SEQUENCE, ParsedName, parse_whatsapp_name};

/// Seconds between two consecutive sequence numbers (8 with `MAX_SEQUENCE = 9999`)
pub const SECONDS_PER_STEP: u32 = 86_400 / (MAX_SEQUENCE + 1);

/// EXIF date-time layout
pub const EXIF_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Full date-time reconstructed from a filename
///
/// Wall-clock time with no timezone attached; two runs on any machine
/// derive the same value for the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DerivedTimestamp(NaiveDateTime);

impl DerivedTimestamp {
    /// Wall-clock date-time
    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    /// Calendar day used for all date-granularity comparisons
    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// Value for the EXIF `DateTimeOriginal` field
    pub fn exif_string(&self) -> String {
        self.0.format(EXIF_FORMAT).to_string()
    }

    /// Absolute instant in the local timezone, see [`resolve_in`]
    pub fn to_local(&self) -> DateTime<Local> {
        resolve_in(&Local, self.0)
    }

    /// Filesystem timestamp for `filetime`
    pub fn to_file_time(&self) -> FileTime {
        FileTime::from_unix_time(self.to_local().timestamp(), 0)
    }
}

impl fmt::Display for DerivedTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Longest clock jump stepped over when resolving a local reading
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// Turn a wall-clock reading into an instant of `tz`
///
/// Ambiguous readings (DST fall-back) take the earlier instant. Readings
/// that do not exist (DST spring-forward gap) all resolve to the first
/// instant after the gap: they stay on their calendar day and a later
/// reading of the day never resolves to an earlier instant.
pub fn resolve_in<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    if let Some(instant) = tz.from_local_datetime(&naive).earliest() {
        return instant;
    }

    // Clock jumps happen on whole minutes
    let mut candidate = naive - TimeDelta::seconds(i64::from(naive.second()));
    for _ in 0..=MAX_GAP_MINUTES {
        if let Some(instant) = tz.from_local_datetime(&candidate).earliest() {
            return instant;
        }
        candidate += TimeDelta::minutes(1);
    }
    tz.from_utc_datetime(&naive)
}

/// Derive the target timestamp for a parsed filename
///
/// Midnight of the received day plus `sequence * SECONDS_PER_STEP`. The
/// clamped sequence keeps the result within the same day, and a larger
/// sequence never yields an earlier time.
pub fn derive_timestamp(parsed: &ParsedName) -> DerivedTimestamp {
    let midnight = parsed.date.and_time(chrono::NaiveTime::MIN);
    let offset = i64::from(parsed.sequence.min(MAX_SEQUENCE) * SECONDS_PER_STEP);
    DerivedTimestamp(midnight + TimeDelta::seconds(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Offset};
    use chrono_tz::America::{New_York, Santiago};

    fn derive(name: &str) -> DerivedTimestamp {
        derive_timestamp(&parse_whatsapp_name(name).unwrap())
    }

    #[test]
    fn test_step_is_eight_seconds() {
        assert_eq!(SECONDS_PER_STEP, 8);
    }

    #[test]
    fn test_time_of_day_matches_sequence() {
        for seq in [0u32, 1, 18, 450, 5000, 9998, 9999] {
            let ts = derive(&format!("IMG-20201018-WA{seq:04}.jpg"));
            assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2020, 10, 18).unwrap());
            assert_eq!(ts.datetime().num_seconds_from_midnight(), seq * 8);
        }
    }

    #[test]
    fn test_monotonic_within_day() {
        let mut previous = derive("IMG-20201018-WA0000.jpg");
        for seq in 1..=MAX_SEQUENCE {
            let current = derive(&format!("VID-20201018-WA{seq:04}.mp4"));
            assert!(current > previous, "sequence {seq} went backwards");
            assert_eq!(current.date(), previous.date());
            previous = current;
        }
    }

    #[test]
    fn test_clamped_sequence_matches_max() {
        assert_eq!(
            derive("IMG-20201018-WA12345.jpg"),
            derive("IMG-20201018-WA9999.jpg")
        );
        assert_eq!(derive("IMG-20201018-WA9999.jpg").to_string(), "2020-10-18 22:13:12");
    }

    #[test]
    fn test_exif_string() {
        assert_eq!(derive("IMG-20201018-WA0000.jpg").exif_string(), "2020:10:18 00:00:00");
        assert_eq!(derive("IMG-20201018-WA0018.jpg").exif_string(), "2020:10:18 00:02:24");
    }

    #[test]
    fn test_spring_forward_gap_stays_on_day() {
        // New York skips 02:00-03:00 on 2020-03-08
        let ts = derive("VID-20200308-WA1000.mp4");
        assert_eq!(ts.to_string(), "2020-03-08 02:13:20");

        let resolved = resolve_in(&New_York, ts.datetime());
        assert_eq!(resolved.date_naive(), ts.date());
        assert_eq!(resolved.naive_local().to_string(), "2020-03-08 03:00:00");

        // The whole gap collapses onto its end
        let last = resolve_in(&New_York, derive("VID-20200308-WA1349.mp4").datetime());
        assert_eq!(last, resolved);
        let after = resolve_in(&New_York, derive("VID-20200308-WA1351.mp4").datetime());
        assert!(after > resolved);
    }

    #[test]
    fn test_gap_at_midnight() {
        // Santiago skips 00:00-01:00 on 2020-09-06
        let ts = derive("IMG-20200906-WA0000.jpg");
        let resolved = resolve_in(&Santiago, ts.datetime());
        assert_eq!(resolved.date_naive(), ts.date());
        assert_eq!(resolved.naive_local().to_string(), "2020-09-06 01:00:00");
    }

    #[test]
    fn test_fall_back_takes_earlier_instant() {
        // 01:00-02:00 happens twice in New York on 2020-11-01
        let ts = derive("IMG-20201101-WA0675.jpg");
        assert_eq!(ts.to_string(), "2020-11-01 01:30:00");

        let resolved = resolve_in(&New_York, ts.datetime());
        assert_eq!(resolved.naive_local(), ts.datetime());
        assert_eq!(resolved.offset().fix().local_minus_utc(), -4 * 3600);
    }

    #[test]
    fn test_every_sequence_lands_on_day_across_dst() {
        for (tz, day) in [
            (New_York, "20200308"),
            (New_York, "20201101"),
            (Santiago, "20200906"),
            (Santiago, "20200405"),
        ] {
            let mut previous = None;
            for seq in 0..=MAX_SEQUENCE {
                let ts = derive(&format!("VID-{day}-WA{seq:04}.mp4"));
                let resolved = resolve_in(&tz, ts.datetime());
                assert_eq!(resolved.date_naive(), ts.date(), "{tz} {ts}");
                if let Some(previous) = previous {
                    assert!(resolved >= previous, "{tz} {ts} went backwards");
                }
                previous = Some(resolved);
            }
        }
    }

    #[test]
    fn test_local_days_with_clock_changes() {
        let mut day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        while day.year() == 2020 {
            let start = resolve_in(&Local, day.and_time(chrono::NaiveTime::MIN));
            let end = resolve_in(&Local, day.and_hms_opt(23, 59, 59).unwrap());
            if start.offset().fix() != end.offset().fix() {
                for seq in 0..=MAX_SEQUENCE {
                    let name = format!("IMG-{}-WA{seq:04}.jpg", day.format("%Y%m%d"));
                    let ts = derive(&name);
                    assert_eq!(ts.to_local().date_naive(), day, "{name}");
                }
            }
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_local_instant_keeps_wall_clock() {
        let ts = derive("IMG-20201018-WA5400.jpg");
        assert_eq!(ts.to_string(), "2020-10-18 12:00:00");
        assert_eq!(ts.to_local().naive_local(), ts.datetime());
        assert_eq!(ts.to_file_time().unix_seconds(), ts.to_local().timestamp());
    }
}
