//! Timestamp recovery from backup filenames.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Markers of incomplete backups in the final path component.
const PARTIAL_MARKERS: [&str; 3] = [".part", ".tmp", ".temp"];

/// `YYYYMMDDhhmm` with an optional single separator before the time,
/// e.g. `20240315-0130` or `20240315T0130`.
/// ASCII digits only; `\d` would also match digits `parse` rejects.
static DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[^0-9])([0-9]{4})([0-9]{2})([0-9]{2})[^0-9]?([0-9]{2})([0-9]{2})(?:[^0-9]|$)",
    )
    .expect("date-time pattern is valid")
});

/// `YYYYMMDD`, taken at noon.
static DATE_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^0-9])([0-9]{4})([0-9]{2})([0-9]{2})(?:[^0-9]|$)")
        .expect("date pattern is valid")
});

/// Resolves a backup filename to the moment the backup was taken.
pub trait DateExtractor {
    /// `None` means the name is not a (complete) backup.
    fn extract(&self, name: &str) -> Option<NaiveDateTime>;
}

impl<F> DateExtractor for F
where
    F: Fn(&str) -> Option<NaiveDateTime>,
{
    fn extract(&self, name: &str) -> Option<NaiveDateTime> {
        self(name)
    }
}

/// Default extractor looking for digit timestamps in the basename.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameDateExtractor;

impl DateExtractor for FilenameDateExtractor {
    fn extract(&self, name: &str) -> Option<NaiveDateTime> {
        let basename = name.rsplit('/').next().unwrap_or(name);

        if PARTIAL_MARKERS.iter().any(|m| basename.contains(m)) {
            log::debug!("Skipping incomplete backup: {name}");
            return None;
        }

        DATE_TIME
            .captures(basename)
            .and_then(|caps| {
                let hour = field(&caps, 4)?;
                let minute = field(&caps, 5)?;
                date(&caps)?.and_hms_opt(hour, minute, 0)
            })
            .or_else(|| {
                DATE_ONLY
                    .captures(basename)
                    .and_then(|caps| date(&caps)?.and_hms_opt(12, 0, 0))
            })
    }
}

fn field(caps: &Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

fn date(caps: &Captures<'_>) -> Option<NaiveDate> {
    let year = caps.get(1)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, field(caps, 2)?, field(caps, 3)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(name: &str) -> Option<NaiveDateTime> {
        FilenameDateExtractor.extract(name)
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(h, min, 0))
    }

    #[test]
    fn test_date_and_time() {
        assert_eq!(extract("backup-20240315-0130.tar"), at(2024, 3, 15, 1, 30));
        assert_eq!(extract("db_20240315T2359.sql.gz"), at(2024, 3, 15, 23, 59));
        assert_eq!(extract("202403150130"), at(2024, 3, 15, 1, 30));
    }

    #[test]
    fn test_date_only_is_noon() {
        assert_eq!(extract("home-20240315.tar.zst"), at(2024, 3, 15, 12, 0));
        assert_eq!(extract("20231231"), at(2023, 12, 31, 12, 0));
    }

    #[test]
    fn test_digits_must_not_touch_other_digits() {
        assert_eq!(extract("backup-2024031501300.tar"), None);
        assert_eq!(extract("v1-202403151.tar"), None);
        // the 12-digit run is rejected, the trailing date still counts
        assert_eq!(extract("x1202403150130-20240101"), at(2024, 1, 1, 12, 0));
    }

    #[test]
    fn test_non_ascii_digits_do_not_hide_dates() {
        // Arabic-Indic and fullwidth digit runs
        assert_eq!(
            extract("\u{662}\u{660}\u{662}\u{664}\u{660}\u{661}\u{660}\u{661}-20240315.tar"),
            at(2024, 3, 15, 12, 0)
        );
        let fullwidth = "\u{ff12}\u{ff10}\u{ff12}\u{ff14}\u{ff10}\u{ff13}\u{ff11}\u{ff15}";
        assert_eq!(extract(&format!("{fullwidth}-20240315")), at(2024, 3, 15, 12, 0));
        assert_eq!(extract(fullwidth), None);
    }

    #[test]
    fn test_partial_backups_are_ignored() {
        assert_eq!(extract("backup-20240315-0000.tar.part"), None);
        assert_eq!(extract("backup-20240315.tmp"), None);
        assert_eq!(extract("backup-20240315.temp.gz"), None);
    }

    #[test]
    fn test_only_basename_is_inspected() {
        assert_eq!(extract("/srv/20200101/backup.tar"), None);
        assert_eq!(extract("/srv/dir.tmp/backup-20240315.tar"), at(2024, 3, 15, 12, 0));
        assert_eq!(extract("20240101.part/backup-20240315.tar"), at(2024, 3, 15, 12, 0));
    }

    #[test]
    fn test_invalid_calendar_values() {
        assert_eq!(extract("backup-20241332.tar"), None);
        assert_eq!(extract("backup-20240315-2575.tar"), at(2024, 3, 15, 12, 0));
    }

    #[test]
    fn test_no_timestamp() {
        assert_eq!(extract("readme.txt"), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn test_closure_extractor() {
        let fixed = |name: &str| name.starts_with("keep").then(|| at(2024, 1, 1, 0, 0)).flatten();
        assert_eq!(fixed.extract("keep-me"), at(2024, 1, 1, 0, 0));
        assert_eq!(fixed.extract("other"), None);
    }
}
