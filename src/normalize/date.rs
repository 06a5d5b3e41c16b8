//! Archive date parsing
//!
//! The historical archives disagree on date encoding: the protected
//! archive mixes ISO-like, dot-separated day-first and slash-separated
//! day-first strings, while the secondary archive prints localized month
//! names that frequently arrive mojibake'd (Windows-1254 bytes shown as
//! Latin-1). Timestamps are stamped at provider-local noon, which keeps
//! the conversion unambiguous across DST transitions.

use crate::error::{AppError, Result};
use chrono::{NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Europe::Istanbul;

/// Parse a date string in any of the protected archive's encodings.
pub fn parse_archive_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    // Some rows carry a time component; the date part is all we keep.
    let date_part = trimmed.split_whitespace().next().unwrap_or(trimmed);

    for format in ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return Ok(date);
        }
    }

    Err(AppError::Parse(format!("unparseable archive date '{}'", raw)))
}

/// Parse a "day month-name year" date with localized (Turkish) month names.
///
/// Tolerates mojibake variants of the non-ASCII letters and two-digit
/// years ("07 Aðustos 25").
pub fn parse_month_name_date(raw: &str) -> Result<NaiveDate> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(AppError::Parse(format!("unparseable date '{}'", raw)));
    }

    let day: u32 = parts[0]
        .trim_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .map_err(|_| AppError::Parse(format!("bad day in '{}'", raw)))?;

    let month = month_index(parts[1])
        .ok_or_else(|| AppError::Parse(format!("unknown month in '{}'", raw)))?;

    let mut year: i32 = parts[2]
        .trim_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .map_err(|_| AppError::Parse(format!("bad year in '{}'", raw)))?;
    if year < 100 {
        year += 2000;
    }

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| AppError::Parse(format!("invalid calendar date '{}'", raw)))
}

/// Unix timestamp for a daily archive row (provider-local noon).
pub fn date_to_ts(date: NaiveDate) -> i64 {
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
    Istanbul
        .from_local_datetime(&date.and_time(noon))
        .earliest()
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| date.and_time(noon).and_utc().timestamp())
}

/// Month-name lookup with mojibake folding.
fn month_index(name: &str) -> Option<u32> {
    // Fold the Windows-1254-as-Latin-1 byte confusions back to Turkish
    // letters, then drop diacritics entirely for matching.
    let folded: String = name
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'þ' | 'ş' => 's',
            'ð' | 'ğ' => 'g',
            'ý' | 'ı' | 'i' => 'i',
            'ü' => 'u',
            'ö' => 'o',
            'ç' => 'c',
            other => other,
        })
        .collect();

    const MONTHS: [&str; 12] = [
        "ocak", "subat", "mart", "nisan", "mayis", "haziran", "temmuz", "agustos", "eylul",
        "ekim", "kasim", "aralik",
    ];

    MONTHS
        .iter()
        .position(|m| folded.starts_with(m))
        .map(|i| i as u32 + 1)
}
