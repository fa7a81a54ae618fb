//! Date and timestamp formatting shared by the compositor and annotator.

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, WaiverError};

/// Epoch values below this are seconds, everything else milliseconds.
const EPOCH_SECONDS_CUTOFF: f64 = 100_000_000_000.0;

/// "5 March 2025": unpadded day, full English month name, four-digit year.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

/// Same calendar day one year later; 29 February maps to 28 February.
pub fn one_year_after(date: NaiveDate) -> NaiveDate {
    date.checked_add_months(Months::new(12))
        .unwrap_or(date)
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| WaiverError::DateError(s.to_string()))
}

/// Formats a template's effective date, passing opaque values through.
pub fn format_effective_date(raw: &str) -> String {
    match parse_date(raw) {
        Ok(date) => format_date(date),
        Err(_) => raw.to_string(),
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// A capture timestamp as it arrives from the form layer: epoch seconds,
/// epoch milliseconds, a numeric string, or an ISO 8601 string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Epoch(f64),
    Text(String),
}

impl RawTimestamp {
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Epoch(value) => from_epoch(*value),
            RawTimestamp::Text(text) => {
                let text = text.trim();
                if let Ok(value) = text.parse::<f64>() {
                    return from_epoch(value);
                }
                if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                    return Some(parsed.with_timezone(&Utc));
                }
                parse_date(text)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|naive| Utc.from_utc_datetime(&naive))
            }
        }
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        RawTimestamp::Epoch(value.timestamp_millis() as f64)
    }
}

fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value < EPOCH_SECONDS_CUTOFF {
        value * 1000.0
    } else {
        value
    };
    DateTime::from_timestamp_millis(millis as i64)
}

/// The zone signature timestamps and header dates are shown in.
///
/// Timestamps read `YYYY-MM-DD HH:MM:SS <IANA zone>`, in the renderer's
/// zone rather than UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayZone {
    zone: Tz,
}

impl DisplayZone {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    /// Zone from an IANA name such as "America/Vancouver".
    pub fn from_name(name: &str) -> Result<Self> {
        name.trim()
            .parse::<Tz>()
            .map(Self::new)
            .map_err(|_| WaiverError::DateError(format!("unknown time zone {}", name)))
    }

    /// The host's zone, or UTC when it cannot be determined.
    pub fn local() -> Self {
        match iana_time_zone::get_timezone() {
            Ok(name) => Self::from_name(&name).unwrap_or_else(|_| {
                warn!(zone = %name, "unrecognised local time zone, using UTC");
                Self::new(Tz::UTC)
            }),
            Err(e) => {
                warn!(error = %e, "could not determine local time zone, using UTC");
                Self::new(Tz::UTC)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.zone.name()
    }

    pub fn format_timestamp(&self, instant: Option<DateTime<Utc>>) -> String {
        match instant {
            Some(instant) => format!(
                "{} {}",
                instant.with_timezone(&self.zone).format("%Y-%m-%d %H:%M:%S"),
                self.zone.name()
            ),
            None => "N/A".to_string(),
        }
    }

    /// Calendar date of `instant` in this zone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.zone).date_naive()
    }

    pub fn year_of(&self, instant: DateTime<Utc>) -> i32 {
        self.local_date(instant).year()
    }
}

impl Default for DisplayZone {
    fn default() -> Self {
        Self::local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn formats_day_month_year() {
        assert_eq!(format_date(ymd(2024, 5, 1)), "1 May 2024");
        assert_eq!(format_date(ymd(2025, 3, 5)), "5 March 2025");
        assert_eq!(format_date(ymd(1999, 12, 31)), "31 December 1999");
    }

    #[test]
    fn one_year_after_handles_leap_day() {
        assert_eq!(one_year_after(ymd(2024, 2, 29)), ymd(2025, 2, 28));
        assert_eq!(one_year_after(ymd(2025, 3, 5)), ymd(2026, 3, 5));
    }

    #[test]
    fn effective_date_passes_through_opaque_values() {
        assert_eq!(format_effective_date("2024-05-28"), "28 May 2024");
        assert_eq!(format_effective_date("spring edition"), "spring edition");
    }

    #[test]
    fn timestamp_in_named_zone() {
        let zone = DisplayZone::from_name("America/Vancouver").unwrap();
        let instant = Utc.with_ymd_and_hms(2025, 3, 5, 20, 4, 9).unwrap();
        assert_eq!(
            zone.format_timestamp(Some(instant)),
            "2025-03-05 12:04:09 America/Vancouver"
        );
        assert_eq!(zone.format_timestamp(None), "N/A");
    }

    #[test]
    fn unknown_zone_is_rejected() {
        assert!(DisplayZone::from_name("Mars/Olympus_Mons").is_err());
    }

    #[test]
    fn epoch_seconds_and_millis_agree() {
        let secs = RawTimestamp::Epoch(1_741_204_800.0).to_utc();
        let millis = RawTimestamp::Epoch(1_741_204_800_000.0).to_utc();
        assert!(secs.is_some());
        assert_eq!(secs, millis);
        assert_eq!(RawTimestamp::Text("1741204800".into()).to_utc(), secs);
    }

    #[test]
    fn iso_strings_parse() {
        let ts = RawTimestamp::Text("2025-03-05T20:04:09Z".into()).to_utc().unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 3, 5, 20, 4, 9).unwrap());
        assert!(RawTimestamp::Text("yesterday".into()).to_utc().is_none());
    }

    #[test]
    fn local_date_follows_zone() {
        let zone = DisplayZone::from_name("Pacific/Auckland").unwrap();
        let instant = Utc.with_ymd_and_hms(2025, 3, 5, 20, 0, 0).unwrap();
        assert_eq!(zone.local_date(instant), ymd(2025, 3, 6));
    }
}
