//! Calendar features derived from an event's begin timestamp.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::types::event::Season;

/// Year, month and season of a timestamp. All `None` when it does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TemporalFeatures {
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub season: Option<Season>,
}

/// Date-time layouts seen in StormEvents exports and hand-made CSVs.
const DATETIME_FORMATS: &[&str] = &[
    "%d-%b-%y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%y"];

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Derive calendar features. Unparseable input yields missing values rather
/// than an error so the transformer's imputation applies.
pub fn derive(timestamp: &str) -> TemporalFeatures {
    match parse_timestamp(timestamp) {
        Some(dt) => {
            let month = dt.month() as u8;
            TemporalFeatures {
                year: Some(dt.year()),
                month: Some(month),
                season: Season::from_month(month),
            }
        }
        None => TemporalFeatures::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noaa_layout() {
        let f = derive("15-JUN-23 14:30:00");
        assert_eq!(f.year, Some(2023));
        assert_eq!(f.month, Some(6));
        assert_eq!(f.season, Some(Season::Jja));
    }

    #[test]
    fn test_iso_layouts() {
        assert_eq!(derive("2021-12-31 23:59:00").season, Some(Season::Djf));
        assert_eq!(derive("2021-01-02T08:00:00").month, Some(1));
        assert_eq!(derive("2021-04-01T08:00:00Z").season, Some(Season::Mam));
        assert_eq!(derive("2020-10-05").season, Some(Season::Son));
    }

    #[test]
    fn test_december_is_winter() {
        let f = derive("12/24/2022 18:00");
        assert_eq!(f.month, Some(12));
        assert_eq!(f.season, Some(Season::Djf));
    }

    #[test]
    fn test_unparseable_is_missing() {
        for raw in ["", "not a date", "2021-13-45 00:00:00"] {
            assert_eq!(derive(raw), TemporalFeatures::default());
        }
    }
}
