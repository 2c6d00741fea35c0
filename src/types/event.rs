//! Severe-weather event records as seen by the feature pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Meteorological season bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Season {
    Djf,
    Mam,
    Jja,
    Son,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Djf, Season::Mam, Season::Jja, Season::Son];

    /// Direct month lookup. December and January are both DJF.
    pub fn from_month(month: u8) -> Option<Self> {
        match month {
            12 | 1 | 2 => Some(Season::Djf),
            3..=5 => Some(Season::Mam),
            6..=8 => Some(Season::Jja),
            9..=11 => Some(Season::Son),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Djf => "DJF",
            Season::Mam => "MAM",
            Season::Jja => "JJA",
            Season::Son => "SON",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DJF" => Ok(Season::Djf),
            "MAM" => Ok(Season::Mam),
            "JJA" => Ok(Season::Jja),
            "SON" => Ok(Season::Son),
            other => Err(format!("unknown season `{other}` (expected DJF, MAM, JJA or SON)")),
        }
    }
}

/// One event, either a training row or a normalized prediction request.
///
/// Every field is optional because the fitted transformer imputes any missing
/// value. Requests always carry `event_type`, `state` and `month`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_type: Option<String>,
    pub state: Option<String>,
    pub month: Option<u8>,
    pub season: Option<Season>,
    pub magnitude: Option<f64>,
    pub magnitude_type: Option<String>,
    pub begin_lat: Option<f64>,
    pub begin_lon: Option<f64>,
}

impl EventRecord {
    /// Create a record with the fields a prediction request always carries.
    /// The season is derived from the month.
    pub fn new(event_type: impl Into<String>, state: impl Into<String>, month: u8) -> Self {
        Self {
            event_type: Some(event_type.into()),
            state: Some(state.into()),
            month: Some(month),
            season: Season::from_month(month),
            ..Default::default()
        }
    }

    pub fn with_magnitude(mut self, magnitude: f64, magnitude_type: Option<&str>) -> Self {
        self.magnitude = Some(magnitude);
        self.magnitude_type = magnitude_type.map(str::to_string);
        self
    }

    pub fn with_location(mut self, lat: f64, lon: f64) -> Self {
        self.begin_lat = Some(lat);
        self.begin_lon = Some(lon);
        self
    }

    /// Check the month range and month/season agreement.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(month) = self.month {
            let derived = Season::from_month(month)
                .ok_or_else(|| format!("month {month} is outside 1..=12"))?;
            if let Some(season) = self.season {
                if season != derived {
                    return Err(format!(
                        "season {season} does not match month {month} (expected {derived})"
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_month_has_a_season() {
        for m in 1..=12u8 {
            assert!(Season::ALL.contains(&Season::from_month(m).unwrap()));
        }
        assert_eq!(Season::from_month(0), None);
        assert_eq!(Season::from_month(13), None);
    }

    #[test]
    fn test_winter_wraps_the_year() {
        assert_eq!(Season::from_month(12), Some(Season::Djf));
        assert_eq!(Season::from_month(1), Some(Season::Djf));
        assert_eq!(Season::from_month(2), Some(Season::Djf));
        assert_eq!(Season::from_month(3), Some(Season::Mam));
        assert_eq!(Season::from_month(8), Some(Season::Jja));
        assert_eq!(Season::from_month(11), Some(Season::Son));
    }

    #[test]
    fn test_season_parse_and_serde() {
        assert_eq!("jja".parse::<Season>().unwrap(), Season::Jja);
        assert!("summer".parse::<Season>().is_err());
        assert_eq!(serde_json::to_string(&Season::Son).unwrap(), "\"SON\"");
    }

    #[test]
    fn test_validate_rejects_mismatched_season() {
        let mut record = EventRecord::new("Hail", "TEXAS", 6);
        assert!(record.validate().is_ok());

        record.season = Some(Season::Djf);
        assert!(record.validate().is_err());

        record.season = None;
        record.month = Some(13);
        assert!(record.validate().is_err());
    }
}
