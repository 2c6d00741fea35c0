//! Prediction request and response data structures

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PredictionError;
use crate::types::event::{EventRecord, Season};

/// A normalized prediction request.
///
/// Build it from untrusted JSON with [`PredictionRequest::from_value`], which
/// accepts field names in any case and never fills in optional values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub event_type: String,
    pub state: String,
    pub month: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<Season>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin_lon: Option<f64>,
}

/// Lower-case every key. Two keys that collapse to the same name are
/// rejected rather than silently picking one.
fn normalize_keys(object: &Map<String, Value>) -> Result<Map<String, Value>, PredictionError> {
    let mut normalized = Map::with_capacity(object.len());
    for (key, value) in object {
        let name = key.trim().to_ascii_lowercase();
        if normalized.insert(name.clone(), value.clone()).is_some() {
            return Err(PredictionError::invalid(
                name,
                "field given more than once with different casing",
            ));
        }
    }
    Ok(normalized)
}

/// Absent, null and blank strings are all "missing".
fn present<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    match fields.get(name) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
    }
}

fn optional_str(fields: &Map<String, Value>, name: &str) -> Result<Option<String>, PredictionError> {
    match present(fields, name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => Err(PredictionError::invalid(
            name,
            format!("expected a string, got {other}"),
        )),
    }
}

fn required_str(fields: &Map<String, Value>, name: &str) -> Result<String, PredictionError> {
    optional_str(fields, name)?.ok_or_else(|| PredictionError::invalid(name, "is required"))
}

/// Numbers may arrive as JSON numbers or numeric strings (form posts).
fn optional_f64(fields: &Map<String, Value>, name: &str) -> Result<Option<f64>, PredictionError> {
    let value = match present(fields, name) {
        None => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match value {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(PredictionError::invalid(
            name,
            format!("expected a number, got {}", fields[name]),
        )),
    }
}

fn required_month(fields: &Map<String, Value>) -> Result<u8, PredictionError> {
    let value = optional_f64(fields, "month")?
        .ok_or_else(|| PredictionError::invalid("month", "is required"))?;
    if value.fract() != 0.0 || !(1.0..=12.0).contains(&value) {
        return Err(PredictionError::invalid(
            "month",
            format!("expected an integer in 1..=12, got {value}"),
        ));
    }
    Ok(value as u8)
}

impl PredictionRequest {
    pub fn new(event_type: impl Into<String>, state: impl Into<String>, month: u8) -> Self {
        Self {
            event_type: event_type.into(),
            state: state.into(),
            month,
            season: None,
            magnitude: None,
            magnitude_type: None,
            begin_lat: None,
            begin_lon: None,
        }
    }

    /// Normalize an untrusted JSON payload.
    pub fn from_value(payload: &Value) -> Result<Self, PredictionError> {
        let object = payload
            .as_object()
            .ok_or_else(|| PredictionError::invalid("body", "expected a JSON object"))?;
        let fields = normalize_keys(object)?;

        let season = optional_str(&fields, "season")?
            .map(|s| s.parse::<Season>())
            .transpose()
            .map_err(|reason| PredictionError::invalid("season", reason))?;

        let request = Self {
            event_type: required_str(&fields, "event_type")?,
            state: required_str(&fields, "state")?,
            month: required_month(&fields)?,
            season,
            magnitude: optional_f64(&fields, "magnitude")?,
            magnitude_type: optional_str(&fields, "magnitude_type")?,
            begin_lat: optional_f64(&fields, "begin_lat")?,
            begin_lon: optional_f64(&fields, "begin_lon")?,
        };

        request.to_record()?;
        Ok(request)
    }

    /// Convert to the record the transformer consumes. An absent season is
    /// derived from the month; a present one must agree with it.
    pub fn to_record(&self) -> Result<EventRecord, PredictionError> {
        let record = EventRecord {
            event_type: Some(self.event_type.clone()),
            state: Some(self.state.clone()),
            month: Some(self.month),
            season: self.season.or_else(|| Season::from_month(self.month)),
            magnitude: self.magnitude,
            magnitude_type: self.magnitude_type.clone(),
            begin_lat: self.begin_lat,
            begin_lon: self.begin_lon,
        };
        record
            .validate()
            .map_err(|reason| PredictionError::invalid("season", reason))?;
        Ok(record)
    }
}

/// Post-processed damage figures: non-negative, total is the sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageEstimate {
    pub property_damage: f64,
    pub crop_damage: f64,
    pub total_damage: f64,
}

impl DamageEstimate {
    /// Clamp each component at zero; a missing crop component is 0.0.
    pub fn from_components(property: f64, crop: Option<f64>) -> Self {
        let property_damage = property.max(0.0);
        let crop_damage = crop.unwrap_or(0.0).max(0.0);
        Self {
            property_damage,
            crop_damage,
            total_damage: property_damage + crop_damage,
        }
    }
}

/// Response body. The numeric fields are always present; `error` is set
/// exactly when the figures are a fallback rather than an estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub property_damage: f64,
    pub crop_damage: f64,
    pub total_damage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResult {
    /// Zeroed result carrying the failure message.
    pub fn fallback(err: &PredictionError) -> Self {
        Self {
            property_damage: 0.0,
            crop_damage: 0.0,
            total_damage: 0.0,
            error: Some(err.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<DamageEstimate> for PredictionResult {
    fn from(estimate: DamageEstimate) -> Self {
        Self {
            property_damage: estimate.property_damage,
            crop_damage: estimate.crop_damage,
            total_damage: estimate.total_damage,
            error: None,
        }
    }
}

impl From<Result<DamageEstimate, PredictionError>> for PredictionResult {
    fn from(result: Result<DamageEstimate, PredictionError>) -> Self {
        match result {
            Ok(estimate) => estimate.into(),
            Err(err) => Self::fallback(&err),
        }
    }
}

/// Severity banner shown by clients for a total damage figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageSeverity {
    Low,
    Moderate,
    High,
    Critical,
}

impl DamageSeverity {
    /// Classify a total; each threshold must be strictly exceeded.
    pub fn from_total(total: f64, thresholds: &SeverityThresholds) -> Self {
        if total > thresholds.critical {
            DamageSeverity::Critical
        } else if total > thresholds.high {
            DamageSeverity::High
        } else if total > thresholds.moderate {
            DamageSeverity::Moderate
        } else {
            DamageSeverity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DamageSeverity::Low => "low",
            DamageSeverity::Moderate => "moderate",
            DamageSeverity::High => "high",
            DamageSeverity::Critical => "critical",
        }
    }
}

/// Dollar thresholds for the severity banner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub moderate: f64,
    pub high: f64,
    pub critical: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            moderate: 10_000.0,
            high: 100_000.0,
            critical: 1_000_000.0,
        }
    }
}
