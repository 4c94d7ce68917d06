//! Typed rows built from raw upstream records.
//!
//! Each Seoul Open API row arrives as a loose JSON object ([`Record`]). A row
//! type implements [`FromRecord`] to decode and validate one object; a record
//! that fails either step is reported as a [`RecordError`] and skipped by the
//! collector rather than aborting the batch.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One raw row fetched from an upstream source, keyed by column name.
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record is not a valid {kind}: {source}")]
    Shape {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Conversion from a raw [`Record`] into a validated row.
pub trait FromRecord: Sized {
    /// Human-readable row kind used in error messages, e.g. `"pet registration"`.
    const KIND: &'static str;

    /// Decodes and validates one record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Shape`] when required fields are missing or have
    /// the wrong type, and [`RecordError::Invalid`] when a decoded value breaks
    /// a domain constraint.
    fn from_record(record: &Record) -> Result<Self, RecordError>;
}

fn decode<T: DeserializeOwned>(kind: &'static str, record: &Record) -> Result<T, RecordError> {
    serde_json::from_value(serde_json::Value::Object(record.clone()))
        .map_err(|source| RecordError::Shape { kind, source })
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), RecordError> {
    if value.trim().is_empty() {
        return Err(RecordError::Invalid {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn require_non_negative(field: &'static str, value: i32) -> Result<(), RecordError> {
    if value < 0 {
        return Err(RecordError::Invalid {
            field,
            reason: format!("must be >= 0, got {value}"),
        });
    }
    Ok(())
}

fn require_within(
    field: &'static str,
    value: Option<f64>,
    min: f64,
    max: f64,
) -> Result<(), RecordError> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(RecordError::Invalid {
            field,
            reason: format!("{v} is outside {min}..={max}"),
        }),
        _ => Ok(()),
    }
}

fn percentage(part: i32, total: i32) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let ratio = f64::from(part) / f64::from(total) * 100.0;
    (ratio * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Pet registrations
// ---------------------------------------------------------------------------

/// Registered dog and cat totals for one administrative region.
///
/// `(sido, sigungu)` is unique in `pet_registrations`; a missing `sigungu`
/// stands for the province-level aggregate row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetRegistration {
    pub sido: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub sigungu: Option<String>,
    #[serde(deserialize_with = "lenient::count")]
    pub dog_registration_total: i32,
    #[serde(deserialize_with = "lenient::count")]
    pub cat_registration_total: i32,
    #[serde(deserialize_with = "lenient::count")]
    pub total_registration: i32,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub data_year: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub data_month: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub update_date: Option<String>,
}

impl PetRegistration {
    /// `"sido sigungu"`, or just `sido` for province-level rows.
    #[must_use]
    pub fn full_address(&self) -> String {
        full_address(&self.sido, self.sigungu.as_deref())
    }

    #[must_use]
    pub fn dog_percentage(&self) -> f64 {
        percentage(self.dog_registration_total, self.total_registration)
    }

    #[must_use]
    pub fn cat_percentage(&self) -> f64 {
        percentage(self.cat_registration_total, self.total_registration)
    }

    /// Checks the non-negativity and non-empty-region constraints.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), RecordError> {
        require_non_empty("sido", &self.sido)?;
        require_non_negative("dog_registration_total", self.dog_registration_total)?;
        require_non_negative("cat_registration_total", self.cat_registration_total)?;
        require_non_negative("total_registration", self.total_registration)?;
        Ok(())
    }
}

impl FromRecord for PetRegistration {
    const KIND: &'static str = "pet registration";

    fn from_record(record: &Record) -> Result<Self, RecordError> {
        let row: Self = decode(Self::KIND, record)?;
        row.validate()?;
        Ok(row)
    }
}

/// Joins a region and optional sub-region the way addresses are displayed.
#[must_use]
pub fn full_address(sido: &str, sigungu: Option<&str>) -> String {
    match sigungu {
        Some(s) if !s.is_empty() => format!("{sido} {s}"),
        _ => sido.to_string(),
    }
}

/// Percentage helpers shared with read models that only hold raw counts.
#[must_use]
pub fn registration_percentages(dogs: i32, cats: i32, total: i32) -> (f64, f64) {
    (percentage(dogs, total), percentage(cats, total))
}

// ---------------------------------------------------------------------------
// Pet clinics
// ---------------------------------------------------------------------------

/// A licensed animal hospital, keyed by its municipal management number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetClinic {
    pub mgt_no: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub business_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub road_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub lot_address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub license_date: Option<String>,
}

impl FromRecord for PetClinic {
    const KIND: &'static str = "pet clinic";

    fn from_record(record: &Record) -> Result<Self, RecordError> {
        let row: Self = decode(Self::KIND, record)?;
        require_non_empty("mgt_no", &row.mgt_no)?;
        require_non_empty("name", &row.name)?;
        require_within("latitude", row.latitude, -90.0, 90.0)?;
        require_within("longitude", row.longitude, -180.0, 180.0)?;
        Ok(row)
    }
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

/// One hourly reading from a city weather station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub station_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub observed_at: String,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub precipitation: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub wind_speed: Option<f64>,
}

impl FromRecord for WeatherObservation {
    const KIND: &'static str = "weather observation";

    fn from_record(record: &Record) -> Result<Self, RecordError> {
        let row: Self = decode(Self::KIND, record)?;
        require_non_empty("station_name", &row.station_name)?;
        require_non_empty("observed_at", &row.observed_at)?;
        require_within("humidity", row.humidity, 0.0, 100.0)?;
        if row.precipitation.is_some_and(|p| p < 0.0) {
            return Err(RecordError::Invalid {
                field: "precipitation",
                reason: "must be >= 0".to_string(),
            });
        }
        Ok(row)
    }
}

/// Deserializers for the loosely typed values open-data feeds return:
/// numbers as strings, thousands separators, and blank strings for nulls.
mod lenient {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn blank_to_none(value: Value) -> Option<Value> {
        match value {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            other => Some(other),
        }
    }

    pub(super) fn string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
        match Value::deserialize(de)? {
            Value::String(s) => Ok(s.trim().to_string()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(D::Error::custom(format!("expected string, got {other}"))),
        }
    }

    pub(super) fn opt_string<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<String>, D::Error> {
        match blank_to_none(Value::deserialize(de)?) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(D::Error::custom(format!("expected string, got {other}"))),
        }
    }

    pub(super) fn count<'de, D: Deserializer<'de>>(de: D) -> Result<i32, D::Error> {
        match Value::deserialize(de)? {
            Value::Number(n) => n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| D::Error::custom(format!("count out of range: {n}"))),
            Value::String(s) => s
                .trim()
                .replace(',', "")
                .parse::<i32>()
                .map_err(|e| D::Error::custom(format!("invalid count '{s}': {e}"))),
            other => Err(D::Error::custom(format!("expected count, got {other}"))),
        }
    }

    pub(super) fn opt_f64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
        match blank_to_none(Value::deserialize(de)?) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) => s
                .trim()
                .replace(',', "")
                .parse::<f64>()
                .map(Some)
                .map_err(|e| D::Error::custom(format!("invalid number '{s}': {e}"))),
            Some(other) => Err(D::Error::custom(format!("expected number, got {other}"))),
        }
    }
}

#[cfg(test)]
#[path = "records_test.rs"]
mod tests;
