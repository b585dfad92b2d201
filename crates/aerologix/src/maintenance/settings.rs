//! Maintenance settings as served by the backend.
//!
//! Field names match the backend's JSON exactly. Every value is optional and
//! read leniently: numbers may arrive as JSON numbers or numeric strings, and
//! anything unreadable is treated as missing rather than rejected.

use std::path::Path;

use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

/// Read settings exported to a JSON file.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the file cannot be read, or
/// [`Error::Json`](crate::Error::Json) if it is not a settings object.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> crate::Result<T> {
    debug!("Reading settings from {}", path.display());
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Transport Canada reference values used when a setting is absent.
///
/// These are informational defaults, not an airworthiness determination.
pub mod regulations {
    /// Engine time between overhaul, hours.
    pub const ENGINE_DEFAULT_TBO_HOURS: f64 = 2000.0;
    /// Fixed-pitch propeller inspection ceiling, years.
    pub const PROPELLER_FIXED_MAX_YEARS: f64 = 5.0;
    /// Variable-pitch propeller interval when the manufacturer gives none, years.
    pub const PROPELLER_VARIABLE_FALLBACK_YEARS: f64 = 10.0;
    /// Avionics (pitot-static / transponder) certification, months.
    pub const AVIONICS_CERTIFICATION_MONTHS: f64 = 24.0;
    /// Magneto inspection, hours.
    pub const MAGNETOS_DEFAULT_HOURS: f64 = 500.0;
    /// Vacuum pump replacement, hours.
    pub const VACUUM_PUMP_DEFAULT_HOURS: f64 = 400.0;
    /// Annual airframe inspection, months.
    pub const ANNUAL_INSPECTION_MONTHS: f64 = 12.0;
    /// ELT functional test, months.
    pub const ELT_TEST_MONTHS: f64 = 12.0;
    /// ELT battery replacement, months.
    pub const ELT_BATTERY_MONTHS: f64 = 60.0;
}

/// Propeller pitch type. Selects the inspection interval policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropellerType {
    /// Fixed pitch or ground adjustable.
    #[default]
    Fixed,
    /// Variable pitch or constant speed.
    Variable,
}

impl<'de> Deserialize<'de> for PropellerType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value.as_str().map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("variable") => Self::Variable,
            Some(s) if s.eq_ignore_ascii_case("fixed") => Self::Fixed,
            _ => {
                if !value.is_null() {
                    warn!("Unknown propeller_type {value}, assuming fixed pitch");
                }
                Self::Fixed
            }
        })
    }
}

/// Component maintenance settings for one aircraft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentSettings {
    /// Engine model name.
    #[serde(deserialize_with = "lenient::string")]
    pub engine_model: Option<String>,
    /// Engine TBO in hours.
    #[serde(deserialize_with = "lenient::number")]
    pub engine_tbo_hours: Option<f64>,
    /// Hours since the last engine overhaul.
    #[serde(deserialize_with = "lenient::number")]
    pub engine_hours_since_overhaul: Option<f64>,
    /// Date of the last engine overhaul.
    #[serde(deserialize_with = "lenient::string")]
    pub engine_last_overhaul_date: Option<String>,

    /// Propeller pitch type.
    pub propeller_type: PropellerType,
    /// Propeller model name.
    #[serde(deserialize_with = "lenient::string")]
    pub propeller_model: Option<String>,
    /// Manufacturer inspection interval for variable-pitch propellers, years.
    #[serde(deserialize_with = "lenient::number")]
    pub propeller_manufacturer_interval_years: Option<f64>,
    /// Hours since the last propeller inspection.
    #[serde(deserialize_with = "lenient::number")]
    pub propeller_hours_since_inspection: Option<f64>,
    /// Date of the last propeller inspection.
    #[serde(deserialize_with = "lenient::string")]
    pub propeller_last_inspection_date: Option<String>,

    /// Date of the last avionics certification.
    #[serde(deserialize_with = "lenient::string")]
    pub avionics_last_certification_date: Option<String>,
    /// Avionics certification interval, months.
    #[serde(deserialize_with = "lenient::number")]
    pub avionics_certification_interval_months: Option<f64>,

    /// Magneto model name.
    #[serde(deserialize_with = "lenient::string")]
    pub magnetos_model: Option<String>,
    /// Magneto inspection interval, hours.
    #[serde(deserialize_with = "lenient::number")]
    pub magnetos_interval_hours: Option<f64>,
    /// Hours since the last magneto inspection.
    #[serde(deserialize_with = "lenient::number")]
    pub magnetos_hours_since_inspection: Option<f64>,
    /// Date of the last magneto inspection.
    #[serde(deserialize_with = "lenient::string")]
    pub magnetos_last_inspection_date: Option<String>,

    /// Vacuum pump model name.
    #[serde(deserialize_with = "lenient::string")]
    pub vacuum_pump_model: Option<String>,
    /// Vacuum pump replacement interval, hours.
    #[serde(deserialize_with = "lenient::number")]
    pub vacuum_pump_interval_hours: Option<f64>,
    /// Hours since the vacuum pump was replaced.
    #[serde(deserialize_with = "lenient::number")]
    pub vacuum_pump_hours_since_replacement: Option<f64>,
    /// Date the vacuum pump was replaced.
    #[serde(deserialize_with = "lenient::string")]
    pub vacuum_pump_last_replacement_date: Option<String>,

    /// Date of the last annual inspection.
    #[serde(deserialize_with = "lenient::string")]
    pub airframe_last_annual_date: Option<String>,
    /// Hours since the last annual inspection.
    #[serde(deserialize_with = "lenient::number")]
    pub airframe_hours_since_annual: Option<f64>,
}

impl ComponentSettings {
    /// Engine TBO, falling back to the regulation default.
    #[must_use]
    pub fn engine_tbo(&self) -> f64 {
        self.engine_tbo_hours
            .unwrap_or(regulations::ENGINE_DEFAULT_TBO_HOURS)
    }

    /// Propeller inspection interval in years.
    ///
    /// Fixed pitch always uses the five-year ceiling. Variable pitch uses the
    /// manufacturer interval, or ten years when none is declared.
    #[must_use]
    pub fn propeller_interval_years(&self) -> f64 {
        match self.propeller_type {
            PropellerType::Fixed => regulations::PROPELLER_FIXED_MAX_YEARS,
            PropellerType::Variable => self
                .propeller_manufacturer_interval_years
                .filter(|years| *years > 0.0)
                .unwrap_or(regulations::PROPELLER_VARIABLE_FALLBACK_YEARS),
        }
    }

    /// Avionics certification interval, falling back to 24 months.
    #[must_use]
    pub fn avionics_interval_months(&self) -> f64 {
        self.avionics_certification_interval_months
            .unwrap_or(regulations::AVIONICS_CERTIFICATION_MONTHS)
    }

    /// Magneto interval, falling back to 500 hours.
    #[must_use]
    pub fn magnetos_interval(&self) -> f64 {
        self.magnetos_interval_hours
            .unwrap_or(regulations::MAGNETOS_DEFAULT_HOURS)
    }

    /// Vacuum pump interval, falling back to 400 hours.
    #[must_use]
    pub fn vacuum_pump_interval(&self) -> f64 {
        self.vacuum_pump_interval_hours
            .unwrap_or(regulations::VACUUM_PUMP_DEFAULT_HOURS)
    }
}

/// Emergency locator transmitter service record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EltSettings {
    /// Date of the last functional test.
    #[serde(deserialize_with = "lenient::string")]
    pub last_test_date: Option<String>,
    /// Test interval, months.
    #[serde(deserialize_with = "lenient::number")]
    pub test_interval_months: Option<f64>,
    /// Date the current battery was installed.
    #[serde(deserialize_with = "lenient::string")]
    pub battery_install_date: Option<String>,
    /// Battery replacement interval, months.
    #[serde(deserialize_with = "lenient::number")]
    pub battery_interval_months: Option<f64>,
}

impl EltSettings {
    /// Test interval, falling back to 12 months.
    #[must_use]
    pub fn test_interval(&self) -> f64 {
        self.test_interval_months
            .unwrap_or(regulations::ELT_TEST_MONTHS)
    }

    /// Battery interval, falling back to 60 months.
    #[must_use]
    pub fn battery_interval(&self) -> f64 {
        self.battery_interval_months
            .unwrap_or(regulations::ELT_BATTERY_MONTHS)
    }
}

/// Parse a backend date.
///
/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (only the date part is
/// kept). Anything else is `None`.
#[must_use]
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            // `2024-03-01T00:00:00` without an offset, as Python's isoformat emits.
            raw.get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite()))
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_json(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "aerologix_settings_{}_{}.json",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_read_json_file() {
        let path = temp_json("ok", r#"{"engine_tbo_hours": "1800", "propeller_type": "variable"}"#);
        let settings: ComponentSettings = read_json_file(&path).unwrap();
        assert!((settings.engine_tbo() - 1800.0).abs() < f64::EPSILON);
        assert_eq!(settings.propeller_type, PropellerType::Variable);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_read_json_file_errors() {
        let missing = std::env::temp_dir().join("aerologix_settings_missing.json");
        let err = read_json_file::<EltSettings>(&missing).unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));

        let path = temp_json("bad", "not json");
        let err = read_json_file::<ComponentSettings>(&path).unwrap_err();
        assert!(matches!(err, crate::Error::Json(_)));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_defaults_when_empty() {
        let settings: ComponentSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, ComponentSettings::default());
        assert!((settings.engine_tbo() - 2000.0).abs() < f64::EPSILON);
        assert!((settings.avionics_interval_months() - 24.0).abs() < f64::EPSILON);
        assert!((settings.magnetos_interval() - 500.0).abs() < f64::EPSILON);
        assert!((settings.vacuum_pump_interval() - 400.0).abs() < f64::EPSILON);
        assert_eq!(settings.propeller_type, PropellerType::Fixed);
    }

    #[test]
    fn test_backend_default_document() {
        let json = r#"{
            "aircraft_id": "123",
            "engine_model": null,
            "engine_tbo_hours": 2000.0,
            "engine_hours_since_overhaul": null,
            "propeller_type": "fixed",
            "propeller_manufacturer_interval_years": null,
            "avionics_certification_interval_months": 24,
            "magnetos_interval_hours": 500.0,
            "vacuum_pump_interval_hours": 400.0,
            "airframe_last_annual_date": null,
            "regulations": {"engine_default_tbo": 2000}
        }"#;
        let settings: ComponentSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.engine_tbo_hours, Some(2000.0));
        assert_eq!(settings.avionics_certification_interval_months, Some(24.0));
        assert!(settings.engine_hours_since_overhaul.is_none());
    }

    #[test]
    fn test_lenient_numbers() {
        let json = r#"{
            "engine_hours_since_overhaul": "1234.5",
            "magnetos_hours_since_inspection": "n/a",
            "vacuum_pump_hours_since_replacement": true,
            "engine_tbo_hours": " 1800 "
        }"#;
        let settings: ComponentSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.engine_hours_since_overhaul, Some(1234.5));
        assert_eq!(settings.engine_tbo_hours, Some(1800.0));
        assert!(settings.magnetos_hours_since_inspection.is_none());
        assert!(settings.vacuum_pump_hours_since_replacement.is_none());
    }

    #[test]
    fn test_lenient_strings() {
        let json = r#"{"airframe_last_annual_date": 20240101, "engine_model": "  "}"#;
        let settings: ComponentSettings = serde_json::from_str(json).unwrap();
        assert!(settings.airframe_last_annual_date.is_none());
        assert!(settings.engine_model.is_none());
    }

    #[test]
    fn test_propeller_type_parsing() {
        let parse = |json: &str| -> PropellerType {
            serde_json::from_str::<ComponentSettings>(json)
                .unwrap()
                .propeller_type
        };
        assert_eq!(parse(r#"{"propeller_type": "variable"}"#), PropellerType::Variable);
        assert_eq!(parse(r#"{"propeller_type": "Variable"}"#), PropellerType::Variable);
        assert_eq!(parse(r#"{"propeller_type": "fixed"}"#), PropellerType::Fixed);
        assert_eq!(parse(r#"{"propeller_type": "banana"}"#), PropellerType::Fixed);
        assert_eq!(parse(r#"{"propeller_type": null}"#), PropellerType::Fixed);
        assert_eq!(parse("{}"), PropellerType::Fixed);
    }

    #[test]
    fn test_propeller_interval_policy() {
        let mut settings = ComponentSettings::default();
        assert!((settings.propeller_interval_years() - 5.0).abs() < f64::EPSILON);

        // A manufacturer interval never applies to a fixed-pitch propeller.
        settings.propeller_manufacturer_interval_years = Some(6.0);
        assert!((settings.propeller_interval_years() - 5.0).abs() < f64::EPSILON);

        settings.propeller_type = PropellerType::Variable;
        assert!((settings.propeller_interval_years() - 6.0).abs() < f64::EPSILON);

        settings.propeller_manufacturer_interval_years = None;
        assert!((settings.propeller_interval_years() - 10.0).abs() < f64::EPSILON);

        settings.propeller_manufacturer_interval_years = Some(0.0);
        assert!((settings.propeller_interval_years() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_elt_defaults() {
        let elt: EltSettings = serde_json::from_str(r#"{"battery_interval_months": "72"}"#).unwrap();
        assert!((elt.test_interval() - 12.0).abs() < f64::EPSILON);
        assert!((elt.battery_interval() - 72.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(parse_date(Some("2024-03-01")), expected);
        assert_eq!(parse_date(Some("2024-03-01T10:00:00Z")), expected);
        assert_eq!(parse_date(Some("2024-03-01T10:00:00.123456")), expected);
        assert_eq!(parse_date(Some(" 2024-03-01 ")), expected);
        assert_eq!(parse_date(Some("03/01/2024")), None);
        assert_eq!(parse_date(Some("")), None);
        assert_eq!(parse_date(None), None);
    }

    #[test]
    fn test_settings_serialize_field_names() {
        let json = serde_json::to_value(ComponentSettings::default()).unwrap();
        let object = json.as_object().unwrap();
        for key in [
            "engine_tbo_hours",
            "propeller_type",
            "propeller_manufacturer_interval_years",
            "airframe_last_annual_date",
            "avionics_certification_interval_months",
            "vacuum_pump_hours_since_replacement",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
    }
}
