//! Maintenance interval calculator.
//!
//! Each tracked component is compared against its interval and reported as a
//! percentage of life used plus a traffic-light status. The calculator never
//! fails: missing or malformed inputs read as "no data" and produce 0% green.
//!
//! Date-based intervals use flat 30-day months and 365-day years so the
//! percentages line up with the values the backend displays.

pub mod settings;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use self::settings::{parse_date, regulations, ComponentSettings, EltSettings};

/// Upper bound on reported percentages; keeps progress bars from overflowing.
pub const MAX_PERCENTAGE: f64 = 150.0;

/// Percentage at which a component turns yellow.
pub const WARNING_PERCENTAGE: f64 = 80.0;

/// Percentage at which a component turns red.
pub const EXCEEDED_PERCENTAGE: f64 = 100.0;

const DAYS_PER_MONTH: f64 = 30.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Traffic-light status of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceStatus {
    /// Below the warning threshold.
    Green,
    /// Approaching the limit.
    Yellow,
    /// At or past the limit.
    Red,
    /// No data. Reserved: missing inputs currently report green at 0%.
    Grey,
}

impl MaintenanceStatus {
    /// Display color for the status.
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Green => "#10B981",
            Self::Yellow => "#F59E0B",
            Self::Red => "#EF4444",
            Self::Grey => "#9CA3AF",
        }
    }
}

impl std::fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Grey => "grey",
        })
    }
}

/// Status for a percentage of life used.
#[must_use]
pub fn status_from_percentage(percentage: f64) -> MaintenanceStatus {
    if percentage >= EXCEEDED_PERCENTAGE {
        MaintenanceStatus::Red
    } else if percentage >= WARNING_PERCENTAGE {
        MaintenanceStatus::Yellow
    } else {
        MaintenanceStatus::Green
    }
}

// Overflow to +inf still saturates; NaN counts as no data.
fn clamp_percentage(percentage: f64) -> f64 {
    if percentage.is_nan() {
        0.0
    } else {
        percentage.clamp(0.0, MAX_PERCENTAGE)
    }
}

/// Percentage of an hour-based interval used.
///
/// Zero when the hours are missing or not positive, or the interval is not
/// positive.
#[must_use]
pub fn percentage_by_hours(hours_since_event: Option<f64>, interval_hours: f64) -> f64 {
    match hours_since_event {
        Some(hours) if hours > 0.0 && interval_hours > 0.0 => {
            clamp_percentage(hours / interval_hours * 100.0)
        }
        _ => 0.0,
    }
}

#[allow(clippy::cast_precision_loss)]
fn days_since(last_event: NaiveDate, today: NaiveDate) -> f64 {
    (today - last_event).num_days() as f64
}

/// Percentage of a month-based interval used, with 30-day months.
///
/// Zero when the date is missing or the interval is not positive. A date in
/// the future also reads as zero.
#[must_use]
pub fn percentage_by_date(
    last_event_date: Option<NaiveDate>,
    interval_months: f64,
    today: NaiveDate,
) -> f64 {
    match last_event_date {
        Some(last) if interval_months > 0.0 => {
            let months = days_since(last, today) / DAYS_PER_MONTH;
            clamp_percentage(months / interval_months * 100.0)
        }
        _ => 0.0,
    }
}

/// Percentage of a year-based interval used, with 365-day years.
#[must_use]
pub fn percentage_by_date_years(
    last_event_date: Option<NaiveDate>,
    interval_years: f64,
    today: NaiveDate,
) -> f64 {
    match last_event_date {
        Some(last) if interval_years > 0.0 => {
            let years = days_since(last, today) / DAYS_PER_YEAR;
            clamp_percentage(years / interval_years * 100.0)
        }
        _ => 0.0,
    }
}

/// The components a report can contain, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Engine time between overhaul.
    Engine,
    /// Propeller inspection.
    Propeller,
    /// Annual airframe inspection.
    Airframe,
    /// Avionics certification.
    Avionics,
    /// Magneto inspection.
    Magnetos,
    /// Vacuum pump replacement.
    VacuumPump,
    /// ELT functional test.
    EltTest,
    /// ELT battery replacement.
    EltBattery,
}

impl ComponentKind {
    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Engine => "Engine (TBO)",
            Self::Propeller => "Propeller",
            Self::Airframe => "Annual inspection",
            Self::Avionics => "Avionics certification",
            Self::Magnetos => "Magnetos",
            Self::VacuumPump => "Vacuum pump",
            Self::EltTest => "ELT test",
            Self::EltBattery => "ELT battery",
        }
    }

    /// Icon name.
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::Propeller => "fan",
            Self::Airframe => "airplane",
            Self::Avionics => "radio",
            Self::Magnetos => "flash",
            Self::VacuumPump => "gauge",
            Self::EltTest => "radio-tower",
            Self::EltBattery => "battery",
        }
    }
}

/// One row of a maintenance report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// Which component this row describes.
    pub kind: ComponentKind,
    /// Display name.
    pub name: String,
    /// Icon name.
    pub icon: String,
    /// Display color, derived from the status.
    pub color: String,
    /// Percentage of the interval used, in `[0, 150]`.
    pub percentage: f64,
    /// Status derived from the percentage.
    pub status: MaintenanceStatus,
    /// Raw value, human readable.
    pub current: String,
    /// Threshold, human readable.
    pub limit: String,
}

impl ComponentStatus {
    fn new(kind: ComponentKind, percentage: f64, current: String, limit: String) -> Self {
        let status = status_from_percentage(percentage);
        Self {
            kind,
            name: kind.name().to_string(),
            icon: kind.icon().to_string(),
            color: status.color().to_string(),
            percentage,
            status,
            current,
            limit,
        }
    }
}

const NOT_RECORDED: &str = "Not recorded";

/// Render a number without a trailing `.0`.
fn number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn hours_row(kind: ComponentKind, hours: Option<f64>, interval: f64) -> ComponentStatus {
    ComponentStatus::new(
        kind,
        percentage_by_hours(hours, interval),
        hours.map_or_else(|| NOT_RECORDED.to_string(), |h| format!("{} h", number(h))),
        format!("{} h", number(interval)),
    )
}

fn date_label(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| NOT_RECORDED.to_string(), |d| d.format("%Y-%m-%d").to_string())
}

fn months_row(
    kind: ComponentKind,
    raw_date: Option<&str>,
    interval_months: f64,
    today: NaiveDate,
) -> ComponentStatus {
    let date = parse_date(raw_date);
    ComponentStatus::new(
        kind,
        percentage_by_date(date, interval_months, today),
        date_label(date),
        format!("Every {} months", number(interval_months)),
    )
}

/// Evaluate every component of an aircraft.
///
/// Rows come back in a fixed order: engine, propeller, annual inspection,
/// avionics, magnetos, vacuum pump, then the two ELT rows when `elt` is
/// given. Components are independent; there is no overall score.
#[must_use]
pub fn report(
    settings: &ComponentSettings,
    elt: Option<&EltSettings>,
    today: NaiveDate,
) -> Vec<ComponentStatus> {
    let propeller_date = parse_date(settings.propeller_last_inspection_date.as_deref());
    let propeller_years = settings.propeller_interval_years();

    let mut rows = vec![
        hours_row(
            ComponentKind::Engine,
            settings.engine_hours_since_overhaul,
            settings.engine_tbo(),
        ),
        ComponentStatus::new(
            ComponentKind::Propeller,
            percentage_by_date_years(propeller_date, propeller_years, today),
            date_label(propeller_date),
            format!("Every {} years", number(propeller_years)),
        ),
        months_row(
            ComponentKind::Airframe,
            settings.airframe_last_annual_date.as_deref(),
            regulations::ANNUAL_INSPECTION_MONTHS,
            today,
        ),
        months_row(
            ComponentKind::Avionics,
            settings.avionics_last_certification_date.as_deref(),
            settings.avionics_interval_months(),
            today,
        ),
        hours_row(
            ComponentKind::Magnetos,
            settings.magnetos_hours_since_inspection,
            settings.magnetos_interval(),
        ),
        hours_row(
            ComponentKind::VacuumPump,
            settings.vacuum_pump_hours_since_replacement,
            settings.vacuum_pump_interval(),
        ),
    ];

    if let Some(elt) = elt {
        rows.push(months_row(
            ComponentKind::EltTest,
            elt.last_test_date.as_deref(),
            elt.test_interval(),
            today,
        ));
        rows.push(months_row(
            ComponentKind::EltBattery,
            elt.battery_install_date.as_deref(),
            elt.battery_interval(),
            today,
        ));
    }

    rows
}
