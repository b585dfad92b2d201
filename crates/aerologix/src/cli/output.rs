//! Rendering of command output.

use std::fmt::Write as _;

use serde::Serialize;

use super::OutputFormat;
use crate::maintenance::ComponentStatus;
use crate::session::{iso8601, FlightSession};
use crate::storage::{StorageStats, SubmissionRecord};

/// `1h 05m` style duration.
#[must_use]
pub fn format_elapsed(minutes: i64) -> String {
    let minutes = minutes.max(0);
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

fn json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// Tracked sessions, one per line.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn sessions(sessions: &[FlightSession], format: OutputFormat) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return json(sessions);
    }
    if sessions.iter().all(|s| !s.is_active) {
        return Ok("No active flight sessions.".to_string());
    }

    let mut out = String::new();
    if format == OutputFormat::Table {
        let _ = writeln!(out, "{:<12} {:<13} {:<26} {:>8}", "AIRCRAFT", "FLOW", "STARTED", "ELAPSED");
    }
    for session in sessions.iter().filter(|s| s.is_active) {
        let started = session.started_at.map(iso8601).unwrap_or_default();
        let elapsed = format_elapsed(session.elapsed_minutes);
        match format {
            OutputFormat::Table => {
                let _ = writeln!(
                    out,
                    "{:<12} {:<13} {:<26} {:>8}",
                    session.aircraft_id, session.flow, started, elapsed
                );
            }
            _ => {
                let _ = writeln!(
                    out,
                    "{} ({}) started {} elapsed {}",
                    session.aircraft_id, session.flow, started, elapsed
                );
            }
        }
    }
    Ok(out.trim_end().to_string())
}

/// A maintenance report.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn report(rows: &[ComponentStatus], format: OutputFormat) -> serde_json::Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Json => return json(rows),
        OutputFormat::Table => {
            let _ = writeln!(
                out,
                "{:<24} {:>6} {:<7} {:<16} LIMIT",
                "COMPONENT", "USED", "STATUS", "CURRENT"
            );
            for row in rows {
                let _ = writeln!(
                    out,
                    "{:<24} {:>5.0}% {:<7} {:<16} {}",
                    row.name, row.percentage, row.status, row.current, row.limit
                );
            }
        }
        OutputFormat::Plain => {
            for row in rows {
                let _ = writeln!(
                    out,
                    "{}: {:.0}% ({}) {} / {}",
                    row.name, row.percentage, row.status, row.current, row.limit
                );
            }
        }
    }
    Ok(out.trim_end().to_string())
}

/// Submitted flights, with a storage summary for table output.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn history(
    records: &[SubmissionRecord],
    stats: &StorageStats,
    format: OutputFormat,
) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return json(records);
    }
    if records.is_empty() {
        return Ok("No flights submitted yet.".to_string());
    }

    let mut out = String::new();
    if format == OutputFormat::Table {
        let _ = writeln!(
            out,
            "{:<12} {:<13} {:<26} {:>8}",
            "AIRCRAFT", "FLOW", "DEPARTED", "DURATION"
        );
    }
    for record in records {
        let departed = iso8601(record.depart_ts);
        let duration = format_elapsed(i64::from(record.duration_minutes));
        if format == OutputFormat::Table {
            let _ = writeln!(
                out,
                "{:<12} {:<13} {:<26} {:>8}",
                record.aircraft_id, record.flow, departed, duration
            );
        } else {
            let _ = writeln!(
                out,
                "{} ({}) departed {} for {}",
                record.aircraft_id, record.flow, departed, duration
            );
        }
    }
    if format == OutputFormat::Table {
        let _ = write!(
            out,
            "\n{} flight(s), {} total",
            stats.total_submissions,
            format_elapsed(stats.total_minutes)
        );
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};

    use super::*;
    use crate::maintenance::settings::ComponentSettings;
    use crate::session::SubmissionFlow;

    fn ts(millis: i64) -> DateTime<chrono::Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "0h 00m");
        assert_eq!(format_elapsed(5), "0h 05m");
        assert_eq!(format_elapsed(65), "1h 05m");
        assert_eq!(format_elapsed(-3), "0h 00m");
    }

    #[test]
    fn test_sessions_empty() {
        assert_eq!(
            sessions(&[], OutputFormat::Table).unwrap(),
            "No active flight sessions."
        );
    }

    #[test]
    fn test_sessions_table() {
        let mut session = FlightSession::started("C-GABC", SubmissionFlow::Owner, ts(0));
        session.elapsed_minutes = 72;

        let out = sessions(&[session], OutputFormat::Table).unwrap();
        assert!(out.starts_with("AIRCRAFT"));
        assert!(out.contains("C-GABC"));
        assert!(out.contains("owner"));
        assert!(out.contains("1h 12m"));
    }

    #[test]
    fn test_sessions_json_includes_inactive() {
        let mut session = FlightSession::started("C-GABC", SubmissionFlow::Owner, ts(0));
        session.reset();

        let out = sessions(&[session], OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["is_active"], false);
        assert!(value[0]["started_at"].is_null());
    }

    #[test]
    fn test_report_formats() {
        let rows = crate::maintenance::report(
            &ComponentSettings::default(),
            None,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );

        let table = report(&rows, OutputFormat::Table).unwrap();
        assert!(table.starts_with("COMPONENT"));
        assert!(table.contains("Engine (TBO)"));
        assert!(table.contains("Not recorded"));

        let plain = report(&rows, OutputFormat::Plain).unwrap();
        assert_eq!(plain.lines().count(), rows.len());

        let parsed: serde_json::Value =
            serde_json::from_str(&report(&rows, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), rows.len());
    }

    #[test]
    fn test_history_table_with_summary() {
        let record = SubmissionRecord {
            id: 1,
            aircraft_id: "N12345".to_string(),
            flow: "pilot_invite".to_string(),
            depart_ts: ts(0),
            arrival_ts: ts(90 * 60_000),
            duration_minutes: 90,
            submitted_at: ts(90 * 60_000),
        };
        let stats = StorageStats {
            active_sessions: 0,
            total_submissions: 1,
            total_minutes: 90,
            newest_submission: Some(ts(90 * 60_000)),
            db_size_bytes: 0,
        };

        let out = history(&[record], &stats, OutputFormat::Table).unwrap();
        assert!(out.contains("N12345"));
        assert!(out.contains("1h 30m"));
        assert!(out.ends_with("1 flight(s), 1h 30m total"));
    }

    #[test]
    fn test_history_empty() {
        let stats = StorageStats {
            active_sessions: 0,
            total_submissions: 0,
            total_minutes: 0,
            newest_submission: None,
            db_size_bytes: 0,
        };
        assert_eq!(
            history(&[], &stats, OutputFormat::Plain).unwrap(),
            "No flights submitted yet."
        );
    }
}
