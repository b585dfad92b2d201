//! `SQLite` schema definitions for aerologix.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the table of sessions being tracked.
pub const CREATE_ACTIVE_SESSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS active_sessions (
    aircraft_id TEXT PRIMARY KEY,
    flow TEXT NOT NULL,
    invite_token TEXT,
    started_at TEXT NOT NULL
)
";

/// SQL statement to create the table of submitted flights.
pub const CREATE_SUBMISSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS submissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    submission_key TEXT NOT NULL UNIQUE,
    aircraft_id TEXT NOT NULL,
    flow TEXT NOT NULL,
    depart_ts TEXT NOT NULL,
    arrival_ts TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL,
    submitted_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `submitted_at` for history queries.
pub const CREATE_SUBMITTED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_submissions_submitted_at ON submissions(submitted_at DESC)
";

/// SQL statement to create an index on `aircraft_id` for filtering.
pub const CREATE_AIRCRAFT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_submissions_aircraft ON submissions(aircraft_id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_ACTIVE_SESSIONS_TABLE,
    CREATE_SUBMISSIONS_TABLE,
    CREATE_SUBMITTED_AT_INDEX,
    CREATE_AIRCRAFT_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_active_sessions_keyed_by_aircraft() {
        assert!(CREATE_ACTIVE_SESSIONS_TABLE.contains("aircraft_id TEXT PRIMARY KEY"));
        assert!(CREATE_ACTIVE_SESSIONS_TABLE.contains("started_at TEXT NOT NULL"));
    }

    #[test]
    fn test_submission_key_is_unique() {
        assert!(CREATE_SUBMISSIONS_TABLE.contains("submission_key TEXT NOT NULL UNIQUE"));
        assert!(CREATE_SUBMISSIONS_TABLE.contains("duration_minutes INTEGER NOT NULL"));
    }
}
