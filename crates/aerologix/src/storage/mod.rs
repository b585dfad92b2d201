//! Storage layer for aerologix.
//!
//! Sessions must survive between invocations of the CLI, so the active
//! sessions and the history of submitted flights live in a small `SQLite`
//! database.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::session::{iso8601, FlightCandidate, FlightSession, SubmissionFlow};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Persistent store for active sessions and submitted flights.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        // Several CLI invocations may write at once.
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist an active session, replacing any stored one for the same aircraft.
    ///
    /// # Errors
    ///
    /// Returns an error if the session has no start time or the write fails.
    pub fn save_session(&self, session: &FlightSession) -> Result<()> {
        let Some(started_at) = session.started_at else {
            return Err(Error::internal(format!(
                "cannot persist session for {} without a start time",
                session.aircraft_id
            )));
        };

        self.conn.execute(
            r"
            INSERT OR REPLACE INTO active_sessions (aircraft_id, flow, invite_token, started_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                session.aircraft_id,
                session.flow.as_str(),
                session.flow.invite_token(),
                iso8601(started_at),
            ],
        )?;
        debug!("Saved session for aircraft {}", session.aircraft_id);
        Ok(())
    }

    /// Forget the stored session for an aircraft.
    ///
    /// Returns `true` if a session was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove_session(&self, aircraft_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM active_sessions WHERE aircraft_id = ?1",
            [aircraft_id],
        )?;
        Ok(affected > 0)
    }

    /// Load every stored session, ordered by aircraft id.
    ///
    /// Rows that cannot be understood are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn load_sessions(&self) -> Result<Vec<FlightSession>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT aircraft_id, flow, invite_token, started_at
            FROM active_sessions ORDER BY aircraft_id
            ",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(StoredSession {
                    aircraft_id: row.get(0)?,
                    flow: row.get(1)?,
                    invite_token: row.get(2)?,
                    started_at: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows.into_iter().filter_map(StoredSession::into_session).collect())
    }

    /// Record a successful submission.
    ///
    /// Returns the assigned ID, or `None` if a submission with the same key
    /// was already recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn record_submission(
        &self,
        candidate: &FlightCandidate,
        submitted_at: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let key = candidate.submission_key();
        if self.was_submitted(&key)? {
            debug!("Submission {} already recorded", &key[..16]);
            return Ok(None);
        }

        self.conn.execute(
            r"
            INSERT INTO submissions
                (submission_key, aircraft_id, flow, depart_ts, arrival_ts, duration_minutes, submitted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                key,
                candidate.aircraft_id,
                candidate.flow.as_str(),
                iso8601(candidate.depart_ts),
                iso8601(candidate.arrival_ts),
                candidate.duration_est_minutes,
                iso8601(submitted_at),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Recorded submission with id {}", id);
        Ok(Some(id))
    }

    /// Check whether a submission key has already been recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn was_submitted(&self, submission_key: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM submissions WHERE submission_key = ?1",
            [submission_key],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// The most recently submitted flights, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent_submissions(&self, limit: usize) -> Result<Vec<SubmissionRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, aircraft_id, flow, depart_ts, arrival_ts, duration_minutes, submitted_at
            FROM submissions ORDER BY submitted_at DESC, id DESC LIMIT ?1
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map([limit_i64], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Submitted flights for one aircraft, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn submissions_for(&self, aircraft_id: &str, limit: usize) -> Result<Vec<SubmissionRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, aircraft_id, flow, depart_ts, arrival_ts, duration_minutes, submitted_at
            FROM submissions WHERE aircraft_id = ?1
            ORDER BY submitted_at DESC, id DESC LIMIT ?2
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![aircraft_id, limit_i64], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Count recorded submissions.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_submissions(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM submissions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let active_sessions: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM active_sessions", [], |row| row.get(0))?;

        let (total_submissions, total_minutes): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_minutes), 0) FROM submissions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT submitted_at FROM submissions ORDER BY submitted_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            active_sessions,
            total_submissions,
            total_minutes,
            newest_submission: newest.as_deref().and_then(parse_timestamp),
            db_size_bytes,
        })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<SubmissionRecord> {
        let depart: String = row.get(3)?;
        let arrival: String = row.get(4)?;
        let submitted: String = row.get(6)?;

        Ok(SubmissionRecord {
            id: row.get(0)?,
            aircraft_id: row.get(1)?,
            flow: row.get(2)?,
            depart_ts: parse_timestamp(&depart).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            arrival_ts: parse_timestamp(&arrival).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            duration_minutes: row.get(5)?,
            submitted_at: parse_timestamp(&submitted).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        })
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Raw `active_sessions` row.
struct StoredSession {
    aircraft_id: String,
    flow: String,
    invite_token: Option<String>,
    started_at: String,
}

impl StoredSession {
    fn into_session(self) -> Option<FlightSession> {
        let flow = match (self.flow.as_str(), self.invite_token) {
            ("owner", _) => SubmissionFlow::Owner,
            ("pilot_invite", Some(token)) => SubmissionFlow::PilotInvite { token },
            (other, _) => {
                warn!(
                    "Skipping stored session for {} with unknown flow {}",
                    self.aircraft_id, other
                );
                return None;
            }
        };

        let Some(started_at) = parse_timestamp(&self.started_at) else {
            warn!(
                "Skipping stored session for {} with bad start time {}",
                self.aircraft_id, self.started_at
            );
            return None;
        };

        Some(FlightSession::started(self.aircraft_id, flow, started_at))
    }
}

/// A flight that was accepted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    /// Local row id.
    pub id: i64,
    /// The aircraft flown.
    pub aircraft_id: String,
    /// `owner` or `pilot_invite`.
    pub flow: String,
    /// When tracking started.
    pub depart_ts: DateTime<Utc>,
    /// When tracking stopped.
    pub arrival_ts: DateTime<Utc>,
    /// Minutes reported to the backend.
    pub duration_minutes: u32,
    /// When the backend accepted it.
    pub submitted_at: DateTime<Utc>,
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Sessions currently being tracked.
    pub active_sessions: i64,
    /// Flights submitted from this machine.
    pub total_submissions: i64,
    /// Sum of submitted durations.
    pub total_minutes: i64,
    /// When the last flight was submitted.
    pub newest_submission: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
