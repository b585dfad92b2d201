//! Flight session tracking.
//!
//! A session is opened when tracking starts for an aircraft and closed when it
//! stops. Only the start time is authoritative; elapsed minutes are derived
//! from it on every tick. Stopping a session turns it into a single
//! [`FlightCandidate`] that is submitted to the backend once.

pub mod ticker;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::FlightSubmitter;
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};

pub use ticker::Ticker;

/// Source tag attached to every candidate produced by session tracking.
pub const SOURCE_SESSION_TRACKING: &str = "session_tracking";

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Which backend endpoint a finished session is submitted to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionFlow {
    /// The aircraft owner tracks the flight; a flight candidate is created.
    Owner,
    /// A pilot tracks the flight through an invite link.
    PilotInvite {
        /// The invite token scoping the submission.
        token: String,
    },
}

impl SubmissionFlow {
    /// Short name used in logs and storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::PilotInvite { .. } => "pilot_invite",
        }
    }

    /// The invite token, for the pilot-invite flow.
    #[must_use]
    pub fn invite_token(&self) -> Option<&str> {
        match self {
            Self::Owner => None,
            Self::PilotInvite { token } => Some(token),
        }
    }
}

impl std::fmt::Display for SubmissionFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Whole minutes between `started_at` and `now`, rounded down.
///
/// A clock reading earlier than the start yields zero.
#[must_use]
pub fn elapsed_minutes(started_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    ((now - started_at).num_milliseconds() / MILLIS_PER_MINUTE).max(0)
}

/// Duration reported for a session: elapsed minutes, but never less than one.
#[must_use]
pub fn duration_minutes(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> u32 {
    u32::try_from(elapsed_minutes(started_at, ended_at).max(1)).unwrap_or(u32::MAX)
}

/// Format a timestamp the way the backend expects (`2024-05-01T14:03:22.120Z`).
#[must_use]
pub fn iso8601(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// An in-progress (or reset) flight session for one aircraft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSession {
    /// The aircraft being tracked.
    pub aircraft_id: String,
    /// Where the finished flight will be submitted.
    pub flow: SubmissionFlow,
    /// True between start and stop.
    pub is_active: bool,
    /// When tracking started; `None` when inactive.
    pub started_at: Option<DateTime<Utc>>,
    /// Derived on each tick; never authoritative.
    pub elapsed_minutes: i64,
}

impl FlightSession {
    /// A session that started at `started_at`.
    #[must_use]
    pub fn started(
        aircraft_id: impl Into<String>,
        flow: SubmissionFlow,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            aircraft_id: aircraft_id.into(),
            flow,
            is_active: true,
            started_at: Some(started_at),
            elapsed_minutes: 0,
        }
    }

    /// Recompute the derived elapsed minutes.
    pub fn recompute(&mut self, now: DateTime<Utc>) {
        self.elapsed_minutes = match (self.is_active, self.started_at) {
            (true, Some(started_at)) => elapsed_minutes(started_at, now),
            _ => 0,
        };
    }

    /// Return to the inactive state.
    pub fn reset(&mut self) {
        self.is_active = false;
        self.started_at = None;
        self.elapsed_minutes = 0;
    }

    /// The key its candidate will carry, or `None` for an inactive session.
    #[must_use]
    pub fn submission_key(&self) -> Option<String> {
        self.started_at
            .filter(|_| self.is_active)
            .map(|started_at| submission_key(&self.aircraft_id, &self.flow, started_at))
    }
}

/// A finished session, ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightCandidate {
    /// The aircraft flown.
    pub aircraft_id: String,
    /// Where the candidate goes.
    pub flow: SubmissionFlow,
    /// When tracking started.
    pub depart_ts: DateTime<Utc>,
    /// When tracking stopped.
    pub arrival_ts: DateTime<Utc>,
    /// Rounded-down minutes, at least one.
    pub duration_est_minutes: u32,
    /// Always [`SOURCE_SESSION_TRACKING`].
    pub source: String,
}

impl FlightCandidate {
    /// Build the candidate for a session that ran from `depart_ts` to `arrival_ts`.
    #[must_use]
    pub fn new(
        aircraft_id: impl Into<String>,
        flow: SubmissionFlow,
        depart_ts: DateTime<Utc>,
        arrival_ts: DateTime<Utc>,
    ) -> Self {
        Self {
            aircraft_id: aircraft_id.into(),
            flow,
            depart_ts,
            arrival_ts,
            duration_est_minutes: duration_minutes(depart_ts, arrival_ts),
            source: SOURCE_SESSION_TRACKING.to_string(),
        }
    }

    /// Stable key identifying the session this candidate came from.
    ///
    /// Derived from the aircraft, the flow and the start time, so retrying the
    /// same session produces the same key even though the stop time moves.
    #[must_use]
    pub fn submission_key(&self) -> String {
        submission_key(&self.aircraft_id, &self.flow, self.depart_ts)
    }
}

fn submission_key(aircraft_id: &str, flow: &SubmissionFlow, depart_ts: DateTime<Utc>) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(aircraft_id.as_bytes());
    hasher.update(b"\n");
    hasher.update(flow.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(flow.invite_token().unwrap_or_default().as_bytes());
    hasher.update(b"\n");
    hasher.update(&depart_ts.timestamp_millis().to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

/// The set of active sessions, keyed by aircraft id.
///
/// Cloning a tracker yields another handle to the same sessions, which is how
/// the [`Ticker`] task and command handlers share them.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    sessions: Arc<Mutex<HashMap<String, FlightSession>>>,
    clock: Arc<dyn Clock>,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTracker {
    /// Create a tracker using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a tracker reading time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    // A panic while holding the lock cannot leave a session half-written, so
    // poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, FlightSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking a flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionAlreadyActive`] if the aircraft already has a session.
    pub fn start(&self, aircraft_id: &str, flow: SubmissionFlow) -> Result<FlightSession> {
        let now = self.clock.now();
        let mut sessions = self.lock();
        match sessions.entry(aircraft_id.to_string()) {
            Entry::Occupied(_) => Err(Error::session_already_active(aircraft_id)),
            Entry::Vacant(slot) => {
                let session = FlightSession::started(aircraft_id, flow, now);
                debug!(
                    "Started {} session for aircraft {} at {}",
                    session.flow,
                    aircraft_id,
                    iso8601(now)
                );
                slot.insert(session.clone());
                Ok(session)
            }
        }
    }

    /// Recompute elapsed minutes for every active session.
    ///
    /// Returns the updated sessions ordered by aircraft id.
    pub fn tick(&self) -> Vec<FlightSession> {
        let now = self.clock.now();
        let mut sessions = self.lock();
        let mut snapshot: Vec<FlightSession> = sessions
            .values_mut()
            .map(|session| {
                session.recompute(now);
                session.clone()
            })
            .collect();
        drop(sessions);
        snapshot.sort_by(|a, b| a.aircraft_id.cmp(&b.aircraft_id));
        snapshot
    }

    /// The current session for an aircraft, with elapsed minutes up to date.
    #[must_use]
    pub fn status(&self, aircraft_id: &str) -> Option<FlightSession> {
        let now = self.clock.now();
        self.lock().get_mut(aircraft_id).map(|session| {
            session.recompute(now);
            session.clone()
        })
    }

    /// Check whether an aircraft has an active session.
    #[must_use]
    pub fn is_active(&self, aircraft_id: &str) -> bool {
        self.lock().contains_key(aircraft_id)
    }

    /// Number of active sessions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Load previously persisted sessions.
    ///
    /// Inactive sessions or sessions without a start time are skipped; an
    /// aircraft that is already tracked keeps its current session.
    pub fn restore(&self, restored: impl IntoIterator<Item = FlightSession>) {
        let mut sessions = self.lock();
        for session in restored {
            if !session.is_active || session.started_at.is_none() {
                warn!(
                    "Ignoring inactive session for aircraft {}",
                    session.aircraft_id
                );
                continue;
            }
            sessions
                .entry(session.aircraft_id.clone())
                .or_insert(session);
        }
    }

    /// Stop tracking and submit the flight.
    ///
    /// The session is taken out of the tracker before the request is sent, so
    /// a concurrent stop for the same aircraft sees no session and cannot
    /// submit twice. If the submission fails the session is put back with its
    /// original start time so the user can retry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotActive`] if nothing is being tracked, or
    /// [`Error::Submission`] if the backend call failed.
    pub async fn stop(
        &self,
        aircraft_id: &str,
        submitter: &dyn FlightSubmitter,
    ) -> Result<FlightCandidate> {
        let removed = self.lock().remove(aircraft_id);
        let session = removed.ok_or_else(|| Error::session_not_active(aircraft_id))?;

        let Some(started_at) = session.started_at else {
            return Err(Error::internal(format!(
                "active session for {aircraft_id} has no start time"
            )));
        };

        let candidate = FlightCandidate::new(
            aircraft_id,
            session.flow.clone(),
            started_at,
            self.clock.now(),
        );
        debug!(
            "Stopping session for aircraft {} after {} minute(s)",
            aircraft_id, candidate.duration_est_minutes
        );

        match submitter.submit(&candidate).await {
            Ok(()) => {
                info!(
                    "Flight of {} minute(s) recorded for aircraft {}",
                    candidate.duration_est_minutes, aircraft_id
                );
                Ok(candidate)
            }
            Err(source) => {
                warn!(
                    "Submission failed for aircraft {}, session restored: {}",
                    aircraft_id, source
                );
                self.reinstate(session);
                Err(Error::Submission {
                    aircraft_id: aircraft_id.to_string(),
                    source,
                })
            }
        }
    }

    fn reinstate(&self, session: FlightSession) {
        match self.lock().entry(session.aircraft_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(session);
            }
            Entry::Occupied(_) => warn!(
                "Aircraft {} was restarted during submission; keeping the newer session",
                session.aircraft_id
            ),
        }
    }

    /// Drop a session without submitting it.
    pub fn discard(&self, aircraft_id: &str) -> Option<FlightSession> {
        self.lock().remove(aircraft_id)
    }

    /// Current time according to the tracker's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Snapshot of all active sessions, ordered by aircraft id.
    #[must_use]
    pub fn active_sessions(&self) -> Vec<FlightSession> {
        self.tick()
    }
}
