//! Persistent session recording.
//!
//! [`SessionRecorder`] pairs the in-memory [`SessionTracker`] with
//! [`Storage`] so a flight started by one invocation of the CLI can be
//! stopped by a later one. Stored sessions are loaded into the tracker when
//! the recorder is opened, and every start or stop is written through.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::api::FlightSubmitter;
use crate::error::{Error, Result};
use crate::session::{FlightCandidate, FlightSession, SessionTracker, SubmissionFlow};
use crate::storage::Storage;

/// What happened when a session was stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// The flight was accepted by the backend.
    Submitted(FlightCandidate),
    /// The flight had already been accepted; the stale session was cleared.
    AlreadySubmitted {
        /// The aircraft whose session was cleared.
        aircraft_id: String,
    },
}

/// Session tracker backed by the local database.
#[derive(Debug)]
pub struct SessionRecorder {
    tracker: SessionTracker,
    storage: Storage,
}

impl SessionRecorder {
    /// Open a recorder with the system clock.
    ///
    /// # Errors
    ///
    /// Returns an error if stored sessions cannot be read.
    pub fn new(storage: Storage) -> Result<Self> {
        Self::with_tracker(SessionTracker::new(), storage)
    }

    /// Open a recorder around an existing tracker.
    ///
    /// # Errors
    ///
    /// Returns an error if stored sessions cannot be read.
    pub fn with_tracker(tracker: SessionTracker, storage: Storage) -> Result<Self> {
        let recorder = Self { tracker, storage };
        recorder.reload()?;
        Ok(recorder)
    }

    /// Pick up sessions stored since the recorder was opened.
    ///
    /// # Errors
    ///
    /// Returns an error if stored sessions cannot be read.
    pub fn reload(&self) -> Result<()> {
        let stored = self.storage.load_sessions()?;
        self.tracker.restore(stored);
        Ok(())
    }

    /// Make the tracker match storage.
    ///
    /// Sessions started elsewhere are added and sessions stopped elsewhere
    /// are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if stored sessions cannot be read.
    pub fn sync(&self) -> Result<()> {
        let stored = self.storage.load_sessions()?;
        let stored_ids: HashSet<&str> = stored.iter().map(|s| s.aircraft_id.as_str()).collect();
        for session in self.tracker.active_sessions() {
            if !stored_ids.contains(session.aircraft_id.as_str()) {
                debug!("Session for {} ended elsewhere", session.aircraft_id);
                self.tracker.discard(&session.aircraft_id);
            }
        }
        self.tracker.restore(stored);
        Ok(())
    }

    /// Sync with storage and return every session with fresh elapsed minutes.
    ///
    /// # Errors
    ///
    /// Returns an error if stored sessions cannot be read.
    pub fn refresh(&self) -> Result<Vec<FlightSession>> {
        self.sync()?;
        Ok(self.tracker.tick())
    }

    /// The underlying tracker, for attaching a ticker.
    #[must_use]
    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// The underlying storage.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Start tracking and persist the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionAlreadyActive`] if the aircraft is already
    /// tracked, or a storage error if the session could not be saved.
    pub fn start(&self, aircraft_id: &str, flow: SubmissionFlow) -> Result<FlightSession> {
        let session = self.tracker.start(aircraft_id, flow)?;
        if let Err(e) = self.storage.save_session(&session) {
            self.tracker.discard(aircraft_id);
            return Err(e);
        }
        info!("Tracking started for aircraft {}", aircraft_id);
        Ok(session)
    }

    /// Stop tracking, submit the flight, and record it.
    ///
    /// A session whose flight was already recorded is cleared without
    /// contacting the backend. The stored session is removed before the
    /// request, so two invocations sharing a database submit at most once.
    /// If the submission fails the session is put back both in memory and on
    /// disk so it can be retried.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotActive`] if nothing is tracked or another
    /// invocation already took the stored session,
    /// [`Error::Submission`] if the backend call failed, or a storage error.
    pub async fn stop(
        &self,
        aircraft_id: &str,
        submitter: &dyn FlightSubmitter,
    ) -> Result<StopOutcome> {
        let session = self
            .tracker
            .status(aircraft_id)
            .ok_or_else(|| Error::session_not_active(aircraft_id))?;

        if let Some(key) = session.submission_key() {
            if self.storage.was_submitted(&key)? {
                warn!(
                    "Flight for aircraft {} was already submitted, clearing session",
                    aircraft_id
                );
                self.tracker.discard(aircraft_id);
                self.storage.remove_session(aircraft_id)?;
                return Ok(StopOutcome::AlreadySubmitted {
                    aircraft_id: aircraft_id.to_string(),
                });
            }
        }

        // Claim the stored row first so a stop running in another process
        // finds nothing to submit.
        if !self.storage.remove_session(aircraft_id)? {
            debug!("Session for {} was claimed elsewhere", aircraft_id);
            self.tracker.discard(aircraft_id);
            return Err(Error::session_not_active(aircraft_id));
        }

        match self.tracker.stop(aircraft_id, submitter).await {
            Ok(candidate) => {
                self.storage
                    .record_submission(&candidate, self.tracker.now())?;
                Ok(StopOutcome::Submitted(candidate))
            }
            Err(e) if e.is_submission_error() => {
                if let Err(save_err) = self.storage.save_session(&session) {
                    warn!(
                        "Could not store session for {} after failed submission: {}",
                        aircraft_id, save_err
                    );
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// The session for one aircraft, if tracked.
    #[must_use]
    pub fn status(&self, aircraft_id: &str) -> Option<FlightSession> {
        self.tracker.status(aircraft_id)
    }

    /// All tracked sessions with elapsed minutes up to date.
    #[must_use]
    pub fn active(&self) -> Vec<FlightSession> {
        self.tracker.active_sessions()
    }
}
