//! Request bodies sent to the backend.

use serde::{Deserialize, Serialize};

use crate::session::{iso8601, FlightCandidate};

/// Body of `POST /api/aircraft/{id}/flight-candidates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightCandidateRequest {
    /// Session start, ISO 8601 with milliseconds.
    pub depart_ts: String,
    /// Session stop, ISO 8601 with milliseconds.
    pub arrival_ts: String,
    /// Estimated duration, at least one minute.
    pub duration_est_minutes: u32,
    /// Origin tag of the candidate.
    pub source: String,
}

impl From<&FlightCandidate> for FlightCandidateRequest {
    fn from(candidate: &FlightCandidate) -> Self {
        Self {
            depart_ts: iso8601(candidate.depart_ts),
            arrival_ts: iso8601(candidate.arrival_ts),
            duration_est_minutes: candidate.duration_est_minutes,
            source: candidate.source.clone(),
        }
    }
}

/// Body of `POST /api/pilot-invites/submit-flight/{token}`.
///
/// The invite endpoint takes no timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilotFlightRequest {
    /// Estimated duration, at least one minute.
    pub duration_est_minutes: u32,
}

impl From<&FlightCandidate> for PilotFlightRequest {
    fn from(candidate: &FlightCandidate) -> Self {
        Self {
            duration_est_minutes: candidate.duration_est_minutes,
        }
    }
}
