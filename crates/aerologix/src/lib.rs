//! `aerologix` - flight session tracking and maintenance interval reporting
//!
//! This library times flights per aircraft and submits them to the AeroLogix
//! backend once they end, and turns an aircraft's component settings into a
//! colour-coded maintenance report.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod maintenance;
pub mod recorder;
pub mod session;
pub mod storage;

pub use api::{ApiClient, ApiError, FlightSubmitter};
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use maintenance::{report, ComponentStatus, MaintenanceStatus};
pub use recorder::{SessionRecorder, StopOutcome};
pub use session::{FlightCandidate, FlightSession, SessionTracker, SubmissionFlow, Ticker};
pub use storage::{Storage, StorageStats, SubmissionRecord};
