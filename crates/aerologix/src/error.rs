//! Error types for aerologix.
//!
//! This module defines the crate-wide error type. Failures talking to the
//! backend have their own [`ApiError`](crate::api::ApiError), which is wrapped
//! here when it crosses into session or storage code.

use std::path::PathBuf;
use thiserror::Error;

use crate::api::ApiError;

/// The main error type for aerologix operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Session Errors ===
    /// A session is already being tracked for this aircraft.
    #[error("a flight session is already active for aircraft {aircraft_id}")]
    SessionAlreadyActive {
        /// The aircraft with the running session.
        aircraft_id: String,
    },

    /// No session is being tracked for this aircraft.
    #[error("no active flight session for aircraft {aircraft_id}")]
    SessionNotActive {
        /// The aircraft that was expected to have a session.
        aircraft_id: String,
    },

    /// Submitting the flight candidate failed; the session was kept.
    #[error("failed to submit flight for aircraft {aircraft_id}: {source}")]
    Submission {
        /// The aircraft whose flight could not be submitted.
        aircraft_id: String,
        /// The underlying API error.
        #[source]
        source: ApiError,
    },

    // === API Errors ===
    /// A backend request failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for aerologix operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a session-already-active error.
    #[must_use]
    pub fn session_already_active(aircraft_id: impl Into<String>) -> Self {
        Self::SessionAlreadyActive {
            aircraft_id: aircraft_id.into(),
        }
    }

    /// Create a session-not-active error.
    #[must_use]
    pub fn session_not_active(aircraft_id: impl Into<String>) -> Self {
        Self::SessionNotActive {
            aircraft_id: aircraft_id.into(),
        }
    }

    /// Check if this error is a failed flight submission.
    #[must_use]
    pub fn is_submission_error(&self) -> bool {
        matches!(self, Self::Submission { .. })
    }

    /// Message suitable for showing to the user.
    ///
    /// Backend failures are translated into their per-status wording; every
    /// other error falls back to its display text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Submission { source, .. } | Self::Api(source) => source.user_message(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::session_not_active("C-GABC");
        assert_eq!(
            err.to_string(),
            "no active flight session for aircraft C-GABC"
        );

        let err = Error::session_already_active("C-GABC");
        assert!(err.to_string().contains("already active"));
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_submission_error() {
        let err = Error::Submission {
            aircraft_id: "C-GABC".to_string(),
            source: ApiError::NotFound {
                message: "Aircraft not found".to_string(),
            },
        };
        assert!(err.is_submission_error());
        assert!(err.to_string().contains("C-GABC"));
        assert!(err.to_string().contains("Aircraft not found"));
        assert!(!Error::internal("x").is_submission_error());
    }

    #[test]
    fn test_user_message_uses_api_wording() {
        let err = Error::Submission {
            aircraft_id: "C-GABC".to_string(),
            source: ApiError::Unauthorized {
                message: "Could not validate credentials".to_string(),
            },
        };
        assert!(err.user_message().contains("log in again"));

        let err = Error::session_not_active("C-GABC");
        assert_eq!(err.user_message(), err.to_string());
    }

    #[test]
    fn test_api_error_is_transparent() {
        let err: Error = ApiError::Forbidden {
            message: "Aircraft limit reached".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "forbidden: Aircraft limit reached");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_migration_error_display() {
        let err = Error::DatabaseMigration {
            message: "version mismatch".to_string(),
        };
        assert!(err.to_string().contains("version mismatch"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "invalid base_url".to_string(),
        };
        assert!(err.to_string().contains("invalid base_url"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
