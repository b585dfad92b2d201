//! Client for the AeroLogix backend REST API.
//!
//! The backend owns all persistence and business rules. This module only
//! shapes outbound requests and maps failed responses into [`ApiError`]
//! values carrying the backend's `detail` message.

pub mod batch;
pub mod types;

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::maintenance::settings::{ComponentSettings, EltSettings};
use crate::maintenance::{report, ComponentStatus};
use crate::session::{FlightCandidate, SubmissionFlow};

pub use batch::{run_batch, BatchOutcome};
pub use types::{FlightCandidateRequest, PilotFlightRequest};

/// Errors returned by backend requests.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401: the token is missing, invalid or expired.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Backend detail message.
        message: String,
    },

    /// 403: the account may not perform this action.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Backend detail message.
        message: String,
    },

    /// 404: the resource does not exist or is not owned by the user.
    #[error("not found: {message}")]
    NotFound {
        /// Backend detail message.
        message: String,
    },

    /// 400 or 422: the request body was rejected.
    #[error("validation failed ({status}): {message}")]
    Validation {
        /// HTTP status code.
        status: u16,
        /// Backend detail message.
        message: String,
    },

    /// 5xx: the backend failed.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Backend detail message.
        message: String,
    },

    /// Any other non-success status.
    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Backend detail message.
        message: String,
    },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The configured base URL cannot carry API paths.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Build an error from a non-success status and its response body.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = detail_message(body).unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });

        match status {
            401 => Self::Unauthorized { message },
            403 => Self::Forbidden { message },
            404 => Self::NotFound { message },
            400 | 422 => Self::Validation { status, message },
            500..=599 => Self::Server { status, message },
            _ => Self::UnexpectedStatus { status, message },
        }
    }

    /// The HTTP status, when the backend answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Validation { status, .. }
            | Self::Server { status, .. }
            | Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            Self::InvalidUrl(_) => None,
        }
    }

    /// Check if this is a 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Text to show the user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized { .. } => {
                "Your session has expired. Please log in again.".to_string()
            }
            Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::Validation { message, .. } => message.clone(),
            Self::Server { .. } => {
                "The server encountered an error. Please try again later.".to_string()
            }
            Self::UnexpectedStatus { status, message } => {
                format!("Request failed ({status}): {message}")
            }
            Self::Network(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            Self::InvalidUrl(url) => format!("The configured API address is invalid: {url}"),
        }
    }
}

/// Extract the `detail` field of a backend error body.
///
/// Validation failures carry a list of `{ "msg": ... }` objects instead of a
/// string; their messages are joined.
fn detail_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Sends a finished flight session to the backend.
///
/// Implementations issue exactly one request per call and never retry.
#[async_trait::async_trait]
pub trait FlightSubmitter: Send + Sync {
    /// Submit the candidate.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the candidate or cannot be reached.
    async fn submit(&self, candidate: &FlightCandidate) -> Result<()>;
}

/// HTTP client for the backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl ApiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url =
            Url::parse(&config.base_url).map_err(|_| ApiError::InvalidUrl(config.base_url.clone()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("aerologix/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            auth_token: config.auth_token.clone(),
        })
    }

    /// The base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve path segments against the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        let builder = self.http.request(method, url);
        Ok(match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Build the submission request for a candidate without sending it.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL or body cannot be built.
    pub fn submission_request(&self, candidate: &FlightCandidate) -> Result<reqwest::Request> {
        let builder = match &candidate.flow {
            SubmissionFlow::Owner => self
                .request(
                    Method::POST,
                    &["api", "aircraft", &candidate.aircraft_id, "flight-candidates"],
                )?
                .json(&FlightCandidateRequest::from(candidate)),
            SubmissionFlow::PilotInvite { token } => self
                .request(Method::POST, &["api", "pilot-invites", "submit-flight", token])?
                .json(&PilotFlightRequest::from(candidate)),
        };
        Ok(builder.build()?)
    }

    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        debug!("{} {}", request.method(), request.url());
        let response = self.http.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status.as_u16(), &body))
    }

    /// Fetch the maintenance settings of an aircraft.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not JSON.
    pub async fn component_settings(&self, aircraft_id: &str) -> Result<ComponentSettings> {
        let request = self
            .request(Method::GET, &["api", "components", "aircraft", aircraft_id])?
            .build()?;
        let settings = self.execute(request).await?.json().await?;
        Ok(settings)
    }

    /// Fetch the ELT record of an aircraft, or `None` if it has none.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than a 404.
    pub async fn elt_settings(&self, aircraft_id: &str) -> Result<Option<EltSettings>> {
        let request = self
            .request(Method::GET, &["api", "elt", "aircraft", aircraft_id])?
            .build()?;
        match self.execute(request).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(err) if err.is_not_found() => {
                debug!("No ELT record for aircraft {}", aircraft_id);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Fetch an aircraft's settings and compute its maintenance report.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`](crate::Error::Api) if either settings request
    /// fails.
    pub async fn maintenance_report(
        &self,
        aircraft_id: &str,
        today: NaiveDate,
    ) -> crate::Result<Vec<ComponentStatus>> {
        let settings = self.component_settings(aircraft_id).await?;
        let elt = self.elt_settings(aircraft_id).await?;
        Ok(report(&settings, elt.as_ref(), today))
    }

    /// Delete an aircraft.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses or cannot be reached.
    pub async fn delete_aircraft(&self, aircraft_id: &str) -> Result<()> {
        let request = self
            .request(Method::DELETE, &["api", "aircraft", aircraft_id])?
            .build()?;
        self.execute(request).await?;
        info!("Deleted aircraft {}", aircraft_id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl FlightSubmitter for ApiClient {
    async fn submit(&self, candidate: &FlightCandidate) -> Result<()> {
        let request = self.submission_request(candidate)?;
        self.execute(request).await?;
        info!(
            "Submitted {} minute flight for aircraft {} ({})",
            candidate.duration_est_minutes,
            candidate.aircraft_id,
            candidate.flow.as_str()
        );
        Ok(())
    }
}
