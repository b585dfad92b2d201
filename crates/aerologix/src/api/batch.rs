//! Multi-item operations with partial-failure reporting.
//!
//! Each item is attempted once, in order. A failure does not stop the batch;
//! it is collected so the caller can report exactly which items were left.

use std::future::Future;

use tracing::warn;

use super::{ApiError, Result};

/// Result of running an operation over several ids.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Ids whose operation succeeded.
    pub succeeded: Vec<String>,
    /// Ids whose operation failed, with the error.
    pub failed: Vec<(String, ApiError)>,
}

impl BatchOutcome {
    /// Number of ids attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// True when every id succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// One-line summary followed by one line per failure.
    #[must_use]
    pub fn summary(&self, verb: &str) -> String {
        let mut out = format!(
            "{verb} {} of {} item(s)",
            self.succeeded.len(),
            self.attempted()
        );
        if !self.failed.is_empty() {
            out.push_str(&format!("; {} failed:", self.failed.len()));
            for (id, err) in &self.failed {
                out.push_str(&format!("\n  {id}: {}", err.user_message()));
            }
        }
        out
    }
}

/// Run `op` for every id, sequentially, collecting successes and failures.
pub async fn run_batch<F, Fut>(ids: &[String], mut op: F) -> BatchOutcome
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut outcome = BatchOutcome::default();
    for id in ids {
        match op(id.clone()).await {
            Ok(()) => outcome.succeeded.push(id.clone()),
            Err(err) => {
                warn!("Batch item {} failed: {}", id, err);
                outcome.failed.push((id.clone(), err));
            }
        }
    }
    outcome
}
