//! Deadlines for external calls.
//!
//! Every call to an external collaborator runs under a short deadline.
//! `best_effort` is for steps whose failure must not stop the enclosing
//! operation; `with_deadline` is for steps whose failure must propagate.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::ports::{ExtractionError, PlatformError, StoreError};

/// A call did not finish before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{step} timed out after {after:?}")]
pub struct DeadlineExceeded {
    pub step: &'static str,
    pub after: Duration,
}

/// Runs `fut` under `deadline`, mapping a timeout into the call's error type.
pub async fn with_deadline<T, E, F>(step: &'static str, deadline: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DeadlineExceeded>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(DeadlineExceeded {
            step,
            after: deadline,
        }
        .into()),
    }
}

/// Runs a step whose failure is logged and swallowed.
///
/// Returns `None` on error or timeout.
pub async fn best_effort<T, E, F>(step: &'static str, deadline: Duration, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display + From<DeadlineExceeded>,
{
    match with_deadline(step, deadline, fut).await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(step, error = %e, "best-effort step failed");
            None
        }
    }
}

impl From<DeadlineExceeded> for StoreError {
    fn from(e: DeadlineExceeded) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<DeadlineExceeded> for PlatformError {
    fn from(_: DeadlineExceeded) -> Self {
        PlatformError::Timeout
    }
}

impl From<DeadlineExceeded> for ExtractionError {
    fn from(e: DeadlineExceeded) -> Self {
        ExtractionError::Timeout {
            timeout_secs: e.after.as_secs(),
        }
    }
}
