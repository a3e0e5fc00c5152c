//! Fallback guard for degraded store reads.
//!
//! Wraps a primary store call. If the call fails or does not finish within
//! the guard's timeout, the fallback result is returned instead of the
//! failure. Only the caller's own-record reads are guarded. Writes are not,
//! because a swallowed write failure would hide data loss.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Substitutes a safe result when a primary call fails or hangs.
#[derive(Debug, Clone, Copy)]
pub struct FallbackGuard {
    timeout: Duration,
}

impl FallbackGuard {
    /// Create a guard that gives the primary call at most `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run `primary`, falling back to `fallback` on error or timeout.
    ///
    /// `operation` names the call in the warning logged when the fallback
    /// is taken.
    ///
    /// # Errors
    ///
    /// Returns whatever `fallback` returns when the primary call fails.
    pub async fn with_fallback<T, E, P, F>(
        &self,
        operation: &'static str,
        primary: P,
        fallback: F,
    ) -> Result<T, E>
    where
        P: Future<Output = Result<T, E>>,
        F: FnOnce() -> Result<T, E>,
        E: Display,
    {
        match tokio::time::timeout(self.timeout, primary).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(operation, error = %e, "Primary call failed, using fallback");
                fallback()
            }
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "Primary call timed out, using fallback"
                );
                fallback()
            }
        }
    }
}
