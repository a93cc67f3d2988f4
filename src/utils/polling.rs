/// Polling utilities for waiting on a remote resource with a deadline
use anyhow::Result;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Raised when the deadline passes before the condition is met
#[derive(Debug, Error)]
#[error("wait duration exceeded after {} seconds: {description}", .timeout.as_secs())]
pub struct PollTimeout {
    pub timeout: Duration,
    pub description: String,
}

/// Configuration for polling operations
pub struct PollingConfig {
    pub timeout: Duration,
    pub interval: Duration,
    pub description: String,
}

impl PollingConfig {
    /// Create a new polling configuration
    pub fn new(timeout: Duration, interval: Duration, description: impl Into<String>) -> Self {
        Self {
            timeout,
            interval,
            description: description.into(),
        }
    }

    /// Poll until the condition yields a value or the timeout passes
    ///
    /// The condition function should return:
    /// - Ok(Some(T)) when the condition is met
    /// - Ok(None) to keep polling
    /// - Err(e) to stop and return the error
    ///
    /// A timeout is reported as a [`PollTimeout`] inside the returned error.
    pub async fn poll<F, Fut, T>(&self, condition: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        info!("{}...", self.description);

        let start = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if let Some(value) = condition().await? {
                info!("✓ {}", self.description);
                return Ok(value);
            }
            debug!("{}: attempt {} not ready", self.description, attempt);

            if start.elapsed() > self.timeout {
                return Err(PollTimeout {
                    timeout: self.timeout,
                    description: self.description.clone(),
                }
                .into());
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
