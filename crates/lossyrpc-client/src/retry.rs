use lossyrpc_common::protocol::error::{LossyrpcError, Result};
use std::time::{Duration, Instant};

/// Default cap on send attempts per call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Bound on how often a stub resends a request the transport dropped.
///
/// Every simulated drop already costs one transport timeout, so no extra
/// backoff is applied between attempts.
///
/// # Example
///
/// ```
/// use lossyrpc_client::RetryConfig;
/// use std::time::Duration;
///
/// let retry = RetryConfig::default().with_deadline(Duration::from_secs(2));
/// assert_eq!(retry.max_attempts, Some(16));
/// assert!(retry.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of send attempts, `None` for no cap
    ///
    /// Default: 16
    pub max_attempts: Option<u32>,
    /// Wall-clock budget for all attempts of one call, `None` for no limit
    ///
    /// Default: none
    pub deadline: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            deadline: None,
        }
    }
}

impl RetryConfig {
    /// Resends until the transport delivers, however long that takes.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            deadline: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.max_attempts.is_some() || self.deadline.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == Some(0) {
            return Err(LossyrpcError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.deadline.is_some_and(|d| d.is_zero()) {
            return Err(LossyrpcError::Config(
                "deadline must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether another attempt is allowed after `attempts` have been made
    /// since `started`.
    pub(crate) fn allows(&self, attempts: u32, started: Instant) -> bool {
        if self.max_attempts.is_some_and(|max| attempts >= max) {
            return false;
        }
        if self.deadline.is_some_and(|d| started.elapsed() >= d) {
            return false;
        }
        true
    }
}
