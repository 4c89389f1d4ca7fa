use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::error::{LossyrpcError, Result};

/// Default probability of dropping a send when `lossy` is enabled.
pub const DEFAULT_LOSS_RATE: f64 = 0.05;
/// Default injected delay before each write when `delayed` is enabled.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(2);
/// Default read timeout, also the time a simulated drop takes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Fault-injection settings for an [`UnreliableTransport`](super::UnreliableTransport).
///
/// Services and stubs each carry one of these; every connection they open
/// wraps its stream with the same settings.
///
/// # Semantics
///
/// - `lossy` + `loss_rate`: each `send` draws uniformly from `[0, 1)`; a draw
///   below `loss_rate` sleeps for `timeout` and reports the message dropped
/// - `delayed` + `delay`: every delivered `send` sleeps for `delay` first
/// - `timeout`: bound on each `receive`
///
/// # Example
///
/// ```
/// use lossyrpc_common::transport::FaultConfig;
/// use std::time::Duration;
///
/// let faults = FaultConfig::reliable()
///     .with_loss(0.25)
///     .with_delay(5, 500)
///     .with_timeout(100, 0);
///
/// assert!(faults.lossy);
/// assert_eq!(faults.delay, Duration::from_micros(5_500));
/// assert!(faults.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultConfig {
    /// Whether sends may be dropped
    pub lossy: bool,
    /// Probability in `[0, 1]` that a send is dropped
    pub loss_rate: f64,
    /// Whether sends are delayed
    pub delayed: bool,
    /// Delay applied before each delivered send
    pub delay: Duration,
    /// Receive timeout and simulated-drop duration
    pub timeout: Duration,
}

impl FaultConfig {
    /// No loss and no delay, with the default timeout.
    pub fn reliable() -> Self {
        Self {
            lossy: false,
            loss_rate: DEFAULT_LOSS_RATE,
            delayed: false,
            delay: DEFAULT_DELAY,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Enables loss at the given rate.
    pub fn with_loss(mut self, loss_rate: f64) -> Self {
        self.lossy = true;
        self.loss_rate = loss_rate;
        self
    }

    /// Enables a per-send delay of `ms` milliseconds plus `us` microseconds.
    pub fn with_delay(mut self, ms: u64, us: u64) -> Self {
        self.delayed = true;
        self.delay = Duration::from_millis(ms) + Duration::from_micros(us);
        self
    }

    /// Sets the read timeout to `ms` milliseconds plus `us` microseconds.
    pub fn with_timeout(mut self, ms: u64, us: u64) -> Self {
        self.timeout = Duration::from_millis(ms) + Duration::from_micros(us);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.loss_rate.is_finite() || !(0.0..=1.0).contains(&self.loss_rate) {
            return Err(LossyrpcError::Config(format!(
                "loss rate must be within [0, 1], got {}",
                self.loss_rate
            )));
        }
        if self.timeout.is_zero() {
            return Err(LossyrpcError::Config(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self::reliable()
    }
}
