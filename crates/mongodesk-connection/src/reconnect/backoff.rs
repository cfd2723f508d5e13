//! Exponential backoff calculator for dial retries

use std::time::Duration;

/// Exponential backoff strategy for dial retries.
///
/// The delay after failed attempt `n` (zero-based) is
/// `initial * multiplier^n`, capped at the maximum.
///
/// # Example
///
/// ```
/// use mongodesk_connection::reconnect::BackoffStrategy;
/// use std::time::Duration;
///
/// let backoff = BackoffStrategy::new(1_000, 60_000);
///
/// assert_eq!(backoff.calculate_delay(0), Duration::from_millis(1_000));
/// assert_eq!(backoff.calculate_delay(1), Duration::from_millis(2_000));
/// assert!(backoff.calculate_delay(30) <= Duration::from_millis(60_000));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffStrategy {
    /// Delay in milliseconds after the first failed attempt
    initial_ms: u64,
    /// Cap for exponential growth
    max_ms: u64,
    /// Growth factor per attempt (default: 2.0)
    multiplier: f64,
}

impl BackoffStrategy {
    /// Create a new backoff strategy with the given initial and maximum delays.
    ///
    /// # Arguments
    ///
    /// * `initial_ms` - Delay in milliseconds after the first failed attempt
    /// * `max_ms` - Cap in milliseconds for exponential growth; raised to
    ///   `initial_ms` if smaller
    ///
    /// # Example
    ///
    /// ```
    /// use mongodesk_connection::reconnect::BackoffStrategy;
    ///
    /// let backoff = BackoffStrategy::new(500, 10_000);
    /// assert_eq!(backoff.max_delay().as_millis(), 10_000);
    /// ```
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        Self {
            initial_ms,
            max_ms: max_ms.max(initial_ms),
            multiplier: 2.0,
        }
    }

    /// Set the growth factor.
    ///
    /// # Arguments
    ///
    /// * `multiplier` - Factor applied per attempt; values below 1.0 are
    ///   raised to 1.0
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Calculate the delay to wait after a failed attempt.
    ///
    /// Attempt 0 returns the initial delay; later attempts grow by the
    /// multiplier until they reach the maximum.
    ///
    /// # Arguments
    ///
    /// * `attempt` - Zero-based number of the attempt that failed
    ///
    /// # Returns
    ///
    /// Duration to sleep before the next attempt
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = (self.initial_ms as f64) * self.multiplier.powi(exponent);
        Duration::from_millis(delay_ms.min(self.max_ms as f64) as u64)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

impl Default for BackoffStrategy {
    /// One second initial delay, one minute cap, doubling
    fn default() -> Self {
        Self::new(1_000, 60_000)
    }
}
