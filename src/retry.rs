//! Bounded retry of transport operations.
//!
//! The RS485 link to the controllers picks up enough noise that single exchanges regularly fail
//! with CRC errors or timeouts. Every transaction the driver issues goes through [`retry`].

use embedded_hal::delay::DelayNs;
use fugit::MillisDurationU32;

use crate::error::{Error, Result};

/// How many times a transaction is attempted and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u8,
    delay: MillisDurationU32,
}

impl Default for RetryPolicy {
    /// 5 attempts, 200ms apart.
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u8 = 5;
    pub const DEFAULT_DELAY: MillisDurationU32 = MillisDurationU32::millis(200);

    /// Create a policy of `max_attempts` total attempts with a fixed `delay` between them.
    ///
    /// A `max_attempts` of 0 is treated as 1.
    pub const fn new(max_attempts: u8, delay: MillisDurationU32) -> Self {
        let max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        Self {
            max_attempts,
            delay,
        }
    }

    /// Single attempt, no retries.
    pub const fn no_retry() -> Self {
        Self::new(1, MillisDurationU32::millis(0))
    }

    /// Total number of attempts, including the first one.
    pub const fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    /// Delay between two attempts.
    pub const fn delay(&self) -> MillisDurationU32 {
        self.delay
    }
}

/// Run `operation` until it succeeds or `policy` runs out of attempts.
///
/// Attempts are strictly sequential with the policy's delay between them; there is no delay after
/// the final attempt. When every attempt fails the error of the last one is returned inside
/// [`Error::Transaction`].
pub fn retry<T, E, D>(
    policy: &RetryPolicy,
    delay: &mut D,
    mut operation: impl FnMut() -> core::result::Result<T, E>,
) -> Result<T, E>
where
    E: core::fmt::Debug,
    D: DelayNs,
{
    let mut attempt: u8 = 1;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(cause) if attempt >= policy.max_attempts => {
                log::warn!("transaction failed after {} attempt(s): {:?}", attempt, cause);
                return Err(Error::Transaction {
                    attempts: attempt,
                    cause,
                });
            }
            Err(cause) => {
                log::warn!(
                    "attempt {}/{} failed, retrying: {:?}",
                    attempt,
                    policy.max_attempts,
                    cause
                );
                delay.delay_ms(policy.delay.to_millis());
                attempt += 1;
            }
        }
    }
}

/// [`DelayNs`] backed by [`std::thread::sleep`].
#[cfg(not(feature = "no_std"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

#[cfg(not(feature = "no_std"))]
impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
