// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for retry and circuit breaker events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// First failure of a failing streak under a retry policy.
///
/// # Log Level
/// `warn!` - Degraded but recovering
///
/// # Example
/// ```
/// use the_conduit::observability::messages::resilience::RetryNotified;
/// use std::time::Duration;
///
/// let msg = RetryNotified {
///     policy: "lookup",
///     error: "timed out",
///     delay: Duration::from_millis(250),
/// };
///
/// assert!(msg.to_string().contains("lookup"));
/// ```
pub struct RetryNotified<'a> {
    pub policy: &'a str,
    pub error: &'a str,
    pub delay: Duration,
}

impl Display for RetryNotified<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Policy '{}' failed, retrying in {:?}: {}",
            self.policy, self.delay, self.error
        )
    }
}

impl StructuredLog for RetryNotified<'_> {
    fn log(&self) {
        tracing::warn!(
            policy = self.policy,
            error = self.error,
            delay_ms = self.delay.as_millis() as u64,
            "{}", self
        );
    }
}

/// An operation succeeded after at least one notified failure.
///
/// # Log Level
/// `info!` - Recovery
pub struct RetryRecovered<'a> {
    pub policy: &'a str,
}

impl Display for RetryRecovered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Policy '{}' recovered", self.policy)
    }
}

impl StructuredLog for RetryRecovered<'_> {
    fn log(&self) {
        tracing::info!(policy = self.policy, "{}", self);
    }
}

/// A circuit breaker moved between states.
///
/// # Log Level
/// `info!` - State transition
pub struct CircuitStateChanged<'a> {
    pub breaker: &'a str,
    pub from: &'a str,
    pub to: &'a str,
}

impl Display for CircuitStateChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Circuit breaker '{}' changed from {} to {}",
            self.breaker, self.from, self.to
        )
    }
}

impl StructuredLog for CircuitStateChanged<'_> {
    fn log(&self) {
        tracing::info!(
            breaker = self.breaker,
            from = self.from,
            to = self.to,
            "{}", self
        );
    }
}
