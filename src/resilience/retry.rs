// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Backoff schedules and the retry driver.
//!
//! [`notify_recover`] repeats an [`Attempt`] until it succeeds, fails with a
//! non-retriable error, exhausts its [`Backoff`], or the driving cancellation token fires.
//! The failure callback runs once per failing streak and the recovery callback runs once
//! when that streak ends in success.

use super::Attempt;
use crate::errors::{ActionError, ConfigError};
use rand::Rng;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    #[default]
    Constant,
    Exponential,
}

impl FromStr for RetryPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "constant" => Ok(RetryPolicy::Constant),
            "exponential" => Ok(RetryPolicy::Exponential),
            _ => Err(ConfigError::InvalidRetryPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub policy: RetryPolicy,
    /// Fixed delay of the constant policy.
    pub duration: Duration,
    pub initial_interval: Duration,
    pub randomization_factor: f64,
    pub multiplier: f64,
    pub max_interval: Duration,
    /// Zero means the exponential schedule never gives up on elapsed time.
    pub max_elapsed_time: Duration,
    /// Negative means unbounded.
    pub max_retries: i64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::Constant,
            duration: Duration::from_secs(5),
            initial_interval: Duration::from_millis(500),
            randomization_factor: 0.5,
            multiplier: 1.5,
            max_interval: Duration::from_secs(60),
            max_elapsed_time: Duration::from_secs(15 * 60),
            max_retries: -1,
        }
    }
}

impl RetryConfig {
    /// A fresh schedule. Backoffs are stateful, so every retried operation gets its own.
    pub fn new_backoff(&self) -> Box<dyn Backoff> {
        let schedule: Box<dyn Backoff> = match self.policy {
            RetryPolicy::Constant => Box::new(ConstantBackoff::new(self.duration)),
            RetryPolicy::Exponential => Box::new(ExponentialBackoff {
                initial_interval: self.initial_interval,
                randomization_factor: self.randomization_factor,
                multiplier: self.multiplier,
                max_interval: self.max_interval,
                max_elapsed_time: self.max_elapsed_time,
                current_interval: self.initial_interval,
                started: Instant::now(),
            }),
        };

        match u64::try_from(self.max_retries) {
            Ok(max) => Box::new(MaxRetries::new(schedule, max)),
            Err(_) => schedule,
        }
    }
}

/// A delay schedule. `None` means give up.
pub trait Backoff: Send {
    fn next_backoff(&mut self) -> Option<Duration>;

    fn reset(&mut self);
}

#[derive(Debug, Clone)]
pub struct ConstantBackoff {
    interval: Duration,
}

impl ConstantBackoff {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Backoff for ConstantBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        Some(self.interval)
    }

    fn reset(&mut self) {}
}

#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    randomization_factor: f64,
    multiplier: f64,
    max_interval: Duration,
    max_elapsed_time: Duration,
    current_interval: Duration,
    started: Instant,
}

impl ExponentialBackoff {
    fn randomized(&self) -> Duration {
        let factor = if self.randomization_factor.is_finite() {
            self.randomization_factor.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let current = self.current_interval.as_nanos() as f64;
        let delta = factor * current;
        if delta <= 0.0 {
            return self.current_interval;
        }
        let low = (current - delta).max(0.0);
        let high = current + delta;
        Duration::from_nanos(rand::thread_rng().gen_range(low..=high) as u64)
    }

    fn grow(&mut self) {
        if !self.multiplier.is_finite() {
            self.current_interval = self.max_interval;
            return;
        }
        let next = self.current_interval.as_nanos() as f64 * self.multiplier.max(1.0);
        self.current_interval = if next >= self.max_interval.as_nanos() as f64 {
            self.max_interval
        } else {
            Duration::from_nanos(next as u64)
        };
    }
}

impl Backoff for ExponentialBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        let elapsed = self.started.elapsed();
        let next = self.randomized();
        self.grow();

        if !self.max_elapsed_time.is_zero() && elapsed + next > self.max_elapsed_time {
            return None;
        }
        Some(next)
    }

    fn reset(&mut self) {
        self.current_interval = self.initial_interval;
        self.started = Instant::now();
    }
}

/// Caps another schedule at a fixed number of retries.
pub struct MaxRetries {
    inner: Box<dyn Backoff>,
    max: u64,
    tries: u64,
}

impl MaxRetries {
    pub fn new(inner: Box<dyn Backoff>, max: u64) -> Self {
        Self { inner, max, tries: 0 }
    }
}

impl Backoff for MaxRetries {
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.tries >= self.max {
            return None;
        }
        self.tries += 1;
        self.inner.next_backoff()
    }

    fn reset(&mut self) {
        self.tries = 0;
        self.inner.reset();
    }
}

/// Drive `operation` against `state` until it resolves.
///
/// Non-retriable failures are returned with their `Permanent` marker stripped. When the
/// schedule is exhausted the last failure is returned. Cancellation during a backoff delay
/// returns `ActionError::Cancelled` immediately.
pub async fn notify_recover<S, A, N, R>(
    cancel: &CancellationToken,
    state: &mut S,
    operation: &A,
    backoff: &mut dyn Backoff,
    mut notify: N,
    mut recovered: R,
) -> Result<A::Output, ActionError>
where
    S: Send + ?Sized,
    A: Attempt<S> + ?Sized,
    N: FnMut(&ActionError, Duration),
    R: FnMut(),
{
    let mut notified = false;
    backoff.reset();

    loop {
        let error = match operation.attempt(state).await {
            Ok(output) => {
                if notified {
                    recovered();
                }
                return Ok(output);
            }
            Err(error) => error,
        };

        if !error.is_retriable() {
            return Err(error.into_inner());
        }

        let Some(delay) = backoff.next_backoff() else {
            if cancel.is_cancelled() {
                return Err(ActionError::Cancelled);
            }
            return Err(error);
        };

        if !notified {
            notify(&error, delay);
            notified = true;
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(ActionError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
