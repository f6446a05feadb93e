// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Named circuit breaker.
//!
//! ```text
//!            trip predicate true
//!   Closed ──────────────────────▶ Open
//!     ▲                             │ timeout elapsed
//!     │ maxRequests trial successes ▼
//!     └────────────────────────── HalfOpen ──▶ Open (any trial failure)
//! ```
//!
//! Counters belong to a generation. A generation ends on every state change and,
//! while Closed, every `interval`. Results of requests admitted in an older
//! generation are discarded.

use super::trip::TripPredicate;
use crate::errors::ActionError;
use crate::observability::messages::resilience::CircuitStateChanged;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Closed,
    HalfOpen,
    Open,
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            State::Closed => "closed",
            State::HalfOpen => "half-open",
            State::Open => "open",
        };
        f.write_str(text)
    }
}

/// Rolling request counters for the current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }
}

#[derive(Debug, Clone)]
pub struct BreakerSettings {
    pub name: String,
    /// HalfOpen trial budget. Zero is treated as one.
    pub max_requests: u32,
    /// Closed-state counter reset period. Zero never resets.
    pub interval: Duration,
    /// How long the breaker stays Open before admitting trials.
    pub timeout: Duration,
    pub trip: TripPredicate,
}

impl BreakerSettings {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_requests: 1,
            interval: Duration::ZERO,
            timeout: DEFAULT_OPEN_TIMEOUT,
            trip: TripPredicate::default(),
        }
    }
}

#[derive(Debug)]
struct Window {
    state: State,
    generation: u64,
    counts: Counts,
    expiry: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    settings: BreakerSettings,
    window: Mutex<Window>,
}

impl CircuitBreaker {
    pub fn new(mut settings: BreakerSettings) -> Self {
        settings.max_requests = settings.max_requests.max(1);
        let expiry = closed_expiry(&settings, Instant::now());
        Self {
            settings,
            window: Mutex::new(Window {
                state: State::Closed,
                generation: 0,
                counts: Counts::default(),
                expiry,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    pub fn state(&self) -> State {
        let mut window = self.lock();
        self.refresh(&mut window, Instant::now());
        window.state
    }

    pub fn counts(&self) -> Counts {
        self.lock().counts
    }

    /// Run `operation` under the breaker.
    ///
    /// When the breaker is Open, or HalfOpen with its trial budget spent, the
    /// operation is never polled and `ActionError::CircuitOpen` is returned.
    /// A `Stop` outcome is recorded as a success. If the returned future is dropped
    /// before `operation` resolves, the request is recorded as a failure.
    pub async fn execute<F, T>(&self, operation: F) -> Result<T, ActionError>
    where
        F: Future<Output = Result<T, ActionError>>,
    {
        let admission = Admission {
            breaker: self,
            generation: self.before_request()?,
            settled: false,
        };
        let result = operation.await;
        let success = match &result {
            Ok(_) => true,
            Err(error) => error.is_stop(),
        };
        admission.settle(success);
        result
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn before_request(&self) -> Result<u64, ActionError> {
        let mut window = self.lock();
        self.refresh(&mut window, Instant::now());

        let admitted = match window.state {
            State::Open => false,
            State::HalfOpen => window.counts.requests < self.settings.max_requests,
            State::Closed => true,
        };
        if !admitted {
            return Err(ActionError::CircuitOpen {
                name: self.settings.name.clone(),
            });
        }

        window.counts.on_request();
        Ok(window.generation)
    }

    fn after_request(&self, generation: u64, success: bool) {
        let now = Instant::now();
        let mut window = self.lock();
        self.refresh(&mut window, now);
        if window.generation != generation {
            return;
        }

        if success {
            window.counts.on_success();
            if window.state == State::HalfOpen
                && window.counts.consecutive_successes >= self.settings.max_requests
            {
                self.transition(&mut window, State::Closed, now);
            }
        } else {
            window.counts.on_failure();
            match window.state {
                State::Closed if self.settings.trip.evaluate(&window.counts) => {
                    self.transition(&mut window, State::Open, now);
                }
                State::HalfOpen => self.transition(&mut window, State::Open, now),
                _ => {}
            }
        }
    }

    /// Apply time-driven changes: Closed interval rollover and Open timeout expiry.
    fn refresh(&self, window: &mut Window, now: Instant) {
        match window.state {
            State::Closed => {
                if window.expiry.is_some_and(|expiry| expiry <= now) {
                    self.new_generation(window, now);
                }
            }
            State::Open => {
                if window.expiry.is_some_and(|expiry| expiry <= now) {
                    self.transition(window, State::HalfOpen, now);
                }
            }
            State::HalfOpen => {}
        }
    }

    fn transition(&self, window: &mut Window, to: State, now: Instant) {
        if window.state == to {
            return;
        }
        let from = window.state;
        window.state = to;
        self.new_generation(window, now);

        CircuitStateChanged {
            breaker: &self.settings.name,
            from: &from.to_string(),
            to: &to.to_string(),
        }
        .log();
    }

    fn new_generation(&self, window: &mut Window, now: Instant) {
        window.generation = window.generation.wrapping_add(1);
        window.counts = Counts::default();
        window.expiry = match window.state {
            State::Closed => closed_expiry(&self.settings, now),
            State::Open => Some(now + self.settings.timeout),
            State::HalfOpen => None,
        };
    }
}

/// A request admitted by [`CircuitBreaker::before_request`].
/// Dropped unsettled, it counts as a failure.
struct Admission<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Admission<'_> {
    fn settle(mut self, success: bool) {
        self.settled = true;
        self.breaker.after_request(self.generation, success);
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.after_request(self.generation, false);
        }
    }
}

fn closed_expiry(settings: &BreakerSettings, now: Instant) -> Option<Instant> {
    (!settings.interval.is_zero()).then(|| now + settings.interval)
}
