// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resiliency building blocks for pipeline steps.
//!
//! * [`CircuitBreaker`] - per-name failure tracking state machine
//! * [`notify_recover`] with [`Backoff`] schedules - retry driver
//! * [`Policy`] - composes timeout, breaker and retry in a fixed order
//!
//! Wrapped work is expressed as an [`Attempt`] over borrowed state rather than a closure,
//! so every retry can reborrow the same `&mut` state (a pipeline's data bag) without
//! moving it into a `'static` future.

use crate::errors::ActionError;
use async_trait::async_trait;

mod circuit_breaker;
mod policy;
mod retry;
mod trip;

pub use circuit_breaker::{BreakerSettings, CircuitBreaker, Counts, State, DEFAULT_OPEN_TIMEOUT};
pub use policy::{Policy, Stage};
pub use retry::{
    notify_recover, Backoff, ConstantBackoff, ExponentialBackoff, MaxRetries, RetryConfig,
    RetryPolicy,
};
pub use trip::{TripPredicate, DEFAULT_TRIP_EXPRESSION};

/// One execution of a unit of work against mutable state `S`.
#[async_trait]
pub trait Attempt<S: Send + ?Sized>: Send + Sync {
    type Output: Send;

    async fn attempt(&self, state: &mut S) -> Result<Self::Output, ActionError>;
}
