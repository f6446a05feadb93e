// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Composition of resiliency stages around a single attempt.
//!
//! Nesting is fixed: timeout innermost, circuit breaker around it, retry outermost.
//! [`Policy::stages`] reports the configured stages in that order.

use super::circuit_breaker::CircuitBreaker;
use super::retry::{notify_recover, RetryConfig};
use super::Attempt;
use crate::errors::ActionError;
use crate::observability::messages::resilience::{RetryNotified, RetryRecovered};
use crate::observability::messages::StructuredLog;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub enum Stage<'a> {
    Timeout(Duration),
    CircuitBreaker(&'a CircuitBreaker),
    Retry(&'a RetryConfig),
}

#[derive(Debug, Clone, Default)]
pub struct Policy {
    name: String,
    timeout: Option<Duration>,
    breaker: Option<Arc<CircuitBreaker>>,
    retry: Option<RetryConfig>,
}

impl Policy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> Vec<Stage<'_>> {
        let mut stages = Vec::with_capacity(3);
        if let Some(timeout) = self.timeout {
            stages.push(Stage::Timeout(timeout));
        }
        if let Some(breaker) = &self.breaker {
            stages.push(Stage::CircuitBreaker(breaker));
        }
        if let Some(retry) = &self.retry {
            stages.push(Stage::Retry(retry));
        }
        stages
    }

    /// Run `operation` against `state` under every configured stage.
    ///
    /// Without a retry stage the operation runs exactly once. Failures leave with any
    /// `Permanent` marker stripped.
    pub async fn execute<S, A>(
        &self,
        cancel: &CancellationToken,
        state: &mut S,
        operation: &A,
    ) -> Result<A::Output, ActionError>
    where
        S: Send + ?Sized,
        A: Attempt<S> + ?Sized,
    {
        let guarded = Guarded {
            policy: self,
            cancel,
            inner: operation,
        };

        let Some(retry) = &self.retry else {
            return guarded.attempt(state).await.map_err(ActionError::into_inner);
        };

        let mut backoff = retry.new_backoff();
        notify_recover(
            cancel,
            state,
            &guarded,
            backoff.as_mut(),
            |error, delay| {
                RetryNotified {
                    policy: &self.name,
                    error: &error.to_string(),
                    delay,
                }
                .log()
            },
            || RetryRecovered { policy: &self.name }.log(),
        )
        .await
    }
}

/// The stages below retry: timeout, then circuit breaker.
struct Guarded<'a, A: ?Sized> {
    policy: &'a Policy,
    cancel: &'a CancellationToken,
    inner: &'a A,
}

#[async_trait]
impl<'a, S, A> Attempt<S> for Guarded<'a, A>
where
    S: Send + ?Sized,
    A: Attempt<S> + ?Sized,
{
    type Output = A::Output;

    async fn attempt(&self, state: &mut S) -> Result<A::Output, ActionError> {
        let timed = async {
            let call = self.inner.attempt(state);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(ActionError::Cancelled),
                result = bounded(self.policy.timeout, call) => result,
            }
        };

        match &self.policy.breaker {
            None => timed.await,
            Some(breaker) => breaker.execute(timed).await.map_err(|error| {
                if self.policy.retry.is_some() && error.is_circuit_open() {
                    error.permanent()
                } else {
                    error
                }
            }),
        }
    }
}

async fn bounded<F, T>(timeout: Option<Duration>, call: F) -> Result<T, ActionError>
where
    F: std::future::Future<Output = Result<T, ActionError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(ActionError::Timeout(limit))),
        None => call.await,
    }
}
