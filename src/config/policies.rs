// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Named resiliency policies, resolved once at startup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::duration::parse_duration;
use super::loader::{CircuitBreakerConfig, ResiliencyConfig, RetryPolicyConfig, StepConfig};
use crate::errors::ConfigError;
use crate::resilience::{
    BreakerSettings, CircuitBreaker, Policy, RetryConfig, TripPredicate,
};

impl RetryPolicyConfig {
    pub fn to_retry_config(&self) -> Result<RetryConfig, ConfigError> {
        let defaults = RetryConfig::default();
        let randomization_factor = self
            .randomization_factor
            .unwrap_or(defaults.randomization_factor);
        if !(0.0..=1.0).contains(&randomization_factor) {
            return Err(ConfigError::InvalidRetryPolicy(format!(
                "randomizationFactor must be between 0 and 1, found {randomization_factor}"
            )));
        }
        let multiplier = self.multiplier.unwrap_or(defaults.multiplier);
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ConfigError::InvalidRetryPolicy(format!(
                "multiplier must be a finite number of at least 1, found {multiplier}"
            )));
        }

        Ok(RetryConfig {
            policy: match &self.policy {
                Some(policy) => policy.parse()?,
                None => defaults.policy,
            },
            duration: self.duration.map_or(defaults.duration, Duration::from),
            initial_interval: self
                .initial_interval
                .map_or(defaults.initial_interval, Duration::from),
            randomization_factor,
            multiplier,
            max_interval: self.max_interval.map_or(defaults.max_interval, Duration::from),
            max_elapsed_time: self
                .max_elapsed_time
                .map_or(defaults.max_elapsed_time, Duration::from),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
        })
    }
}

impl CircuitBreakerConfig {
    pub fn to_settings(&self, name: &str) -> Result<BreakerSettings, ConfigError> {
        let defaults = BreakerSettings::named(name);
        Ok(BreakerSettings {
            max_requests: self.max_requests.unwrap_or(defaults.max_requests),
            interval: self.interval.map_or(defaults.interval, Duration::from),
            timeout: self.timeout.map_or(defaults.timeout, Duration::from),
            trip: match &self.trip {
                Some(expression) => TripPredicate::parse(expression)?,
                None => defaults.trip.clone(),
            },
            ..defaults
        })
    }
}

/// Process-wide named timeouts, retries and circuit breakers.
///
/// Each named breaker is built once and shared by every step that references it.
#[derive(Debug, Clone, Default)]
pub struct ResiliencyPolicies {
    timeouts: HashMap<String, Duration>,
    retries: HashMap<String, RetryConfig>,
    circuit_breakers: HashMap<String, Arc<CircuitBreaker>>,
}

impl ResiliencyPolicies {
    pub fn from_config(config: &ResiliencyConfig) -> Result<Self, ConfigError> {
        let timeouts = config
            .timeouts
            .iter()
            .map(|(name, duration)| (name.clone(), duration.0))
            .collect();

        let retries = config
            .retries
            .iter()
            .map(|(name, retry)| Ok((name.clone(), retry.to_retry_config()?)))
            .collect::<Result<_, ConfigError>>()?;

        let circuit_breakers = config
            .circuit_breakers
            .iter()
            .map(|(name, breaker)| {
                let settings = breaker.to_settings(name)?;
                Ok((name.clone(), Arc::new(CircuitBreaker::new(settings))))
            })
            .collect::<Result<_, ConfigError>>()?;

        Ok(Self {
            timeouts,
            retries,
            circuit_breakers,
        })
    }

    /// A named timeout, or else `reference` parsed as a literal duration.
    pub fn timeout(&self, reference: &str) -> Result<Duration, ConfigError> {
        if let Some(timeout) = self.timeouts.get(reference) {
            return Ok(*timeout);
        }
        parse_duration(reference).map_err(|_| ConfigError::PolicyNotDefined {
            kind: "timeout",
            name: reference.to_string(),
        })
    }

    pub fn retry(&self, name: &str) -> Result<&RetryConfig, ConfigError> {
        self.retries.get(name).ok_or_else(|| ConfigError::PolicyNotDefined {
            kind: "retry",
            name: name.to_string(),
        })
    }

    pub fn circuit_breaker(&self, name: &str) -> Result<Arc<CircuitBreaker>, ConfigError> {
        self.circuit_breakers
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::PolicyNotDefined {
                kind: "circuit breaker",
                name: name.to_string(),
            })
    }

    /// The composed policy for one step.
    pub fn policy_for(&self, step_name: &str, step: &StepConfig) -> Result<Policy, ConfigError> {
        let mut policy = Policy::new(step_name);
        if let Some(reference) = &step.timeout {
            policy = policy.with_timeout(self.timeout(reference)?);
        }
        if let Some(name) = &step.circuit_breaker {
            policy = policy.with_circuit_breaker(self.circuit_breaker(name)?);
        }
        if let Some(name) = &step.retry {
            policy = policy.with_retry(self.retry(name)?.clone());
        }
        Ok(policy)
    }
}
