// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod duration;
mod loader;
mod policies;
mod registry;
mod runtime;

#[cfg(test)]
mod integration_tests;

pub use duration::{parse_duration, ConfigDuration};
pub use loader::{
    expand_env, load_config, load_configs, parse_config, BusConfig, CircuitBreakerConfig,
    NamespacesConfig, Operations, PipelineConfig, ResiliencyConfig, RetryPolicyConfig, StepConfig,
};
pub use policies::ResiliencyPolicies;
pub use registry::ActionRegistry;
pub use runtime::RuntimeBuilder;
