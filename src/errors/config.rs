// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Construction-time errors. None of these are raised once a runtime has been built.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unregistered action {0:?}")]
    UnregisteredAction(String),

    /// A step references a timeout, retry or circuit breaker that was never declared.
    #[error("{kind} policy {name:?} is not defined")]
    PolicyNotDefined { kind: &'static str, name: String },

    #[error("invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: String },

    #[error("invalid trip expression {expression:?}: {reason}")]
    InvalidTripExpression { expression: String, reason: String },

    #[error("unexpected back off policy type: {0}")]
    InvalidRetryPolicy(String),

    #[error("invalid configuration for action {action:?}: {reason}")]
    InvalidActionConfig { action: String, reason: String },

    #[error("could not load pipeline {name:?}: {source}")]
    Pipeline {
        name: String,
        source: Box<ConfigError>,
    },

    #[error("pipeline {target:?} referenced by {referenced_by:?} does not exist")]
    UnknownPipeline {
        target: String,
        referenced_by: String,
    },

    #[error("pipeline alias {0:?} refers back to itself")]
    AliasCycle(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {format} config: {reason}")]
    Parse { format: &'static str, reason: String },

    #[error("unsupported config format {0:?} (expected .yaml, .yml, .toml or .json)")]
    UnsupportedFormat(String),

    #[error("halting due to {} unsatisfied import(s): {}", .0.len(), .0.join(", "))]
    UnsatisfiedImports(Vec<String>),
}
