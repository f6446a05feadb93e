// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Run-time failure taxonomy shared by actions, resiliency policies and the pipeline executor.
//!
//! Classification drives the retry engine: `Stop`, `Permanent`, `NotFound` and `Cancelled`
//! are never retried. `Permanent` is only a marker and is stripped with [`ActionError::into_inner`]
//! before a failure leaves the resiliency wrapper.

use std::fmt::{Debug, Display};
use std::time::Duration;
use thiserror::Error;

use super::MeshError;

#[derive(Error, Debug)]
pub enum ActionError {
    /// Intentional short-circuit of a pipeline run. Not a failure.
    #[error("pipeline stopped")]
    Stop,

    /// Non-retriable wrapper around another failure.
    #[error("{0}")]
    Permanent(Box<ActionError>),

    /// The requested entity does not exist; retrying cannot help.
    #[error("not_found: {0}")]
    NotFound(String),

    /// Raised only by an Open (or saturated HalfOpen) circuit breaker.
    #[error("circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl ActionError {
    /// Wrap an arbitrary message as an action failure.
    pub fn failed<M>(message: M) -> Self
    where
        M: Display + Debug + Send + Sync + 'static,
    {
        Self::Failed(anyhow::Error::msg(message))
    }

    /// Mark this failure as non-retriable. Already-permanent failures are not double wrapped.
    pub fn permanent(self) -> Self {
        match self {
            permanent @ Self::Permanent(_) => permanent,
            other => Self::Permanent(Box::new(other)),
        }
    }

    /// The underlying failure with every `Permanent` layer removed.
    pub fn cause(&self) -> &ActionError {
        let mut current = self;
        while let Self::Permanent(inner) = current {
            current = inner;
        }
        current
    }

    pub fn into_inner(self) -> Self {
        match self {
            Self::Permanent(inner) => inner.into_inner(),
            other => other,
        }
    }

    pub fn is_stop(&self) -> bool {
        matches!(self.cause(), Self::Stop)
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self.cause(), Self::CircuitOpen { .. })
    }

    pub fn is_retriable(&self) -> bool {
        !matches!(
            self,
            Self::Stop | Self::Permanent(_) | Self::NotFound(_) | Self::Cancelled
        )
    }
}
