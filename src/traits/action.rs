// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::engine::{Context, DataBag};
use crate::errors::{ActionError, ConfigError};
use crate::mesh::Mesh;

/// A single named unit of work performed by a pipeline step.
///
/// Returning `Ok(None)` means the step produced no output; the run's previous
/// output is kept. Returning `Err(ActionError::Stop)` ends the run early without failing it.
#[async_trait]
pub trait Action: Send + Sync {
    async fn execute(&self, ctx: &Context, data: &mut DataBag)
        -> Result<Option<Value>, ActionError>;
}

/// Collaborators an action may need at construction time.
#[derive(Clone, Default)]
pub struct Dependencies {
    pub mesh: Option<Arc<Mesh>>,
}

impl Dependencies {
    pub fn with_mesh(mesh: Arc<Mesh>) -> Self {
        Self { mesh: Some(mesh) }
    }
}

/// Builds an action from the step's `with` settings.
pub trait ActionFactory: Send + Sync {
    fn create(&self, with: &Value, deps: &Dependencies) -> Result<Arc<dyn Action>, ConfigError>;
}

impl<F> ActionFactory for F
where
    F: Fn(&Value, &Dependencies) -> Result<Arc<dyn Action>, ConfigError> + Send + Sync,
{
    fn create(&self, with: &Value, deps: &Dependencies) -> Result<Arc<dyn Action>, ConfigError> {
        self(with, deps)
    }
}
