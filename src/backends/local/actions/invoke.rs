// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::{decode, DEFAULT_SOURCE};
use crate::engine::{Context, DataBag};
use crate::errors::{ActionError, ConfigError, MeshError};
use crate::mesh::{Mesh, Payload};
use crate::traits::{Action, Dependencies};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvokeConfig {
    pub namespace: String,
    pub operation: String,
    /// Path of the value sent as the request; defaults to the latest output.
    pub from: Option<String>,
}

/// Request-response call through the mesh; the decoded reply is the step output.
pub struct InvokeAction {
    config: InvokeConfig,
    mesh: Arc<Mesh>,
}

impl InvokeAction {
    pub const NAME: &'static str = "invoke";

    pub fn new(config: InvokeConfig, mesh: Arc<Mesh>) -> Self {
        Self { config, mesh }
    }

    pub fn from_settings(with: &Value, deps: &Dependencies) -> Result<Self, ConfigError> {
        let config = decode(Self::NAME, with)?;
        let mesh = deps.mesh.clone().ok_or_else(|| ConfigError::InvalidActionConfig {
            action: Self::NAME.to_string(),
            reason: "no mesh is available to this runtime".to_string(),
        })?;
        Ok(Self::new(config, mesh))
    }
}

#[async_trait]
impl Action for InvokeAction {
    async fn execute(
        &self,
        ctx: &Context,
        data: &mut DataBag,
    ) -> Result<Option<Value>, ActionError> {
        let path = self.config.from.as_deref().unwrap_or(DEFAULT_SOURCE);
        let request = data.lookup(path).cloned().unwrap_or(Value::Null);

        let reply = self
            .mesh
            .request_response(
                ctx.clone(),
                &self.config.namespace,
                &self.config.operation,
                Payload::json(&request)?,
            )
            .ok_or_else(|| MeshError::Unresolved {
                namespace: self.config.namespace.clone(),
                operation: self.config.operation.clone(),
            })?
            .await?;

        Ok(Some(reply.to_json()?))
    }
}
