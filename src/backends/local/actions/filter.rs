// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::decode;
use crate::engine::{Context, DataBag};
use crate::errors::{ActionError, ConfigError};
use crate::traits::Action;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Path whose value must be truthy for the run to continue.
    pub condition: String,
}

/// Stops the run when `condition` is missing, null, false, zero or an empty string.
#[derive(Debug)]
pub struct FilterAction {
    config: FilterConfig,
}

impl FilterAction {
    pub const NAME: &'static str = "filter";

    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn from_settings(with: &Value) -> Result<Self, ConfigError> {
        decode(Self::NAME, with).map(Self::new)
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[async_trait]
impl Action for FilterAction {
    async fn execute(
        &self,
        _ctx: &Context,
        data: &mut DataBag,
    ) -> Result<Option<Value>, ActionError> {
        if truthy(data.lookup(&self.config.condition)) {
            Ok(None)
        } else {
            Err(ActionError::Stop)
        }
    }
}
