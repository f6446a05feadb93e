// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::decode;
use crate::engine::{Context, DataBag};
use crate::errors::{ActionError, ConfigError};
use crate::traits::Action;

/// Produce a literal `value`, or copy the value at path `from`, optionally storing it under `key`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignConfig {
    pub value: Option<Value>,
    pub from: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug)]
pub struct AssignAction {
    config: AssignConfig,
}

impl AssignAction {
    pub const NAME: &'static str = "assign";

    pub fn new(config: AssignConfig) -> Result<Self, ConfigError> {
        if config.value.is_some() == config.from.is_some() {
            return Err(ConfigError::InvalidActionConfig {
                action: Self::NAME.to_string(),
                reason: "exactly one of `value` or `from` is required".to_string(),
            });
        }
        Ok(Self { config })
    }

    pub fn from_settings(with: &Value) -> Result<Self, ConfigError> {
        Self::new(decode(Self::NAME, with)?)
    }
}

#[async_trait]
impl Action for AssignAction {
    async fn execute(
        &self,
        _ctx: &Context,
        data: &mut DataBag,
    ) -> Result<Option<Value>, ActionError> {
        let value = match (&self.config.value, &self.config.from) {
            (Some(literal), _) => literal.clone(),
            (None, Some(path)) => data.lookup(path).cloned().unwrap_or(Value::Null),
            (None, None) => Value::Null,
        };

        if let Some(key) = &self.config.key {
            data.insert(key.clone(), value.clone());
        }
        Ok(Some(value))
    }
}
