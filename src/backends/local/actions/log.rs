// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{decode, DEFAULT_SOURCE};
use crate::engine::{Context, DataBag};
use crate::errors::{ActionError, ConfigError};
use crate::observability::messages::pipeline::ValueLogged;
use crate::observability::messages::StructuredLog;
use crate::traits::Action;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    pub message: Option<String>,
    pub from: Option<String>,
}

/// Logs a value from the data bag. Produces no output.
#[derive(Debug)]
pub struct LogAction {
    config: LogConfig,
}

impl LogAction {
    pub const NAME: &'static str = "log";

    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    pub fn from_settings(with: &Value) -> Result<Self, ConfigError> {
        decode(Self::NAME, with).map(Self::new)
    }
}

#[async_trait]
impl Action for LogAction {
    async fn execute(
        &self,
        _ctx: &Context,
        data: &mut DataBag,
    ) -> Result<Option<Value>, ActionError> {
        let path = self.config.from.as_deref().unwrap_or(DEFAULT_SOURCE);
        let value = data.lookup(path).cloned().unwrap_or(Value::Null);

        ValueLogged {
            message: self.config.message.as_deref().unwrap_or("pipeline value"),
            path,
            value: &value,
        }
        .log();
        Ok(None)
    }
}
