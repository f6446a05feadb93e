// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod assign;
pub mod filter;
pub mod invoke;
pub mod log;

pub use assign::{AssignAction, AssignConfig};
pub use filter::{FilterAction, FilterConfig};
pub use invoke::{InvokeAction, InvokeConfig};
pub use log::{LogAction, LogConfig};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ConfigError;

/// Path read by actions that were not told where to look: the latest step output.
pub const DEFAULT_SOURCE: &str = "$";

/// Decode an action's `with` settings. A missing block decodes as an empty one.
pub(crate) fn decode<T: DeserializeOwned>(action: &str, with: &Value) -> Result<T, ConfigError> {
    let settings = match with {
        Value::Null => Value::Object(Default::default()),
        other => other.clone(),
    };
    serde_json::from_value(settings).map_err(|e| ConfigError::InvalidActionConfig {
        action: action.to_string(),
        reason: e.to_string(),
    })
}
