// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::sync::Arc;

use super::actions::*;
use crate::errors::ConfigError;
use crate::traits::{Action, Dependencies};

/// Factory for the built-in (in-process) actions.
pub struct LocalActionFactory;

impl LocalActionFactory {
    /// Create a built-in action from its name and `with` settings.
    ///
    /// - "assign" -> [`AssignAction`]
    /// - "filter" -> [`FilterAction`]
    /// - "log" -> [`LogAction`]
    /// - "invoke" -> [`InvokeAction`] (requires a mesh in `deps`)
    pub fn create_action(
        name: &str,
        with: &Value,
        deps: &Dependencies,
    ) -> Result<Arc<dyn Action>, ConfigError> {
        match name {
            AssignAction::NAME => Ok(Arc::new(AssignAction::from_settings(with)?)),
            FilterAction::NAME => Ok(Arc::new(FilterAction::from_settings(with)?)),
            LogAction::NAME => Ok(Arc::new(LogAction::from_settings(with)?)),
            InvokeAction::NAME => Ok(Arc::new(InvokeAction::from_settings(with, deps)?)),
            other => Err(ConfigError::UnregisteredAction(other.to_string())),
        }
    }

    pub fn list_available_implementations() -> Vec<&'static str> {
        vec![
            AssignAction::NAME,
            FilterAction::NAME,
            LogAction::NAME,
            InvokeAction::NAME,
        ]
    }

    pub fn is_implementation_available(name: &str) -> bool {
        Self::list_available_implementations().contains(&name)
    }
}
