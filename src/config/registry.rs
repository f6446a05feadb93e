// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::backends::local::LocalActionFactory;
use crate::errors::ConfigError;
use crate::traits::{Action, ActionFactory, Dependencies};

/// Name to [`ActionFactory`] table consulted while loading pipelines.
///
/// The only place an "unregistered action" failure originates.
#[derive(Clone, Default)]
pub struct ActionRegistry(HashMap<String, Arc<dyn ActionFactory>>);

impl ActionRegistry {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// A registry holding every built-in local action.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for name in LocalActionFactory::list_available_implementations() {
            registry.register(name, move |with: &Value, deps: &Dependencies| {
                LocalActionFactory::create_action(name, with, deps)
            });
        }
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: ActionFactory + 'static,
    {
        self.0.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn create(
        &self,
        name: &str,
        with: &Value,
        deps: &Dependencies,
    ) -> Result<Arc<dyn Action>, ConfigError> {
        let factory = self
            .0
            .get(name)
            .ok_or_else(|| ConfigError::UnregisteredAction(name.to_string()))?;
        factory.create(with, deps)
    }
}

impl Debug for ActionRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}
