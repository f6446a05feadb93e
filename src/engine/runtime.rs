// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use super::pipeline::Runnable;
use super::{Context, DataBag};
use crate::errors::{ActionError, ConfigError};
use crate::observability::{SpanProvider, TracingSpanProvider};

/// Separator between namespace and operation in pipeline references.
pub const TARGET_SEPARATOR: &str = "::";

/// Pipelines grouped by namespace, then operation.
#[derive(Debug, Clone, Default)]
pub struct Namespaces(pub BTreeMap<String, BTreeMap<String, Runnable>>);

impl Namespaces {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(
        &mut self,
        namespace: impl Into<String>,
        operation: impl Into<String>,
        runnable: Runnable,
    ) {
        self.0
            .entry(namespace.into())
            .or_default()
            .insert(operation.into(), runnable);
    }

    pub fn get(&self, namespace: &str, operation: &str) -> Option<&Runnable> {
        self.0.get(namespace)?.get(operation)
    }

    /// Every `(namespace, operation, runnable)` in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Runnable)> {
        self.0.iter().flat_map(|(namespace, operations)| {
            operations.iter().map(move |(operation, runnable)| {
                (namespace.as_str(), operation.as_str(), runnable)
            })
        })
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Loaded pipelines, ready to execute.
pub struct Runtime {
    interfaces: Namespaces,
    providers: Namespaces,
    pipelines: BTreeMap<String, Runnable>,
    spans: Arc<dyn SpanProvider>,
}

impl Runtime {
    /// Assemble a runtime and check that every alias resolves without cycles.
    pub fn new(
        interfaces: Namespaces,
        providers: Namespaces,
        pipelines: BTreeMap<String, Runnable>,
    ) -> Result<Self, ConfigError> {
        let runtime = Self {
            interfaces,
            providers,
            pipelines,
            spans: TracingSpanProvider::shared(),
        };
        runtime.validate_aliases()?;
        Ok(runtime)
    }

    pub fn with_span_provider(mut self, spans: Arc<dyn SpanProvider>) -> Self {
        self.spans = spans;
        self
    }

    pub fn spans(&self) -> &dyn SpanProvider {
        self.spans.as_ref()
    }

    pub fn interfaces(&self) -> &Namespaces {
        &self.interfaces
    }

    pub fn providers(&self) -> &Namespaces {
        &self.providers
    }

    pub fn pipelines(&self) -> &BTreeMap<String, Runnable> {
        &self.pipelines
    }

    pub fn lookup(&self, namespace: &str, operation: &str) -> Option<&Runnable> {
        self.interfaces
            .get(namespace, operation)
            .or_else(|| self.providers.get(namespace, operation))
    }

    /// Resolve `namespace::operation` or a flat pipeline name.
    pub fn resolve(&self, target: &str) -> Option<&Runnable> {
        match target.rsplit_once(TARGET_SEPARATOR) {
            Some((namespace, operation)) => self.lookup(namespace, operation),
            None => self.pipelines.get(target),
        }
    }

    /// Run the pipeline registered for `namespace`/`operation`; `None` if there is none.
    pub async fn invoke(
        &self,
        namespace: &str,
        operation: &str,
        ctx: &Context,
        data: &mut DataBag,
    ) -> Option<Result<Option<Value>, ActionError>> {
        let runnable = self.lookup(namespace, operation)?;
        Some(runnable.run(self, ctx, data).await)
    }

    /// Run a pipeline by reference, as accepted by [`Runtime::resolve`].
    pub async fn invoke_target(
        &self,
        target: &str,
        ctx: &Context,
        data: &mut DataBag,
    ) -> Option<Result<Option<Value>, ActionError>> {
        let runnable = self.resolve(target)?;
        Some(runnable.run(self, ctx, data).await)
    }

    fn runnables(&self) -> impl Iterator<Item = &Runnable> {
        self.interfaces
            .iter()
            .chain(self.providers.iter())
            .map(|(_, _, runnable)| runnable)
            .chain(self.pipelines.values())
    }

    fn validate_aliases(&self) -> Result<(), ConfigError> {
        let mut handlers = Vec::new();
        for runnable in self.runnables() {
            collect_handlers(runnable, &mut handlers);
        }

        for runnable in self.runnables().chain(handlers) {
            let mut seen = BTreeSet::new();
            let mut current = runnable;
            while let Runnable::Alias { name, target } = current {
                if !seen.insert(name.as_str()) {
                    return Err(ConfigError::AliasCycle(name.clone()));
                }
                current = self
                    .resolve(target)
                    .ok_or_else(|| ConfigError::UnknownPipeline {
                        target: target.clone(),
                        referenced_by: name.clone(),
                    })?;
            }
        }
        Ok(())
    }
}

fn collect_handlers<'a>(runnable: &'a Runnable, into: &mut Vec<&'a Runnable>) {
    if let Runnable::Steps(pipeline) = runnable {
        for handler in pipeline.steps.iter().filter_map(|step| step.on_error.as_ref()) {
            into.push(handler);
            collect_handlers(handler, into);
        }
    }
}

impl Debug for Runtime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("interfaces", &self.interfaces.len())
            .field("providers", &self.providers.len())
            .field("pipelines", &self.pipelines.keys().collect::<Vec<_>>())
            .finish()
    }
}
