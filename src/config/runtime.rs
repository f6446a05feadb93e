// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::sync::Arc;

use super::loader::{BusConfig, NamespacesConfig, PipelineConfig, StepConfig};
use super::policies::ResiliencyPolicies;
use super::registry::ActionRegistry;
use crate::engine::{Namespaces, Pipeline, Runnable, Runtime, Step, TARGET_SEPARATOR};
use crate::errors::ConfigError;
use crate::observability::messages::pipeline::PipelineLoaded;
use crate::observability::messages::StructuredLog;
use crate::traits::Dependencies;

/// Runtime builder - turns a bus configuration into an executable [`Runtime`].
///
/// Every failure it can raise (unknown action, undefined policy, bad action settings,
/// dangling alias) surfaces here, before any request runs.
///
/// # Examples
///
/// ```
/// use the_conduit::config::{parse_config, ActionRegistry, RuntimeBuilder};
/// use the_conduit::traits::Dependencies;
///
/// let yaml = r#"
/// pipelines:
///   hello:
///     steps:
///       - uses: assign
///         with:
///           value: hi
/// "#;
/// let config = parse_config(yaml, "yaml")?;
/// let registry = ActionRegistry::with_builtins();
/// let runtime = RuntimeBuilder::new(&registry, Dependencies::default()).from_config(&config)?;
///
/// assert!(runtime.resolve("hello").is_some());
/// # Ok::<(), the_conduit::errors::ConfigError>(())
/// ```
pub struct RuntimeBuilder<'a> {
    registry: &'a ActionRegistry,
    deps: Dependencies,
}

impl<'a> RuntimeBuilder<'a> {
    pub fn new(registry: &'a ActionRegistry, deps: Dependencies) -> Self {
        Self { registry, deps }
    }

    /// Resolve the resiliency section, then load every interface, provider and flat pipeline.
    pub fn from_config(&self, config: &BusConfig) -> Result<Runtime, ConfigError> {
        let policies = ResiliencyPolicies::from_config(&config.resiliency)?;
        self.build(config, &policies)
    }

    pub fn build(
        &self,
        config: &BusConfig,
        policies: &ResiliencyPolicies,
    ) -> Result<Runtime, ConfigError> {
        let loader = PipelineLoader {
            registry: self.registry,
            policies,
            deps: &self.deps,
        };

        let interfaces = loader.load_namespaces(&config.interfaces)?;
        let providers = loader.load_namespaces(&config.providers)?;
        let pipelines = config
            .pipelines
            .iter()
            .map(|(name, pipeline)| {
                let runnable = loader.load_named(name, pipeline)?;
                Ok((name.clone(), runnable))
            })
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;

        Runtime::new(interfaces, providers, pipelines)
    }
}

struct PipelineLoader<'a> {
    registry: &'a ActionRegistry,
    policies: &'a ResiliencyPolicies,
    deps: &'a Dependencies,
}

impl PipelineLoader<'_> {
    fn load_namespaces(&self, config: &NamespacesConfig) -> Result<Namespaces, ConfigError> {
        let mut namespaces = Namespaces::new();
        for (namespace, operations) in config {
            for (operation, pipeline) in operations {
                let name = format!("{namespace}{TARGET_SEPARATOR}{operation}");
                namespaces.insert(namespace, operation, self.load_named(&name, pipeline)?);
            }
        }
        Ok(namespaces)
    }

    fn load_named(&self, name: &str, config: &PipelineConfig) -> Result<Runnable, ConfigError> {
        self.load(name, config).map_err(|source| ConfigError::Pipeline {
            name: name.to_string(),
            source: Box::new(source),
        })
    }

    fn load(&self, default_name: &str, config: &PipelineConfig) -> Result<Runnable, ConfigError> {
        let name = config.name.as_deref().unwrap_or(default_name).to_string();

        if let Some(target) = &config.call {
            return Ok(Runnable::Alias {
                name,
                target: target.clone(),
            });
        }

        let steps = config
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| self.load_step(&name, index, step))
            .collect::<Result<Vec<_>, _>>()?;

        PipelineLoaded {
            pipeline: &name,
            step_count: steps.len(),
        }
        .log();
        Ok(Runnable::Steps(Arc::new(Pipeline::new(name, steps))))
    }

    fn load_step(
        &self,
        pipeline: &str,
        index: usize,
        config: &StepConfig,
    ) -> Result<Step, ConfigError> {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| format!("Step {index}"));

        let action = self.registry.create(&config.uses, &config.with, self.deps)?;
        let policy = self.policies.policy_for(&name, config)?;
        let mut step = Step::new(name.clone(), action).with_policy(policy);

        if let Some(key) = &config.returns {
            step = step.with_returns(key.clone());
        }
        if let Some(handler) = &config.on_error {
            let handler_name = format!("{pipeline}/{name}/onError");
            step = step.with_on_error(self.load(&handler_name, handler)?);
        }
        Ok(step)
    }
}
