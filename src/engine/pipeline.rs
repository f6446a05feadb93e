// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Step sequencing with stop and error-recovery semantics.
//!
//! Steps of a run execute strictly in order against one [`DataBag`]. Each step runs its
//! action through the step's [`Policy`], so retries, breaker rejections and timeouts are
//! fully resolved before the executor sees the outcome.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::Instrument;

use super::runtime::Runtime;
use super::{Context, DataBag};
use crate::errors::ActionError;
use crate::observability::messages::pipeline::{
    PipelineAborted, PipelineStopped, StepFailureHandled, StepStarted,
};
use crate::observability::messages::StructuredLog;
use crate::resilience::{Attempt, Policy};
use crate::traits::Action;

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// All steps ran; carries the last non-null output, if any.
    Completed(Option<Value>),
    /// A step raised the stop signal.
    Stopped,
}

impl Outcome {
    pub fn into_output(self) -> Option<Value> {
        match self {
            Outcome::Completed(output) => output,
            Outcome::Stopped => None,
        }
    }
}

pub struct Step {
    pub name: String,
    pub action: Arc<dyn Action>,
    pub policy: Policy,
    pub returns: Option<String>,
    pub on_error: Option<Runnable>,
}

impl Step {
    pub fn new(name: impl Into<String>, action: Arc<dyn Action>) -> Self {
        let name = name.into();
        Self {
            policy: Policy::new(name.clone()),
            name,
            action,
            returns: None,
            on_error: None,
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_returns(mut self, key: impl Into<String>) -> Self {
        self.returns = Some(key.into());
        self
    }

    pub fn with_on_error(mut self, handler: Runnable) -> Self {
        self.on_error = Some(handler);
        self
    }
}

impl Debug for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("policy", &self.policy.name())
            .field("returns", &self.returns)
            .field("on_error", &self.on_error)
            .finish()
    }
}

#[derive(Debug)]
pub struct Pipeline {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    async fn execute(
        &self,
        runtime: &Runtime,
        ctx: &Context,
        data: &mut DataBag,
    ) -> Result<Outcome, ActionError> {
        let mut output = None;

        for step in &self.steps {
            let started = StepStarted {
                pipeline: &self.name,
                step: &step.name,
            };
            started.log();
            let span = started
                .span("step_execution")
                .in_scope(|| runtime.spans().start(&step.name));
            let attempt = StepAttempt {
                action: step.action.as_ref(),
                ctx,
            };
            let result = step
                .policy
                .execute(ctx.cancellation(), data, &attempt)
                .instrument(span.span())
                .await;
            span.end();

            let step_output = match result {
                Ok(step_output) => step_output,
                Err(error) if error.is_stop() => {
                    self.stopped(step);
                    return Ok(Outcome::Stopped);
                }
                Err(error) => match &step.on_error {
                    Some(handler) => {
                        StepFailureHandled {
                            pipeline: &self.name,
                            step: &step.name,
                            error: &error.to_string(),
                        }
                        .log();
                        match handler.execute(runtime, ctx, data).await? {
                            Outcome::Completed(recovered) => recovered,
                            Outcome::Stopped => {
                                self.stopped(step);
                                return Ok(Outcome::Stopped);
                            }
                        }
                    }
                    None => {
                        PipelineAborted {
                            pipeline: &self.name,
                            step: &step.name,
                            error: &error.to_string(),
                        }
                        .log();
                        return Err(error);
                    }
                },
            };

            if let Some(key) = &step.returns {
                data.insert(key.clone(), step_output.clone().unwrap_or(Value::Null));
            }
            if let Some(value) = step_output {
                data.advance(value.clone());
                output = Some(value);
            }
        }

        Ok(Outcome::Completed(output))
    }

    fn stopped(&self, step: &Step) {
        PipelineStopped {
            pipeline: &self.name,
            step: &step.name,
        }
        .log();
    }
}

struct StepAttempt<'a> {
    action: &'a dyn Action,
    ctx: &'a Context,
}

#[async_trait]
impl Attempt<DataBag> for StepAttempt<'_> {
    type Output = Option<Value>;

    async fn attempt(&self, data: &mut DataBag) -> Result<Option<Value>, ActionError> {
        self.action.execute(self.ctx, data).await
    }
}

/// Something the runtime can execute: a list of steps, or an alias of another runnable.
#[derive(Debug, Clone)]
pub enum Runnable {
    Steps(Arc<Pipeline>),
    /// Delegates to `target` (`namespace::operation` or a flat pipeline name).
    Alias { name: String, target: String },
}

impl Runnable {
    pub fn name(&self) -> &str {
        match self {
            Runnable::Steps(pipeline) => &pipeline.name,
            Runnable::Alias { name, .. } => name,
        }
    }

    /// Run to completion. A stopped run yields `Ok(None)`.
    pub async fn run(
        &self,
        runtime: &Runtime,
        ctx: &Context,
        data: &mut DataBag,
    ) -> Result<Option<Value>, ActionError> {
        self.execute(runtime, ctx, data)
            .await
            .map(Outcome::into_output)
    }

    pub fn execute<'a>(
        &'a self,
        runtime: &'a Runtime,
        ctx: &'a Context,
        data: &'a mut DataBag,
    ) -> BoxFuture<'a, Result<Outcome, ActionError>> {
        async move {
            match self {
                Runnable::Steps(pipeline) => pipeline.execute(runtime, ctx, data).await,
                Runnable::Alias { target, .. } => match runtime.resolve(target) {
                    Some(delegate) => delegate.execute(runtime, ctx, data).await,
                    None => Err(ActionError::NotFound(target.clone())),
                },
            }
        }
        .boxed()
    }
}
