// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline loading and step execution.

use crate::observability::messages::StructuredLog;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A pipeline definition was turned into an executable runnable.
///
/// # Log Level
/// `debug!` - Startup detail
///
/// # Example
/// ```
/// use the_conduit::observability::messages::pipeline::PipelineLoaded;
///
/// let msg = PipelineLoaded {
///     pipeline: "orders::submit",
///     step_count: 4,
/// };
///
/// assert_eq!(msg.to_string(), "Loaded pipeline 'orders::submit' with 4 steps");
/// ```
pub struct PipelineLoaded<'a> {
    pub pipeline: &'a str,
    pub step_count: usize,
}

impl Display for PipelineLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded pipeline '{}' with {} steps",
            self.pipeline, self.step_count
        )
    }
}

impl StructuredLog for PipelineLoaded<'_> {
    fn log(&self) {
        tracing::debug!(
            pipeline = self.pipeline,
            step_count = self.step_count,
            "{}", self
        );
    }
}

/// A step is about to run under its resiliency policy.
///
/// # Log Level
/// `debug!` - Per-step trace detail
///
/// # Example
/// ```
/// use the_conduit::observability::messages::pipeline::StepStarted;
///
/// let msg = StepStarted {
///     pipeline: "orders::submit",
///     step: "charge card",
/// };
///
/// let span = msg.span("step_execution");
/// let _entered = span.enter();
/// assert_eq!(msg.to_string(), "Running step 'charge card' of pipeline 'orders::submit'");
/// ```
pub struct StepStarted<'a> {
    pub pipeline: &'a str,
    pub step: &'a str,
}

impl StepStarted<'_> {
    /// The span a step's attempts run in, carrying the pipeline and step names.
    pub fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "step",
            span_name = name,
            pipeline = self.pipeline,
            step = self.step,
        )
    }
}

impl Display for StepStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Running step '{}' of pipeline '{}'", self.step, self.pipeline)
    }
}

impl StructuredLog for StepStarted<'_> {
    fn log(&self) {
        tracing::debug!(pipeline = self.pipeline, step = self.step, "{}", self);
    }
}

/// A step failed and its error handler pipeline is taking over.
///
/// # Log Level
/// `warn!` - Failure that is being handled
pub struct StepFailureHandled<'a> {
    pub pipeline: &'a str,
    pub step: &'a str,
    pub error: &'a str,
}

impl Display for StepFailureHandled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Step '{}' of pipeline '{}' failed, running error handler: {}",
            self.step, self.pipeline, self.error
        )
    }
}

impl StructuredLog for StepFailureHandled<'_> {
    fn log(&self) {
        tracing::warn!(
            pipeline = self.pipeline,
            step = self.step,
            error = self.error,
            "{}", self
        );
    }
}

/// A step requested an early, successful stop of the pipeline.
///
/// # Log Level
/// `debug!` - Normal control flow
pub struct PipelineStopped<'a> {
    pub pipeline: &'a str,
    pub step: &'a str,
}

impl Display for PipelineStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' stopped at step '{}'",
            self.pipeline, self.step
        )
    }
}

impl StructuredLog for PipelineStopped<'_> {
    fn log(&self) {
        tracing::debug!(pipeline = self.pipeline, step = self.step, "{}", self);
    }
}

/// A step failed with no error handler, aborting the run.
///
/// # Log Level
/// `error!` - Run failed
///
/// # Example
/// ```
/// use the_conduit::observability::messages::pipeline::PipelineAborted;
///
/// let msg = PipelineAborted {
///     pipeline: "orders::submit",
///     step: "Step 2",
///     error: "connection refused",
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct PipelineAborted<'a> {
    pub pipeline: &'a str,
    pub step: &'a str,
    pub error: &'a str,
}

impl Display for PipelineAborted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pipeline '{}' aborted at step '{}': {}",
            self.pipeline, self.step, self.error
        )
    }
}

impl StructuredLog for PipelineAborted<'_> {
    fn log(&self) {
        tracing::error!(
            pipeline = self.pipeline,
            step = self.step,
            error = self.error,
            "{}", self
        );
    }
}

/// Output of the built-in `log` action.
///
/// # Log Level
/// `info!` - Requested by configuration
pub struct ValueLogged<'a> {
    pub message: &'a str,
    pub path: &'a str,
    pub value: &'a Value,
}

impl Display for ValueLogged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}: {} = {}", self.message, self.path, self.value)
    }
}

impl StructuredLog for ValueLogged<'_> {
    fn log(&self) {
        tracing::info!(path = self.path, value = %self.value, "{}", self);
    }
}
