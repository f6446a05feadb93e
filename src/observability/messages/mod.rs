// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit the same event with its fields attached, at the
//! level the event deserves. Messages that open a unit of work, such as
//! [`pipeline::StepStarted`], also build the span that work runs in.
//!
//! # Organization
//!
//! * `pipeline` - pipeline loading, step failures, stops and aborts
//! * `resilience` - retry notifications, recoveries and circuit transitions
//! * `mesh` - linking, import resolution and shutdown of compute instances
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_conduit::observability::messages::pipeline::PipelineLoaded;
//! use the_conduit::observability::messages::StructuredLog;
//!
//! let msg = PipelineLoaded {
//!     pipeline: "customers::create",
//!     step_count: 3,
//! };
//!
//! msg.log();
//! tracing::debug!("{}", msg);
//! ```

pub mod mesh;
pub mod pipeline;
pub mod resilience;

/// A log event that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the event through `tracing` with all fields attached.
    fn log(&self);
}
