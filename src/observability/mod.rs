// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and trace spans.
//!
//! Log output flows through message types implementing `Display` and
//! [`messages::StructuredLog`], organised by subsystem:
//!
//! * `messages::pipeline` - pipeline loading and step execution events
//! * `messages::resilience` - retry notifications and circuit breaker transitions
//! * `messages::mesh` - instance linking, import resolution and shutdown
//!
//! Trace spans around pipeline steps and mesh calls are created through the
//! [`SpanProvider`] trait so hosts can substitute their own tracer, or switch
//! tracing off entirely with [`NoopSpanProvider`].
//!
//! # Usage
//!
//! ```rust
//! use the_conduit::observability::messages::StructuredLog;
//! use the_conduit::observability::messages::resilience::RetryRecovered;
//!
//! RetryRecovered { policy: "fetch_customer" }.log();
//! ```

mod logging;
pub mod messages;
pub(crate) mod span;

pub use logging::init_logging;
pub use span::{ActiveSpan, NoopSpanProvider, SpanProvider, TracingSpanProvider};
