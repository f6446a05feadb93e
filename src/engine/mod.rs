// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline execution engine.
//!
//! A [`Runtime`] owns every loaded [`Runnable`]. Running one threads a single
//! [`DataBag`] through its steps in declared order; each step's action runs inside
//! the step's resiliency [`Policy`](crate::resilience::Policy).

mod context;
mod data_bag;
pub mod pipeline;
mod runtime;


pub use context::Context;
pub use data_bag::{DataBag, CLAIMS_KEY, CURRENT_KEY, INPUT_KEY, PIPE_KEY};
pub use pipeline::{Outcome, Pipeline, Runnable, Step};
pub use runtime::{Namespaces, Runtime, TARGET_SEPARATOR};
