// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Action backends.
//!
//! ## Local Backend
//! Built-in in-process actions, created through [`local::LocalActionFactory`]:
//! - **assign**: produce a literal or copy a value from the data bag
//! - **filter**: stop the run when a condition is falsy
//! - **log**: log a value from the data bag
//! - **invoke**: request-response call to another compute instance through the mesh
//!
//! ## Stub Backend (Test-Only)
//! Scripted actions (failing, flaky, stopping, slow) and an echoing compute instance
//! used by the engine and mesh tests. Not available in production builds.

pub mod local;
#[cfg(test)]
pub mod stub;
