// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors surfaced by the operation mesh and compute instances.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("operation {namespace}/{operation} is not linked")]
    Unresolved {
        namespace: String,
        operation: String,
    },

    #[error("no operation registered at dispatch index {0}")]
    InvalidIndex(u32),

    #[error("payload codec error: {0}")]
    Codec(String),

    /// Failure reported by the instance that served the call.
    #[error("{0}")]
    Downstream(String),

    #[error("mesh has been closed")]
    Closed,

    #[error("failed to close {} instance(s): {}", .0.len(), .0.join("; "))]
    Close(Vec<String>),
}
