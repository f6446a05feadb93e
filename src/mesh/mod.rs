// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process operation mesh.
//!
//! Compute instances declare the operations they export and import. The [`Mesh`] binds
//! each import to the current exporter of the same `namespace::operation` without either
//! side knowing about the other, and routes the four interaction shapes:
//!
//! | kind              | caller gets                         |
//! |-------------------|-------------------------------------|
//! | fire-and-forget   | nothing                             |
//! | request-response  | a [`Mono`] resolving to one reply   |
//! | request-stream    | a [`Flux`] of replies               |
//! | request-channel   | a [`Flux`], fed by an inbound `Flux`|
//!
//! Outgoing payloads carry the destination's dispatch index big-endian in the first four
//! metadata bytes.

mod destination;
mod invoker;
mod operation;
mod switchboard;

#[cfg(test)]
mod integration_tests;

pub use destination::Destination;
pub use invoker::PipelineInvoker;
pub use operation::{
    Direction, FireAndForgetFn, Flux, Handler, InteractionKind, Mono, Operation, Payload,
    RequestChannelFn, RequestResponseFn, RequestStreamFn, INDEX_LEN,
};
pub use switchboard::Mesh;
