// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::Context;
use crate::errors::MeshError;
use crate::mesh::{Flux, Handler, Mono, Operation, Payload};

/// A unit of compute linked into the [`Mesh`](crate::mesh::Mesh).
///
/// Exported operations are served through the call methods, with the dispatch index in the
/// first four bytes of `payload.metadata`. Imported operations are reached through the
/// handlers the mesh installs with [`ComputeInstance::set_handler`].
pub trait ComputeInstance: Send + Sync {
    fn name(&self) -> &str;

    fn operations(&self) -> Vec<Operation>;

    fn fire_and_forget(&self, ctx: Context, payload: Payload);

    fn request_response(&self, ctx: Context, payload: Payload) -> Mono;

    fn request_stream(&self, ctx: Context, payload: Payload) -> Flux;

    fn request_channel(&self, ctx: Context, payload: Payload, inbound: Flux) -> Flux;

    /// Install the outbound path for the import declared at `index`.
    fn set_handler(&self, index: u32, handler: Handler);

    fn close(&self) -> Result<(), MeshError> {
        Ok(())
    }
}
