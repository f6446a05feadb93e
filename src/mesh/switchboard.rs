// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use super::destination::Destination;
use super::operation::{Direction, Flux, Handler, InteractionKind, Mono, Operation, Payload};
use crate::engine::Context;
use crate::errors::MeshError;
use crate::observability::messages::mesh::{
    ImportPending, ImportResolved, InstanceCloseFailed, InstanceLinked, MeshClosed,
};
use crate::observability::messages::StructuredLog;
use crate::observability::{SpanProvider, TracingSpanProvider};
use crate::traits::ComputeInstance;

/// Hot-swappable binding of one exported operation.
type Slot = Arc<ArcSwap<Destination>>;

struct PendingImport {
    instance: Arc<dyn ComputeInstance>,
    operation: Operation,
}

#[derive(Default)]
struct Links {
    instances: Vec<Arc<dyn ComputeInstance>>,
    pending: Vec<PendingImport>,
}

/// In-process switchboard between exporting and importing compute instances.
///
/// Each `(namespace, operation)` owns one slot. Re-linking an export swaps the slot's
/// destination atomically; calls already routed hold their own `Arc<Destination>` and
/// finish against the previous binding. Importers load the slot on every call, so they
/// follow re-links without being linked again.
pub struct Mesh {
    exports: DashMap<(String, String), Slot>,
    links: Mutex<Links>,
    spans: Arc<dyn SpanProvider>,
    done: CancellationToken,
}

impl Mesh {
    pub fn new() -> Self {
        Self::with_span_provider(TracingSpanProvider::shared())
    }

    pub fn with_span_provider(spans: Arc<dyn SpanProvider>) -> Self {
        Self {
            exports: DashMap::new(),
            links: Mutex::new(Links::default()),
            spans,
            done: CancellationToken::new(),
        }
    }

    fn links(&self) -> MutexGuard<'_, Links> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `instance`'s exports and resolve its imports.
    ///
    /// Imports with no export yet are parked and retried whenever a later link adds exports.
    pub fn link(&self, instance: Arc<dyn ComputeInstance>) -> Result<(), MeshError> {
        if self.done.is_cancelled() {
            return Err(MeshError::Closed);
        }

        let operations = instance.operations();
        let mut links = self.links();
        let (mut exports, mut imports) = (0, 0);

        for operation in operations.iter().filter(|op| op.direction == Direction::Export) {
            let destination = Arc::new(Destination::new(instance.clone(), operation));
            self.exports
                .entry(operation.key())
                .and_modify(|slot| slot.store(destination.clone()))
                .or_insert_with(|| Arc::new(ArcSwap::new(destination)));
            exports += 1;
        }

        for operation in operations.into_iter().filter(|op| op.direction == Direction::Import) {
            imports += 1;
            match self.slot(&operation.namespace, &operation.operation) {
                Some(slot) => self.bind(instance.as_ref(), &operation, slot),
                None => {
                    ImportPending {
                        instance: instance.name(),
                        namespace: &operation.namespace,
                        operation: &operation.operation,
                    }
                    .log();
                    links.pending.push(PendingImport {
                        instance: instance.clone(),
                        operation,
                    });
                }
            }
        }

        InstanceLinked {
            instance: instance.name(),
            exports,
            imports,
        }
        .log();
        links.instances.push(instance);

        if exports > 0 {
            links.pending.retain(|pending| {
                let operation = &pending.operation;
                let Some(slot) = self.slot(&operation.namespace, &operation.operation) else {
                    return true;
                };
                self.bind(pending.instance.as_ref(), operation, slot);
                ImportResolved {
                    instance: pending.instance.name(),
                    namespace: &operation.namespace,
                    operation: &operation.operation,
                }
                .log();
                false
            });
        }

        Ok(())
    }

    /// Imports that still have no matching export.
    pub fn unsatisfied(&self) -> Vec<Operation> {
        self.links()
            .pending
            .iter()
            .map(|pending| pending.operation.clone())
            .collect()
    }

    pub fn fire_and_forget(
        &self,
        ctx: Context,
        namespace: &str,
        operation: &str,
        payload: Payload,
    ) -> bool {
        match self.destination(namespace, operation) {
            Some(destination) => {
                destination.fire_and_forget(self.spans.as_ref(), ctx, payload);
                true
            }
            None => false,
        }
    }

    /// `None` when the operation is not linked.
    pub fn request_response(
        &self,
        ctx: Context,
        namespace: &str,
        operation: &str,
        payload: Payload,
    ) -> Option<Mono> {
        let destination = self.destination(namespace, operation)?;
        Some(destination.request_response(self.spans.as_ref(), ctx, payload))
    }

    pub fn request_stream(
        &self,
        ctx: Context,
        namespace: &str,
        operation: &str,
        payload: Payload,
    ) -> Option<Flux> {
        let destination = self.destination(namespace, operation)?;
        Some(destination.request_stream(self.spans.as_ref(), ctx, payload))
    }

    pub fn request_channel(
        &self,
        ctx: Context,
        namespace: &str,
        operation: &str,
        payload: Payload,
        inbound: Flux,
    ) -> Option<Flux> {
        let destination = self.destination(namespace, operation)?;
        Some(destination.request_channel(self.spans.as_ref(), ctx, payload, inbound))
    }

    /// Close every linked instance, then release shutdown waiters.
    pub fn close(&self) -> Result<(), MeshError> {
        let instances = {
            let mut links = self.links();
            links.pending.clear();
            std::mem::take(&mut links.instances)
        };
        self.exports.clear();

        let mut failures = Vec::new();
        for instance in &instances {
            if let Err(error) = instance.close() {
                let error = error.to_string();
                InstanceCloseFailed {
                    instance: instance.name(),
                    error: &error,
                }
                .log();
                failures.push(format!("{}: {}", instance.name(), error));
            }
        }

        MeshClosed {
            instances: instances.len(),
            failures: failures.len(),
        }
        .log();
        self.done.cancel();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(MeshError::Close(failures))
        }
    }

    pub async fn wait_until_shutdown(&self) {
        self.done.cancelled().await;
    }

    pub fn is_closed(&self) -> bool {
        self.done.is_cancelled()
    }

    fn slot(&self, namespace: &str, operation: &str) -> Option<Slot> {
        self.exports
            .get(&(namespace.to_string(), operation.to_string()))
            .map(|slot| slot.value().clone())
    }

    fn destination(&self, namespace: &str, operation: &str) -> Option<Arc<Destination>> {
        self.slot(namespace, operation).map(|slot| slot.load_full())
    }

    fn bind(&self, importer: &dyn ComputeInstance, import: &Operation, slot: Slot) {
        let spans = self.spans.clone();
        let handler = match import.kind {
            InteractionKind::FireAndForget => {
                Handler::FireAndForget(Arc::new(move |ctx: Context, payload: Payload| {
                    slot.load().fire_and_forget(spans.as_ref(), ctx, payload)
                }))
            }
            InteractionKind::RequestResponse => {
                Handler::RequestResponse(Arc::new(move |ctx: Context, payload: Payload| {
                    slot.load().request_response(spans.as_ref(), ctx, payload)
                }))
            }
            InteractionKind::RequestStream => {
                Handler::RequestStream(Arc::new(move |ctx: Context, payload: Payload| {
                    slot.load().request_stream(spans.as_ref(), ctx, payload)
                }))
            }
            InteractionKind::RequestChannel => Handler::RequestChannel(Arc::new(
                move |ctx: Context, payload: Payload, inbound: Flux| {
                    slot.load()
                        .request_channel(spans.as_ref(), ctx, payload, inbound)
                },
            )),
        };
        importer.set_handler(import.index, handler);
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Mesh {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("exports", &self.exports.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
