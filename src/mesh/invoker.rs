// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Compute instance serving the runtime's pipelines over the mesh.
//!
//! Every interface and provider pipeline is exported under all four interaction kinds,
//! sharing one dispatch index per `namespace::operation`. Requests carry JSON data; each
//! call seeds a fresh [`DataBag`] and runs the pipeline on its own task.

use futures::{FutureExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use super::operation::{Flux, Handler, InteractionKind, Mono, Operation, Payload};
use crate::engine::{Context, DataBag, Runtime};
use crate::errors::MeshError;
use crate::observability::messages::mesh::FireAndForgetFailed;
use crate::observability::messages::StructuredLog;
use crate::traits::ComputeInstance;

const STREAM_BUFFER: usize = 16;

pub struct PipelineInvoker {
    name: String,
    runtime: Arc<Runtime>,
    /// Dispatch index to `(namespace, operation)`.
    targets: Vec<(String, String)>,
}

impl PipelineInvoker {
    pub fn new(name: impl Into<String>, runtime: Arc<Runtime>) -> Self {
        let targets = runtime
            .interfaces()
            .iter()
            .chain(runtime.providers().iter())
            .map(|(namespace, operation, _)| (namespace.to_string(), operation.to_string()))
            .collect();

        Self {
            name: name.into(),
            runtime,
            targets,
        }
    }

    fn target(&self, payload: &Payload) -> Result<Target, MeshError> {
        let index = payload
            .index()
            .ok_or_else(|| MeshError::Codec("payload metadata has no dispatch index".to_string()))?;
        let (namespace, operation) = usize::try_from(index)
            .ok()
            .and_then(|i| self.targets.get(i))
            .ok_or(MeshError::InvalidIndex(index))?;

        Ok(Target {
            runtime: self.runtime.clone(),
            namespace: namespace.clone(),
            operation: operation.clone(),
        })
    }
}

/// One resolved pipeline, owned so it can move onto a spawned task.
struct Target {
    runtime: Arc<Runtime>,
    namespace: String,
    operation: String,
}

impl Target {
    async fn run(&self, ctx: &Context, payload: &Payload) -> Result<Value, MeshError> {
        let input = payload.to_json()?;
        let mut data = DataBag::seeded(input, ctx.claims().clone());

        match self
            .runtime
            .invoke(&self.namespace, &self.operation, ctx, &mut data)
            .await
        {
            Some(Ok(output)) => Ok(output.unwrap_or(Value::Null)),
            Some(Err(error)) => Err(MeshError::Downstream(error.to_string())),
            None => Err(MeshError::Unresolved {
                namespace: self.namespace.clone(),
                operation: self.operation.clone(),
            }),
        }
    }

    async fn reply(&self, ctx: &Context, payload: &Payload) -> Result<Payload, MeshError> {
        Payload::json(&self.run(ctx, payload).await?)
    }
}

fn failed_stream(error: MeshError) -> Flux {
    futures::stream::once(async move { Err(error) }).boxed()
}

impl ComputeInstance for PipelineInvoker {
    fn name(&self) -> &str {
        &self.name
    }

    fn operations(&self) -> Vec<Operation> {
        self.targets
            .iter()
            .zip(0u32..)
            .flat_map(|((namespace, operation), index)| {
                InteractionKind::ALL
                    .into_iter()
                    .map(move |kind| {
                        Operation::export(namespace.clone(), operation.clone(), kind, index)
                    })
            })
            .collect()
    }

    fn fire_and_forget(&self, ctx: Context, payload: Payload) {
        let target = match self.target(&payload) {
            Ok(target) => target,
            Err(error) => {
                FireAndForgetFailed {
                    namespace: "",
                    operation: "",
                    error: &error.to_string(),
                }
                .log();
                return;
            }
        };

        tokio::spawn(async move {
            if let Err(error) = target.run(&ctx, &payload).await {
                FireAndForgetFailed {
                    namespace: &target.namespace,
                    operation: &target.operation,
                    error: &error.to_string(),
                }
                .log();
            }
        });
    }

    fn request_response(&self, ctx: Context, payload: Payload) -> Mono {
        let target = match self.target(&payload) {
            Ok(target) => target,
            Err(error) => return futures::future::ready(Err(error)).boxed(),
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = reply_tx.send(target.reply(&ctx, &payload).await);
        });

        async move {
            reply_rx.await.unwrap_or_else(|_| {
                Err(MeshError::Downstream("pipeline task ended without replying".to_string()))
            })
        }
        .boxed()
    }

    /// Array outputs are streamed element by element; any other output is a single item.
    fn request_stream(&self, ctx: Context, payload: Payload) -> Flux {
        let target = match self.target(&payload) {
            Ok(target) => target,
            Err(error) => return failed_stream(error),
        };

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            let items: Vec<Result<Payload, MeshError>> = match target.run(&ctx, &payload).await {
                Ok(Value::Array(items)) => items.iter().map(Payload::json).collect(),
                Ok(other) => vec![Payload::json(&other)],
                Err(error) => vec![Err(error)],
            };
            for item in items {
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        });

        ReceiverStream::new(rx).boxed()
    }

    /// Runs the pipeline for the initial payload, then once per inbound item, in order.
    fn request_channel(&self, ctx: Context, payload: Payload, mut inbound: Flux) -> Flux {
        let target = match self.target(&payload) {
            Ok(target) => target,
            Err(error) => return failed_stream(error),
        };
        let index = payload.index();

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            if tx.send(target.reply(&ctx, &payload).await).await.is_err() {
                return;
            }
            while let Some(item) = inbound.next().await {
                let reply = match item {
                    Ok(mut item) => {
                        if let Some(index) = index {
                            item.set_index(index);
                        }
                        target.reply(&ctx, &item).await
                    }
                    Err(error) => Err(error),
                };
                if tx.send(reply).await.is_err() {
                    break;
                }
            }
        });

        ReceiverStream::new(rx).boxed()
    }

    /// Pipelines reach other instances through actions, never through imports.
    fn set_handler(&self, _index: u32, _handler: Handler) {}
}
