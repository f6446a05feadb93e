// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use futures::{FutureExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::engine::{Context, DataBag};
use crate::errors::{ActionError, MeshError};
use crate::mesh::{Flux, Handler, Mono, Operation, Payload};
use crate::traits::{Action, ComputeInstance};

/// Shared invocation counter for stub actions.
#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn record(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Returns a fixed output.
pub struct StaticAction {
    pub output: Option<Value>,
    pub calls: Calls,
}

impl StaticAction {
    pub fn new(output: Option<Value>) -> Self {
        Self {
            output,
            calls: Calls::default(),
        }
    }
}

#[async_trait]
impl Action for StaticAction {
    async fn execute(
        &self,
        _ctx: &Context,
        _data: &mut DataBag,
    ) -> Result<Option<Value>, ActionError> {
        self.calls.record();
        Ok(self.output.clone())
    }
}

/// An action that always fails for testing failure scenarios
pub struct FailingAction {
    pub message: String,
    pub calls: Calls,
}

impl FailingAction {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: Calls::default(),
        }
    }
}

#[async_trait]
impl Action for FailingAction {
    async fn execute(
        &self,
        _ctx: &Context,
        _data: &mut DataBag,
    ) -> Result<Option<Value>, ActionError> {
        self.calls.record();
        Err(ActionError::failed(self.message.clone()))
    }
}

/// Fails the first `failures` calls, then returns `output`.
pub struct FlakyAction {
    pub failures: usize,
    pub output: Value,
    pub calls: Calls,
}

impl FlakyAction {
    pub fn new(failures: usize, output: Value) -> Self {
        Self {
            failures,
            output,
            calls: Calls::default(),
        }
    }
}

#[async_trait]
impl Action for FlakyAction {
    async fn execute(
        &self,
        _ctx: &Context,
        _data: &mut DataBag,
    ) -> Result<Option<Value>, ActionError> {
        if self.calls.record() <= self.failures {
            return Err(ActionError::failed("transient failure"));
        }
        Ok(Some(self.output.clone()))
    }
}

/// Raises the stop signal.
#[derive(Default)]
pub struct StopAction {
    pub calls: Calls,
}

#[async_trait]
impl Action for StopAction {
    async fn execute(
        &self,
        _ctx: &Context,
        _data: &mut DataBag,
    ) -> Result<Option<Value>, ActionError> {
        self.calls.record();
        Err(ActionError::Stop)
    }
}

/// Sleeps before returning `output`.
pub struct SlowAction {
    pub delay: Duration,
    pub output: Value,
}

#[async_trait]
impl Action for SlowAction {
    async fn execute(
        &self,
        _ctx: &Context,
        _data: &mut DataBag,
    ) -> Result<Option<Value>, ActionError> {
        tokio::time::sleep(self.delay).await;
        Ok(Some(self.output.clone()))
    }
}

/// Writes `value` under `key` after yielding, to interleave with concurrent runs.
pub struct WriteAction {
    pub key: String,
}

#[async_trait]
impl Action for WriteAction {
    async fn execute(
        &self,
        _ctx: &Context,
        data: &mut DataBag,
    ) -> Result<Option<Value>, ActionError> {
        let value = data.get("input").cloned().unwrap_or(Value::Null);
        tokio::task::yield_now().await;
        data.insert(self.key.clone(), value);
        Ok(None)
    }
}

/// Returns the value stored under `key`.
pub struct ReadAction {
    pub key: String,
}

#[async_trait]
impl Action for ReadAction {
    async fn execute(
        &self,
        _ctx: &Context,
        data: &mut DataBag,
    ) -> Result<Option<Value>, ActionError> {
        tokio::task::yield_now().await;
        Ok(data.get(&self.key).cloned())
    }
}

/// Compute instance echoing payloads back, recording installed handlers and calls.
pub struct EchoInstance {
    pub name: String,
    pub operations: Vec<Operation>,
    pub handlers: Mutex<HashMap<u32, Handler>>,
    pub received: Mutex<Vec<Payload>>,
    pub fail_close: bool,
    pub closed: AtomicBool,
}

impl EchoInstance {
    pub fn new(name: &str, operations: Vec<Operation>) -> Self {
        Self {
            name: name.to_string(),
            operations,
            handlers: Mutex::new(HashMap::new()),
            received: Mutex::new(Vec::new()),
            fail_close: false,
            closed: AtomicBool::new(false),
        }
    }

    pub fn handler(&self, index: u32) -> Option<Handler> {
        self.handlers.lock().unwrap().get(&index).cloned()
    }

    pub fn received(&self) -> Vec<Payload> {
        self.received.lock().unwrap().clone()
    }

    fn record(&self, payload: &Payload) {
        self.received.lock().unwrap().push(payload.clone());
    }

    fn reply(&self, payload: Payload) -> Payload {
        let mut data = self.name.as_bytes().to_vec();
        data.push(b':');
        data.extend_from_slice(&payload.data);
        Payload {
            data,
            metadata: payload.metadata,
        }
    }
}

impl ComputeInstance for EchoInstance {
    fn name(&self) -> &str {
        &self.name
    }

    fn operations(&self) -> Vec<Operation> {
        self.operations.clone()
    }

    fn fire_and_forget(&self, _ctx: Context, payload: Payload) {
        self.record(&payload);
    }

    fn request_response(&self, _ctx: Context, payload: Payload) -> Mono {
        self.record(&payload);
        let reply = self.reply(payload);
        async move { Ok(reply) }.boxed()
    }

    /// Echoes twice, then fails if the request data is `fail`.
    fn request_stream(&self, _ctx: Context, payload: Payload) -> Flux {
        self.record(&payload);
        let fail = payload.data == b"fail";
        let reply = self.reply(payload);
        let mut items: Vec<Result<Payload, MeshError>> = vec![Ok(reply.clone()), Ok(reply)];
        if fail {
            items.push(Err(MeshError::Downstream("stream failed".to_string())));
            items.push(Ok(Payload::new(b"after failure".to_vec())));
        }
        futures::stream::iter(items).boxed()
    }

    fn request_channel(&self, _ctx: Context, payload: Payload, inbound: Flux) -> Flux {
        self.record(&payload);
        let first = self.reply(payload);
        let prefix = self.name.clone();
        futures::stream::once(async move { Ok(first) })
            .chain(inbound.map(move |item| {
                item.map(|payload| {
                    let mut data = prefix.as_bytes().to_vec();
                    data.push(b':');
                    data.extend_from_slice(&payload.data);
                    Payload::new(data)
                })
            }))
            .boxed()
    }

    fn set_handler(&self, index: u32, handler: Handler) {
        self.handlers.lock().unwrap().insert(index, handler);
    }

    fn close(&self) -> Result<(), MeshError> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close {
            return Err(MeshError::Downstream("refused to close".to_string()));
        }
        Ok(())
    }
}
