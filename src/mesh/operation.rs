// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use serde_json::Value;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use crate::engine::Context;
use crate::errors::MeshError;

/// Number of leading metadata bytes carrying the dispatch index.
pub const INDEX_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Export,
    Import,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    FireAndForget,
    RequestResponse,
    RequestStream,
    RequestChannel,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 4] = [
        InteractionKind::FireAndForget,
        InteractionKind::RequestResponse,
        InteractionKind::RequestStream,
        InteractionKind::RequestChannel,
    ];
}

/// An operation declared by a compute instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operation {
    pub namespace: String,
    pub operation: String,
    pub direction: Direction,
    pub kind: InteractionKind,
    /// Instance-local dispatch index.
    pub index: u32,
}

impl Operation {
    pub fn export(
        namespace: impl Into<String>,
        operation: impl Into<String>,
        kind: InteractionKind,
        index: u32,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            operation: operation.into(),
            direction: Direction::Export,
            kind,
            index,
        }
    }

    pub fn import(
        namespace: impl Into<String>,
        operation: impl Into<String>,
        kind: InteractionKind,
        index: u32,
    ) -> Self {
        Self {
            direction: Direction::Import,
            ..Self::export(namespace, operation, kind, index)
        }
    }

    pub(crate) fn key(&self) -> (String, String) {
        (self.namespace.clone(), self.operation.clone())
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.namespace, self.operation)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    pub data: Vec<u8>,
    pub metadata: Vec<u8>,
}

impl Payload {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            metadata: Vec::new(),
        }
    }

    pub fn json(value: &Value) -> Result<Self, MeshError> {
        serde_json::to_vec(value)
            .map(Self::new)
            .map_err(|e| MeshError::Codec(e.to_string()))
    }

    /// Decode the data as JSON. Empty data decodes to `null`.
    pub fn to_json(&self) -> Result<Value, MeshError> {
        if self.data.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.data).map_err(|e| MeshError::Codec(e.to_string()))
    }

    pub fn index(&self) -> Option<u32> {
        let bytes: [u8; INDEX_LEN] = self.metadata.get(..INDEX_LEN)?.try_into().ok()?;
        Some(u32::from_be_bytes(bytes))
    }

    /// Write `index` big-endian into the first four metadata bytes.
    pub fn set_index(&mut self, index: u32) {
        if self.metadata.len() < INDEX_LEN {
            self.metadata.resize(INDEX_LEN, 0);
        }
        self.metadata[..INDEX_LEN].copy_from_slice(&index.to_be_bytes());
    }
}

/// A single asynchronous reply.
pub type Mono = BoxFuture<'static, Result<Payload, MeshError>>;

/// A sequence of replies, ending on completion or the first failure.
pub type Flux = BoxStream<'static, Result<Payload, MeshError>>;

pub type FireAndForgetFn = Arc<dyn Fn(Context, Payload) + Send + Sync>;
pub type RequestResponseFn = Arc<dyn Fn(Context, Payload) -> Mono + Send + Sync>;
pub type RequestStreamFn = Arc<dyn Fn(Context, Payload) -> Flux + Send + Sync>;
pub type RequestChannelFn = Arc<dyn Fn(Context, Payload, Flux) -> Flux + Send + Sync>;

/// Outbound call path installed into an importing instance.
#[derive(Clone)]
pub enum Handler {
    FireAndForget(FireAndForgetFn),
    RequestResponse(RequestResponseFn),
    RequestStream(RequestStreamFn),
    RequestChannel(RequestChannelFn),
}

impl Handler {
    pub fn kind(&self) -> InteractionKind {
        match self {
            Handler::FireAndForget(_) => InteractionKind::FireAndForget,
            Handler::RequestResponse(_) => InteractionKind::RequestResponse,
            Handler::RequestStream(_) => InteractionKind::RequestStream,
            Handler::RequestChannel(_) => InteractionKind::RequestChannel,
        }
    }
}

impl Debug for Handler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Handler").field(&self.kind()).finish()
    }
}
