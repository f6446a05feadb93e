// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-request context handed to every action of a run.
///
/// Cloning is cheap and clones share the same cancellation token.
#[derive(Debug, Clone)]
pub struct Context {
    cancellation: CancellationToken,
    claims: Arc<Value>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            claims: Arc::new(Value::Null),
        }
    }

    pub fn with_claims(mut self, claims: Value) -> Self {
        self.claims = Arc::new(claims);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// A context for nested work: cancelled with this one, cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            claims: self.claims.clone(),
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn claims(&self) -> &Value {
        &self.claims
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
