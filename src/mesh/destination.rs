// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_stream::stream;
use futures::{FutureExt, StreamExt};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::Instrument;

use super::operation::{Flux, Mono, Operation, Payload};
use crate::engine::Context;
use crate::observability::{ActiveSpan, SpanProvider};
use crate::traits::ComputeInstance;

/// An export bound to the instance serving it.
pub struct Destination {
    instance: Arc<dyn ComputeInstance>,
    name: String,
    index: u32,
}

impl Destination {
    pub fn new(instance: Arc<dyn ComputeInstance>, export: &Operation) -> Self {
        Self {
            instance,
            name: export.to_string(),
            index: export.index,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn instance_name(&self) -> &str {
        self.instance.name()
    }

    fn stamp(&self, mut payload: Payload) -> Payload {
        payload.set_index(self.index);
        payload
    }

    pub fn fire_and_forget(&self, spans: &dyn SpanProvider, ctx: Context, payload: Payload) {
        let span = spans.start(&self.name);
        let _entered = span.span().entered();
        self.instance.fire_and_forget(ctx, self.stamp(payload));
        span.end();
    }

    pub fn request_response(
        &self,
        spans: &dyn SpanProvider,
        ctx: Context,
        payload: Payload,
    ) -> Mono {
        let span = spans.start(&self.name);
        let reply = self.instance.request_response(ctx, self.stamp(payload));
        let instrumented = span.span();
        async move {
            let result = reply.instrument(instrumented).await;
            span.end();
            result
        }
        .boxed()
    }

    pub fn request_stream(&self, spans: &dyn SpanProvider, ctx: Context, payload: Payload) -> Flux {
        let span = spans.start(&self.name);
        ended_with(self.instance.request_stream(ctx, self.stamp(payload)), span)
    }

    pub fn request_channel(
        &self,
        spans: &dyn SpanProvider,
        ctx: Context,
        payload: Payload,
        inbound: Flux,
    ) -> Flux {
        let span = spans.start(&self.name);
        ended_with(
            self.instance.request_channel(ctx, self.stamp(payload), inbound),
            span,
        )
    }
}

/// Forward `replies` until completion or the first failure, then end `span`.
fn ended_with(mut replies: Flux, span: Box<dyn ActiveSpan>) -> Flux {
    stream! {
        while let Some(reply) = replies.next().await {
            let failed = reply.is_err();
            yield reply;
            if failed {
                break;
            }
        }
        span.end();
    }
    .boxed()
}

impl Debug for Destination {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Destination")
            .field("operation", &self.name)
            .field("instance", &self.instance.name())
            .field("index", &self.index)
            .finish()
    }
}
