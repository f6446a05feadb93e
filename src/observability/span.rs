// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Trace span provider abstraction.
//!
//! Every pipeline step and every mesh dispatch is wrapped in a span obtained from a
//! [`SpanProvider`]. The span is ended explicitly once the wrapped work resolves, which for
//! mesh calls can be long after the call returned its future or stream.

use std::sync::Arc;
use tracing::Span;

pub trait SpanProvider: Send + Sync {
    /// Open a span named `name`, parented to whatever span is current.
    fn start(&self, name: &str) -> Box<dyn ActiveSpan>;
}

pub trait ActiveSpan: Send + Sync {
    /// The `tracing` span used to instrument work running inside this span.
    fn span(&self) -> Span;

    fn end(self: Box<Self>);
}

/// Spans backed by `tracing`, so any installed subscriber sees them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSpanProvider;

impl TracingSpanProvider {
    pub fn shared() -> Arc<dyn SpanProvider> {
        Arc::new(Self)
    }
}

impl SpanProvider for TracingSpanProvider {
    fn start(&self, name: &str) -> Box<dyn ActiveSpan> {
        Box::new(TracingSpan {
            span: tracing::info_span!("operation", otel.name = name),
        })
    }
}

struct TracingSpan {
    span: Span,
}

impl ActiveSpan for TracingSpan {
    fn span(&self) -> Span {
        self.span.clone()
    }

    fn end(self: Box<Self>) {
        drop(self.span);
    }
}

/// Provider whose spans record nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSpanProvider;

impl NoopSpanProvider {
    pub fn shared() -> Arc<dyn SpanProvider> {
        Arc::new(Self)
    }
}

impl SpanProvider for NoopSpanProvider {
    fn start(&self, _name: &str) -> Box<dyn ActiveSpan> {
        Box::new(NoopSpan)
    }
}

struct NoopSpan;

impl ActiveSpan for NoopSpan {
    fn span(&self) -> Span {
        Span::none()
    }

    fn end(self: Box<Self>) {}
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;

    /// Records span lifecycles so tests can assert that spans were started and ended.
    #[derive(Default)]
    pub struct RecordingSpanProvider {
        pub events: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingSpanProvider {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl SpanProvider for RecordingSpanProvider {
        fn start(&self, name: &str) -> Box<dyn ActiveSpan> {
            self.events.lock().unwrap().push(format!("start:{name}"));
            Box::new(RecordingSpan {
                name: name.to_string(),
                events: self.events.clone(),
            })
        }
    }

    struct RecordingSpan {
        name: String,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl ActiveSpan for RecordingSpan {
        fn span(&self) -> Span {
            Span::none()
        }

        fn end(self: Box<Self>) {
            self.events.lock().unwrap().push(format!("end:{}", self.name));
        }
    }
}
