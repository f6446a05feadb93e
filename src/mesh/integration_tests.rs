// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::backends::stub::EchoInstance;
use crate::config::{parse_config, ActionRegistry, RuntimeBuilder};
use crate::engine::Context;
use crate::errors::MeshError;
use crate::mesh::{Flux, Handler, InteractionKind, Mesh, Operation, Payload, PipelineInvoker};
use crate::observability::span::recording::RecordingSpanProvider;
use crate::traits::{ComputeInstance, Dependencies};

fn exporter(name: &str, kind: InteractionKind, index: u32) -> Arc<EchoInstance> {
    Arc::new(EchoInstance::new(
        name,
        vec![Operation::export("greeter", "hello", kind, index)],
    ))
}

fn importer(index: u32) -> Arc<EchoInstance> {
    Arc::new(EchoInstance::new(
        "caller",
        vec![Operation::import("greeter", "hello", InteractionKind::RequestResponse, index)],
    ))
}

async fn call(handler: Option<Handler>, data: &str) -> Payload {
    let Some(Handler::RequestResponse(respond)) = handler else {
        panic!("expected a request-response handler");
    };
    respond(Context::new(), Payload::new(data)).await.unwrap()
}

async fn collect(flux: Flux) -> Vec<Result<String, MeshError>> {
    flux.map(|item| item.map(|payload| String::from_utf8_lossy(&payload.data).into_owned()))
        .collect()
        .await
}

/// An import linked before its export waits, then binds when the export arrives.
#[tokio::test]
async fn test_import_resolves_after_late_export() {
    let mesh = Mesh::new();
    let caller = importer(3);

    mesh.link(caller.clone()).unwrap();
    assert_eq!(mesh.unsatisfied().len(), 1);
    assert!(caller.handler(3).is_none());

    let greeter = exporter("greeter", InteractionKind::RequestResponse, 7);
    mesh.link(greeter.clone()).unwrap();
    assert!(mesh.unsatisfied().is_empty());

    let reply = call(caller.handler(3), "hi").await;
    assert_eq!(reply.data, b"greeter:hi");

    // The exporter's dispatch index travels in the metadata.
    assert_eq!(greeter.received()[0].index(), Some(7));
}

/// Linking a new exporter for the same operation moves existing importers to it.
#[tokio::test]
async fn test_relink_swaps_destination() {
    let mesh = Mesh::new();
    let caller = importer(0);

    mesh.link(exporter("v1", InteractionKind::RequestResponse, 0)).unwrap();
    mesh.link(caller.clone()).unwrap();
    assert_eq!(call(caller.handler(0), "hi").await.data, b"v1:hi");

    mesh.link(exporter("v2", InteractionKind::RequestResponse, 1)).unwrap();
    assert_eq!(call(caller.handler(0), "hi").await.data, b"v2:hi");

    let reply = mesh
        .request_response(Context::new(), "greeter", "hello", Payload::new("direct"))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(reply.data, b"v2:direct");
    assert_eq!(reply.index(), Some(1));
}

#[tokio::test]
async fn test_unlinked_operation_is_not_routed() {
    let mesh = Mesh::new();
    assert!(mesh
        .request_response(Context::new(), "greeter", "hello", Payload::default())
        .is_none());
    assert!(mesh
        .request_stream(Context::new(), "greeter", "hello", Payload::default())
        .is_none());
    assert!(!mesh.fire_and_forget(Context::new(), "greeter", "hello", Payload::default()));
}

#[tokio::test]
async fn test_fire_and_forget_delivers_with_index() {
    let mesh = Mesh::new();
    let greeter = exporter("greeter", InteractionKind::FireAndForget, 5);
    mesh.link(greeter.clone()).unwrap();

    assert!(mesh.fire_and_forget(Context::new(), "greeter", "hello", Payload::new("ping")));
    let received = greeter.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].data, b"ping");
    assert_eq!(received[0].index(), Some(5));
}

/// A stream ends at its first failure; nothing after it is delivered.
#[tokio::test]
async fn test_stream_terminates_on_error() {
    let mesh = Mesh::new();
    mesh.link(exporter("greeter", InteractionKind::RequestStream, 0)).unwrap();

    let ok = collect(
        mesh.request_stream(Context::new(), "greeter", "hello", Payload::new("hi"))
            .unwrap(),
    )
    .await;
    assert_eq!(ok, vec![Ok("greeter:hi".to_string()), Ok("greeter:hi".to_string())]);

    let failed = collect(
        mesh.request_stream(Context::new(), "greeter", "hello", Payload::new("fail"))
            .unwrap(),
    )
    .await;
    assert_eq!(failed.len(), 3);
    assert_eq!(failed[2], Err(MeshError::Downstream("stream failed".to_string())));
}

#[tokio::test]
async fn test_channel_echoes_initial_and_inbound() {
    let mesh = Mesh::new();
    mesh.link(exporter("greeter", InteractionKind::RequestChannel, 0)).unwrap();

    let inbound = futures::stream::iter(vec![Ok(Payload::new("a")), Ok(Payload::new("b"))]).boxed();
    let replies = collect(
        mesh.request_channel(Context::new(), "greeter", "hello", Payload::new("start"), inbound)
            .unwrap(),
    )
    .await;

    assert_eq!(
        replies,
        vec![
            Ok("greeter:start".to_string()),
            Ok("greeter:a".to_string()),
            Ok("greeter:b".to_string()),
        ]
    );
}

/// Spans opened for routed calls end when the reply resolves or the stream completes.
#[tokio::test]
async fn test_routed_calls_are_spanned() {
    let spans = Arc::new(RecordingSpanProvider::default());
    let mesh = Mesh::with_span_provider(spans.clone());
    mesh.link(exporter("greeter", InteractionKind::RequestStream, 0)).unwrap();

    let stream = mesh
        .request_stream(Context::new(), "greeter", "hello", Payload::new("hi"))
        .unwrap();
    assert_eq!(spans.events(), vec!["start:greeter::hello"]);

    collect(stream).await;
    assert_eq!(spans.events(), vec!["start:greeter::hello", "end:greeter::hello"]);
}

/// Close reaches every instance, reports every failure, and releases shutdown waiters.
#[tokio::test]
async fn test_close_aggregates_failures() {
    let mesh = Arc::new(Mesh::new());
    let good = exporter("good", InteractionKind::RequestResponse, 0);
    let bad = Arc::new(EchoInstance {
        fail_close: true,
        ..EchoInstance::new("bad", vec![])
    });
    mesh.link(good.clone()).unwrap();
    mesh.link(bad.clone()).unwrap();

    let waiter = {
        let mesh = mesh.clone();
        tokio::spawn(async move { mesh.wait_until_shutdown().await })
    };

    let error = mesh.close().unwrap_err();
    let MeshError::Close(failures) = error else {
        panic!("expected close failures");
    };
    assert_eq!(failures.len(), 1);
    assert!(failures[0].starts_with("bad: "));
    assert!(good.closed.load(Ordering::SeqCst));
    assert!(bad.closed.load(Ordering::SeqCst));

    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("shutdown waiter released")
        .unwrap();
    assert!(mesh.is_closed());
    assert!(mesh
        .request_response(Context::new(), "greeter", "hello", Payload::default())
        .is_none());
    assert_eq!(mesh.link(good).unwrap_err(), MeshError::Closed);
}

const BUS: &str = r#"
interfaces:
  customers.v1:
    get:
      steps:
        - uses: assign
          with:
            from: input
  orders.v1:
    place:
      steps:
        - uses: invoke
          with:
            namespace: customers.v1
            operation: get
            from: input.customer
          returns: customer
        - uses: assign
          with:
            from: customer.id
    broken:
      steps:
        - uses: invoke
          with:
            namespace: nowhere
            operation: missing
providers:
  billing:
    charges:
      steps:
        - uses: assign
          with:
            value: [1, 2, 3]
"#;

fn invoker_mesh() -> (Arc<Mesh>, Arc<PipelineInvoker>) {
    let mesh = Arc::new(Mesh::new());
    let config = parse_config(BUS, "yaml").unwrap();
    let runtime = RuntimeBuilder::new(&ActionRegistry::with_builtins(), Dependencies::with_mesh(mesh.clone()))
        .from_config(&config)
        .unwrap();
    let invoker = Arc::new(PipelineInvoker::new("pipelines", Arc::new(runtime)));
    mesh.link(invoker.clone()).unwrap();
    (mesh, invoker)
}

async fn request(mesh: &Mesh, namespace: &str, operation: &str, input: Value) -> Result<Value, MeshError> {
    let payload = Payload::json(&input)?;
    mesh.request_response(Context::new(), namespace, operation, payload)
        .expect("operation is exported")
        .await?
        .to_json()
}

/// Pipelines are exported under every interaction kind with one index per operation.
#[tokio::test]
async fn test_invoker_exports_every_kind() {
    let (_, invoker) = invoker_mesh();
    let operations = invoker.operations();

    assert_eq!(operations.len(), 4 * 4);
    let charges: Vec<_> = operations
        .iter()
        .filter(|op| op.namespace == "billing" && op.operation == "charges")
        .collect();
    assert_eq!(charges.len(), 4);
    assert!(charges.iter().all(|op| op.index == charges[0].index));
}

#[tokio::test]
async fn test_invoker_request_response() {
    let (mesh, _) = invoker_mesh();

    let customer = request(&mesh, "customers.v1", "get", json!({"id": 1})).await.unwrap();
    assert_eq!(customer, json!({"id": 1}));

    // orders.v1::place reaches customers.v1::get back through the mesh.
    let id = request(&mesh, "orders.v1", "place", json!({"customer": {"id": 42}}))
        .await
        .unwrap();
    assert_eq!(id, json!(42));

    let error = request(&mesh, "orders.v1", "broken", json!({})).await.unwrap_err();
    assert!(matches!(error, MeshError::Downstream(ref message) if message.contains("nowhere")));
}

#[tokio::test]
async fn test_invoker_streams_array_elements() {
    let (mesh, _) = invoker_mesh();
    let items: Vec<Value> = mesh
        .request_stream(Context::new(), "billing", "charges", Payload::default())
        .unwrap()
        .map(|item| item.and_then(|payload| payload.to_json()).unwrap())
        .collect()
        .await;

    assert_eq!(items, vec![json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn test_invoker_channel_runs_per_item() {
    let (mesh, _) = invoker_mesh();
    let inbound = futures::stream::iter(vec![
        Payload::json(&json!({"id": 2})),
        Payload::json(&json!({"id": 3})),
    ])
    .boxed();

    let items: Vec<Value> = mesh
        .request_channel(
            Context::new(),
            "customers.v1",
            "get",
            Payload::json(&json!({"id": 1})).unwrap(),
            inbound,
        )
        .unwrap()
        .map(|item| item.and_then(|payload| payload.to_json()).unwrap())
        .collect()
        .await;

    assert_eq!(items, vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]);
}

#[tokio::test]
async fn test_invoker_rejects_unknown_index() {
    let (_, invoker) = invoker_mesh();

    let mut payload = Payload::default();
    payload.set_index(99);
    let error = invoker.request_response(Context::new(), payload).await.unwrap_err();
    assert_eq!(error, MeshError::InvalidIndex(99));

    let error = invoker
        .request_response(Context::new(), Payload::default())
        .await
        .unwrap_err();
    assert!(matches!(error, MeshError::Codec(_)));
}
