// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{json, Value};
use std::time::Duration;

use crate::config::{load_config, load_configs, parse_config, ActionRegistry, RuntimeBuilder};
use crate::engine::{Context, DataBag, Runnable, Runtime};
use crate::errors::ConfigError;
use crate::traits::Dependencies;

const CUSTOMERS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/customers.yaml");
const OVERRIDES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/overrides.toml");

fn build(yaml: &str) -> Result<Runtime, ConfigError> {
    let config = parse_config(yaml, "yaml")?;
    RuntimeBuilder::new(&ActionRegistry::with_builtins(), Dependencies::default()).from_config(&config)
}

/// The failure underneath the per-pipeline wrapper.
fn root_cause(error: ConfigError) -> ConfigError {
    match error {
        ConfigError::Pipeline { source, .. } => root_cause(*source),
        other => other,
    }
}

async fn run(runtime: &Runtime, target: &str, input: Value) -> (Option<Value>, DataBag) {
    let mut data = DataBag::seeded(input, Value::Null);
    let output = runtime
        .invoke_target(target, &Context::new(), &mut data)
        .await
        .expect("target exists")
        .expect("run succeeds");
    (output, data)
}

/// The bundled sample configuration builds and serves its interface operations.
#[tokio::test]
async fn test_sample_config_runs() {
    let config = load_config(CUSTOMERS).unwrap();
    assert_eq!(config.id, "customers");

    let runtime = RuntimeBuilder::new(&ActionRegistry::with_builtins(), Dependencies::default())
        .from_config(&config)
        .unwrap();

    let (output, data) = run(&runtime, "customers.v1::getCustomer", json!({"id": 7})).await;
    assert_eq!(output, Some(json!({"id": 7})));
    assert_eq!(data.get("customer"), Some(&json!({"id": 7})));

    // The filter stops the run when the id is missing.
    let (output, data) = run(&runtime, "customers.v1::getCustomer", json!({})).await;
    assert_eq!(output, None);
    assert!(!data.contains_key("customer"));

    let (output, _) = run(&runtime, "customers.v1::fetchCustomer", json!({"id": 9})).await;
    assert_eq!(output, Some(json!({"id": 9})));
}

/// Documents are merged in order and earlier entries win.
#[test]
fn test_documents_combine_in_order() {
    let config = load_configs(&[CUSTOMERS, OVERRIDES]).unwrap();

    assert_eq!(config.id, "customers");
    assert_eq!(config.resiliency.timeouts["fast"].0, Duration::from_millis(500));
    assert_eq!(config.resiliency.timeouts["slow"].0, Duration::from_secs(10));
    assert!(config.pipelines.contains_key("lookup"));
    assert!(config.pipelines.contains_key("audit"));
}

/// Steps without a name are called "Step N", and onError handlers are named after their step.
#[test]
fn test_default_step_names() {
    let runtime = build(
        r#"
pipelines:
  main:
    steps:
      - uses: assign
        with: { value: 1 }
      - uses: assign
        with: { value: 2 }
        onError:
          steps:
            - uses: log
              with: { message: failed }
"#,
    )
    .unwrap();

    let Some(Runnable::Steps(pipeline)) = runtime.resolve("main") else {
        panic!("main should be a step pipeline");
    };
    let names: Vec<_> = pipeline.steps.iter().map(|step| step.name.as_str()).collect();
    assert_eq!(names, vec!["Step 0", "Step 1"]);

    let handler = pipeline.steps[1].on_error.as_ref().unwrap();
    assert_eq!(handler.name(), "main/Step 1/onError");
    let Runnable::Steps(handler) = handler else {
        panic!("handler should be a step pipeline");
    };
    assert_eq!(handler.steps[0].name, "Step 0");
}

/// Every configuration mistake is reported while building, naming what is wrong.
#[test]
fn test_build_errors() {
    struct TestCase {
        name: &'static str,
        yaml: &'static str,
        check: fn(&ConfigError) -> bool,
    }

    let cases = vec![
        TestCase {
            name: "unregistered action",
            yaml: "pipelines:\n  p:\n    steps:\n      - uses: teleport\n",
            check: |e| matches!(e, ConfigError::UnregisteredAction(name) if name == "teleport"),
        },
        TestCase {
            name: "undefined retry policy",
            yaml: "pipelines:\n  p:\n    steps:\n      - uses: log\n        retry: missing\n",
            check: |e| matches!(e, ConfigError::PolicyNotDefined { kind: "retry", name } if name == "missing"),
        },
        TestCase {
            name: "undefined circuit breaker",
            yaml: "pipelines:\n  p:\n    steps:\n      - uses: log\n        circuitBreaker: db\n",
            check: |e| matches!(e, ConfigError::PolicyNotDefined { kind: "circuit breaker", name } if name == "db"),
        },
        TestCase {
            name: "undefined timeout",
            yaml: "pipelines:\n  p:\n    steps:\n      - uses: log\n        timeout: glacial\n",
            check: |e| matches!(e, ConfigError::PolicyNotDefined { kind: "timeout", .. }),
        },
        TestCase {
            name: "invalid action settings",
            yaml: "pipelines:\n  p:\n    steps:\n      - uses: assign\n        with: { value: 1, from: input }\n",
            check: |e| matches!(e, ConfigError::InvalidActionConfig { action, .. } if action == "assign"),
        },
        TestCase {
            name: "invoke without a mesh",
            yaml: "pipelines:\n  p:\n    steps:\n      - uses: invoke\n        with: { namespace: a, operation: b }\n",
            check: |e| matches!(e, ConfigError::InvalidActionConfig { action, .. } if action == "invoke"),
        },
        TestCase {
            name: "invalid trip expression",
            yaml: "resiliency:\n  circuitBreakers:\n    db:\n      trip: failures ~ 3\n",
            check: |e| matches!(e, ConfigError::InvalidTripExpression { .. }),
        },
        TestCase {
            name: "alias to nothing",
            yaml: "pipelines:\n  p:\n    call: nowhere\n",
            check: |e| matches!(e, ConfigError::UnknownPipeline { target, .. } if target == "nowhere"),
        },
        TestCase {
            name: "alias cycle",
            yaml: "pipelines:\n  a:\n    call: b\n  b:\n    call: a\n",
            check: |e| matches!(e, ConfigError::AliasCycle(_)),
        },
    ];

    for case in cases {
        let error = build(case.yaml).expect_err(case.name);
        let cause = root_cause(error);
        assert!((case.check)(&cause), "{}: unexpected error {cause:?}", case.name);
    }
}

/// Failures inside a pipeline are reported with the pipeline's name.
#[test]
fn test_error_names_pipeline() {
    let error = build(
        "interfaces:\n  orders.v1:\n    place:\n      steps:\n        - uses: teleport\n",
    )
    .unwrap_err();

    assert!(matches!(&error, ConfigError::Pipeline { name, .. } if name == "orders.v1::place"));
    assert!(error.to_string().contains("teleport"));
}
