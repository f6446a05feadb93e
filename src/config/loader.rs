// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::duration::ConfigDuration;
use crate::errors::ConfigError;

/// Operation name to pipeline, within one namespace.
pub type Operations = BTreeMap<String, PipelineConfig>;

/// Namespace to operations.
pub type NamespacesConfig = BTreeMap<String, Operations>;

/// Top-level bus configuration document.
///
/// # Example
/// ```yaml
/// id: customers
/// resiliency:
///   timeouts:
///     fast: 500ms
///   retries:
///     events:
///       policy: exponential
///       maxRetries: 5
///   circuitBreakers:
///     database:
///       maxRequests: 2
///       timeout: 30s
///       trip: consecutiveFailures > 3
/// interfaces:
///   customers.v1.Customers:
///     createCustomer:
///       steps:
///         - uses: assign
///           with:
///             from: input
///           returns: customer
///           timeout: fast
///           retry: events
///           circuitBreaker: database
/// pipelines:
///   audit:
///     steps:
///       - uses: log
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub resiliency: ResiliencyConfig,
    #[serde(default)]
    pub interfaces: NamespacesConfig,
    #[serde(default)]
    pub providers: NamespacesConfig,
    #[serde(default)]
    pub pipelines: BTreeMap<String, PipelineConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResiliencyConfig {
    #[serde(default)]
    pub timeouts: BTreeMap<String, ConfigDuration>,
    #[serde(default)]
    pub retries: BTreeMap<String, RetryPolicyConfig>,
    #[serde(default)]
    pub circuit_breakers: BTreeMap<String, CircuitBreakerConfig>,
}

/// Retry policy as written; unset fields take the retry defaults.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicyConfig {
    pub policy: Option<String>,
    pub duration: Option<ConfigDuration>,
    pub initial_interval: Option<ConfigDuration>,
    pub randomization_factor: Option<f64>,
    pub multiplier: Option<f64>,
    pub max_interval: Option<ConfigDuration>,
    pub max_elapsed_time: Option<ConfigDuration>,
    pub max_retries: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerConfig {
    pub max_requests: Option<u32>,
    pub interval: Option<ConfigDuration>,
    pub timeout: Option<ConfigDuration>,
    pub trip: Option<String>,
}

/// A pipeline: either `steps`, or a `call` to another pipeline.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub name: Option<String>,
    /// `namespace::operation` or the name of a flat pipeline.
    pub call: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepConfig {
    pub name: Option<String>,
    pub uses: String,
    #[serde(default)]
    pub with: Value,
    pub returns: Option<String>,
    /// Named timeout, or a literal duration such as `"2s"`.
    pub timeout: Option<String>,
    pub retry: Option<String>,
    pub circuit_breaker: Option<String>,
    pub on_error: Option<Box<PipelineConfig>>,
}

impl BusConfig {
    /// Merge `other` into `self`. Entries already present in `self` win.
    pub fn combine(mut self, other: BusConfig) -> Self {
        if self.id.is_empty() {
            self.id = other.id;
        }

        fill(&mut self.resiliency.timeouts, other.resiliency.timeouts);
        fill(&mut self.resiliency.retries, other.resiliency.retries);
        fill(&mut self.resiliency.circuit_breakers, other.resiliency.circuit_breakers);
        fill(&mut self.pipelines, other.pipelines);

        for (namespace, operations) in other.interfaces {
            fill(self.interfaces.entry(namespace).or_default(), operations);
        }
        for (namespace, operations) in other.providers {
            fill(self.providers.entry(namespace).or_default(), operations);
        }
        self
    }
}

fn fill<V>(into: &mut BTreeMap<String, V>, from: BTreeMap<String, V>) {
    for (key, value) in from {
        into.entry(key).or_insert(value);
    }
}

/// Replace `${env:NAME}` and `$env:NAME` with the variable's value.
/// Unset variables stay as written.
pub fn expand_env(text: &str) -> String {
    expand_env_with(text, |name| std::env::var(name).ok())
}

fn expand_env_with(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];

        let (name, len) = if let Some(body) = candidate.strip_prefix("${env:") {
            match body.find('}') {
                Some(end) => (&body[..end], "${env:".len() + end + 1),
                None => ("", 0),
            }
        } else if let Some(body) = candidate.strip_prefix("$env:") {
            let end = body
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(body.len());
            (&body[..end], "$env:".len() + end)
        } else {
            ("", 0)
        };

        match (len, lookup(name)) {
            (len, Some(value)) if len > 0 && !name.is_empty() => {
                out.push_str(&value);
                rest = &candidate[len..];
            }
            _ => {
                out.push('$');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Parse a configuration document. `format` is a file extension: `yaml`, `yml`, `toml` or `json`.
pub fn parse_config(text: &str, format: &str) -> Result<BusConfig, ConfigError> {
    let text = expand_env(text);
    match format.to_ascii_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
            format: "yaml",
            reason: e.to_string(),
        }),
        "toml" => toml::from_str(&text).map_err(|e| ConfigError::Parse {
            format: "toml",
            reason: e.to_string(),
        }),
        "json" => serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            format: "json",
            reason: e.to_string(),
        }),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Load a configuration file, choosing the format by extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BusConfig, ConfigError> {
    let path = path.as_ref();
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    if !matches!(format, "yaml" | "yml" | "toml" | "json") {
        return Err(ConfigError::UnsupportedFormat(path.display().to_string()));
    }

    let content = fs::read_to_string(path)?;
    parse_config(&content, format)
}

/// Load several files and [`combine`](BusConfig::combine) them in order.
pub fn load_configs<P: AsRef<Path>>(paths: &[P]) -> Result<BusConfig, ConfigError> {
    paths
        .iter()
        .try_fold(BusConfig::default(), |combined, path| {
            Ok(combined.combine(load_config(path)?))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn parse_bus_config() {
        let yaml = r#"
id: customers
resiliency:
  timeouts:
    fast: 500ms
  retries:
    events:
      policy: exponential
      maxRetries: 5
  circuitBreakers:
    database:
      maxRequests: 2
      trip: consecutiveFailures > 3
interfaces:
  customers.v1:
    create:
      steps:
        - name: store
          uses: assign
          with:
            from: input
          returns: customer
          timeout: fast
          retry: events
          circuitBreaker: database
          onError:
            steps:
              - uses: log
pipelines:
  alias:
    call: customers.v1::create
"#;

        let cfg = parse_config(yaml, "yaml").unwrap();
        assert_eq!(cfg.id, "customers");
        assert_eq!(
            cfg.resiliency.timeouts["fast"],
            ConfigDuration(Duration::from_millis(500))
        );
        assert_eq!(cfg.resiliency.retries["events"].max_retries, Some(5));
        assert_eq!(cfg.resiliency.circuit_breakers["database"].max_requests, Some(2));

        let step = &cfg.interfaces["customers.v1"]["create"].steps[0];
        assert_eq!(step.uses, "assign");
        assert_eq!(step.with, json!({"from": "input"}));
        assert_eq!(step.circuit_breaker.as_deref(), Some("database"));
        assert_eq!(step.on_error.as_ref().unwrap().steps[0].uses, "log");
        assert_eq!(cfg.pipelines["alias"].call.as_deref(), Some("customers.v1::create"));
    }

    #[test]
    fn parse_toml_and_json() {
        let toml = r#"
id = "orders"

[pipelines.audit]
steps = [{ uses = "log", with = { message = "audit" } }]
"#;
        let from_toml = parse_config(toml, "toml").unwrap();
        assert_eq!(from_toml.pipelines["audit"].steps[0].with, json!({"message": "audit"}));

        let json = r#"{"id": "orders", "pipelines": {"audit": {"steps": [{"uses": "log"}]}}}"#;
        let from_json = parse_config(json, "json").unwrap();
        assert_eq!(from_json.pipelines["audit"].steps[0].uses, "log");
        assert_eq!(from_json.pipelines["audit"].steps[0].with, Value::Null);
    }

    #[test]
    fn test_expand_env() {
        let lookup = |name: &str| match name {
            "HOST" => Some("db.internal".to_string()),
            "PORT" => Some("5432".to_string()),
            _ => None,
        };

        struct TestCase {
            input: &'static str,
            expected: &'static str,
        }

        let test_cases = vec![
            TestCase { input: "${env:HOST}:${env:PORT}", expected: "db.internal:5432" },
            TestCase { input: "$env:HOST/db", expected: "db.internal/db" },
            TestCase { input: "${env:MISSING}", expected: "${env:MISSING}" },
            TestCase { input: "cost: $5", expected: "cost: $5" },
            TestCase { input: "${env:HOST", expected: "${env:HOST" },
        ];

        for case in test_cases {
            assert_eq!(expand_env_with(case.input, lookup), case.expected, "{}", case.input);
        }
    }

    #[test]
    fn test_combine_first_wins() {
        let first = parse_config(
            r#"
id: first
resiliency:
  timeouts:
    shared: 1s
pipelines:
  a:
    steps:
      - uses: log
"#,
            "yaml",
        )
        .unwrap();
        let second = parse_config(
            r#"
id: second
resiliency:
  timeouts:
    shared: 9s
    extra: 2s
pipelines:
  a:
    steps:
      - uses: filter
  b:
    steps:
      - uses: log
"#,
            "yaml",
        )
        .unwrap();

        let combined = first.combine(second);
        assert_eq!(combined.id, "first");
        assert_eq!(combined.resiliency.timeouts["shared"].0, Duration::from_secs(1));
        assert_eq!(combined.resiliency.timeouts["extra"].0, Duration::from_secs(2));
        assert_eq!(combined.pipelines["a"].steps[0].uses, "log");
        assert!(combined.pipelines.contains_key("b"));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bus.yaml");
        std::fs::write(&path, "id: from-file\n").unwrap();
        assert_eq!(load_config(&path).unwrap().id, "from-file");

        let unsupported = dir.path().join("bus.ini");
        std::fs::write(&unsupported, "id = x").unwrap();
        assert!(matches!(load_config(&unsupported), Err(ConfigError::UnsupportedFormat(_))));

        assert!(matches!(
            load_config(dir.path().join("missing.yaml")),
            Err(ConfigError::Io(_))
        ));
    }
}
