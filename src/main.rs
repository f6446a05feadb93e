// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context as _};
use serde_json::Value;
use std::env;
use std::sync::Arc;
use the_conduit::config::{load_configs, ActionRegistry, RuntimeBuilder};
use the_conduit::engine::{Context, DataBag};
use the_conduit::errors::ConfigError;
use the_conduit::mesh::{Mesh, PipelineInvoker};
use the_conduit::observability::init_logging;
use the_conduit::traits::Dependencies;

const INSTANCE_NAME: &str = "pipelines";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <config[,config...]> <target> [json-input]", args[0]);
        eprintln!(
            "Example: {} configs/customers.yaml customers.v1::getCustomer '{{\"id\": 7}}'",
            args[0]
        );
        eprintln!(
            "Example: {} configs/customers.yaml,configs/overrides.toml lookup '\"hello\"'",
            args[0]
        );
        std::process::exit(1);
    }

    init_logging();

    let config_files: Vec<&str> = args[1].split(',').filter(|f| !f.is_empty()).collect();
    let target = &args[2];
    let input: Value = match args.get(3) {
        Some(raw) => serde_json::from_str(raw)
            .with_context(|| format!("input is not valid JSON: {raw}"))?,
        None => Value::Null,
    };

    let config = load_configs(&config_files)?;
    let mesh = Arc::new(Mesh::new());
    let registry = ActionRegistry::with_builtins();
    let deps = Dependencies::with_mesh(mesh.clone());
    let runtime = Arc::new(RuntimeBuilder::new(&registry, deps).from_config(&config)?);

    mesh.link(Arc::new(PipelineInvoker::new(INSTANCE_NAME, runtime.clone())))?;

    let unsatisfied: Vec<String> = mesh.unsatisfied().iter().map(ToString::to_string).collect();
    if !unsatisfied.is_empty() {
        mesh.close()?;
        return Err(ConfigError::UnsatisfiedImports(unsatisfied).into());
    }

    let mut data = DataBag::seeded(input, Value::Null);
    let result = runtime.invoke_target(target, &Context::new(), &mut data).await;

    let output = match result {
        Some(result) => result,
        None => {
            mesh.close()?;
            bail!("no pipeline named {target:?}");
        }
    };

    mesh.close()?;
    let output = output?.unwrap_or(Value::Null);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
