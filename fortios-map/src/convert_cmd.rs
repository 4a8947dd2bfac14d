use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fortios_map::catalog::Catalog;
use schema_map_core::{
    to_local_with, to_remote_with, ConvertOptions, LocalObject, NestedPolicy, RemoteObject,
    SchemaTable,
};
use serde_json::Value;
use tracing::debug;

use crate::cli::{ToLocalArgs, ToRemoteArgs};

pub fn run_to_remote(catalog: &Catalog, args: ToRemoteArgs) -> Result<()> {
    let table = lookup(catalog, &args.resource_type)?;
    let local = read_local(&args.input, table)?;
    let opts = ConvertOptions {
        sort_sets: args.sort_sets,
        ..ConvertOptions::default()
    };

    let remote = to_remote_with(&local, table, &opts).with_context(|| {
        format!(
            "failed to convert {} as {}",
            args.input.display(),
            args.resource_type
        )
    })?;
    emit(&Value::Object(remote), args.output.as_deref(), &[&args.input])
}

pub fn run_to_local(catalog: &Catalog, args: ToLocalArgs) -> Result<()> {
    let table = lookup(catalog, &args.resource_type)?;
    let remote = read_remote(&args.input)?;
    let prior = args
        .prior
        .as_deref()
        .map(|path| read_local(path, table))
        .transpose()?;
    let opts = ConvertOptions {
        nested_policy: if args.known_only {
            NestedPolicy::KnownOnly
        } else {
            NestedPolicy::Always
        },
        sort_sets: args.sort_sets,
    };
    debug!(
        resource_type = %args.resource_type,
        prior = prior.is_some(),
        ?opts,
        "converting device object"
    );

    let local = to_local_with(&remote, table, prior.as_ref(), &opts).with_context(|| {
        format!(
            "failed to convert {} as {}",
            args.input.display(),
            args.resource_type
        )
    })?;

    let mut inputs = vec![args.input.as_path()];
    inputs.extend(args.prior.as_deref());
    emit(&local.to_json(), args.output.as_deref(), &inputs)
}

pub fn lookup<'a>(catalog: &'a Catalog, resource_type: &str) -> Result<&'a SchemaTable> {
    catalog.table(resource_type).with_context(|| {
        format!(
            "unknown resource type '{resource_type}' (schemas: {})",
            catalog.origin()
        )
    })
}

pub fn read_json(path: &Path) -> Result<Value> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn read_local(path: &Path, table: &SchemaTable) -> Result<LocalObject> {
    let value = read_json(path)?;
    LocalObject::from_json(&value, table)
        .with_context(|| format!("invalid local object {}", path.display()))
}

fn read_remote(path: &Path) -> Result<RemoteObject> {
    match read_json(path)? {
        Value::Object(map) => Ok(map),
        _ => bail!("{} is not a JSON object", path.display()),
    }
}

fn emit(value: &Value, output: Option<&Path>, inputs: &[&Path]) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            guard_output(path, inputs)?;
            fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

/// Converted output must never replace one of the files it was read from.
fn guard_output(output: &Path, inputs: &[&Path]) -> Result<()> {
    let target = resolve_file(output)?;
    for input in inputs {
        if resolve_file(input)? == target {
            bail!(
                "refusing to overwrite input file {} with converted output",
                input.display()
            );
        }
    }
    Ok(())
}

/// Canonical location of a file that may not exist yet: its directory must.
fn resolve_file(path: &Path) -> Result<PathBuf> {
    if let Ok(real) = path.canonicalize() {
        return Ok(real);
    }
    let name = path
        .file_name()
        .with_context(|| format!("{} does not name a file", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let dir = dir
        .canonicalize()
        .with_context(|| format!("directory of {} does not exist", path.display()))?;
    Ok(dir.join(name))
}
