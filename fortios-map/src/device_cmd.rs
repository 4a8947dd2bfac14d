use anyhow::{Context, Result};
use fortios_map::catalog::Catalog;
use fortios_map::report::render_plan;
use fortios_map::resource::{self, ReadOutcome, ResourceManager};
use fortios_map::state::DirStateStore;
use fortios_map::transport::{DeviceModel, DirTransport};
use schema_map_core::DiffOptions;
use tracing::info;

use crate::cli::{ApplyArgs, DeviceArgs, ObjectArgs, OutputFormat, PlanArgs};
use crate::convert_cmd::{lookup, read_local};

type DirManager<'c> = ResourceManager<'c, DirTransport, DirStateStore>;

fn manager<'c>(catalog: &'c Catalog, args: &DeviceArgs) -> DirManager<'c> {
    ResourceManager::new(
        catalog,
        DirTransport::new(&args.device_dir, DeviceModel::from_catalog(catalog)),
        DirStateStore::new(&args.state_dir),
    )
}

pub fn run_plan(catalog: &Catalog, args: PlanArgs) -> Result<()> {
    let table = lookup(catalog, &args.resource_type)?;
    let desired = read_local(&args.input, table)?;
    let state = DirStateStore::new(&args.state_dir);
    let opts = DiffOptions {
        include_identical: args.verbose,
        ..DiffOptions::default()
    };

    let plan = resource::plan(catalog, &state, &args.resource_type, &desired, &opts)
        .with_context(|| format!("failed to plan {}", args.input.display()))?;

    match args.format {
        OutputFormat::Text => println!("{}", render_plan(&plan)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
    }
    Ok(())
}

pub fn run_apply(catalog: &Catalog, args: ApplyArgs) -> Result<()> {
    let table = lookup(catalog, &args.resource_type)?;
    let desired = read_local(&args.input, table)?;
    let mgr = manager(catalog, &args.device);

    let applied = mgr
        .apply(&args.resource_type, &desired, args.device.vdom.as_deref())
        .with_context(|| format!("failed to apply {}", args.input.display()))?;
    info!(id = %applied.id, "apply complete");
    println!("{}", serde_json::to_string_pretty(&applied.local.to_json())?);
    Ok(())
}

pub fn run_refresh(catalog: &Catalog, args: ObjectArgs) -> Result<()> {
    let mgr = manager(catalog, &args.device);
    let outcome = mgr
        .read(&args.resource_type, &args.id, args.device.vdom.as_deref())
        .with_context(|| format!("failed to refresh {} '{}'", args.resource_type, args.id))?;

    match outcome {
        ReadOutcome::Present(local) => {
            println!("{}", serde_json::to_string_pretty(&local.to_json())?);
        }
        ReadOutcome::Gone => println!("gone {} [{}]", args.resource_type, args.id),
    }
    Ok(())
}

pub fn run_import(catalog: &Catalog, args: ObjectArgs) -> Result<()> {
    let mgr = manager(catalog, &args.device);
    let local = mgr
        .import(&args.resource_type, &args.id, args.device.vdom.as_deref())
        .with_context(|| format!("failed to import {} '{}'", args.resource_type, args.id))?;
    println!("{}", serde_json::to_string_pretty(&local.to_json())?);
    Ok(())
}

pub fn run_destroy(catalog: &Catalog, args: ObjectArgs) -> Result<()> {
    let mgr = manager(catalog, &args.device);
    mgr.delete(&args.resource_type, &args.id, args.device.vdom.as_deref())
        .with_context(|| format!("failed to destroy {} '{}'", args.resource_type, args.id))?;
    println!("destroyed {} [{}]", args.resource_type, args.id);
    Ok(())
}
