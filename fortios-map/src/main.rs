use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use fortios_map::catalog::{
    check_mkey, dir_sources, embedded_sources, parse_source, Catalog, ResourceMeta,
};
use fortios_map::inspect::render_schema;
use schema_map_core::validate;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

mod cli;
mod convert_cmd;
mod device_cmd;

use cli::{Cli, Command, InspectArgs, OutputFormat, SchemasArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let schemas_dir = cli.schemas_dir.as_deref();
    let load = || Catalog::resolve(schemas_dir).context("failed to load resource schemas");

    match cli.command {
        Command::Schemas(args) => run_schemas(&load()?, args),
        Command::Inspect(args) => run_inspect(&load()?, args),
        Command::Validate => run_validate(schemas_dir),
        Command::ToRemote(args) => convert_cmd::run_to_remote(&load()?, args),
        Command::ToLocal(args) => convert_cmd::run_to_local(&load()?, args),
        Command::Plan(args) => device_cmd::run_plan(&load()?, args),
        Command::Apply(args) => device_cmd::run_apply(&load()?, args),
        Command::Refresh(args) => device_cmd::run_refresh(&load()?, args),
        Command::Import(args) => device_cmd::run_import(&load()?, args),
        Command::Destroy(args) => device_cmd::run_destroy(&load()?, args),
    }
}

#[derive(Debug, Serialize)]
struct SchemaRow<'a> {
    resource_type: &'a str,
    #[serde(flatten)]
    meta: &'a ResourceMeta,
    fields: usize,
}

fn run_schemas(catalog: &Catalog, args: SchemasArgs) -> Result<()> {
    let rows: Vec<SchemaRow<'_>> = catalog
        .resource_types()
        .filter_map(|resource_type| {
            let table = catalog.table(resource_type)?;
            let meta = catalog.meta(resource_type)?;
            Some(SchemaRow {
                resource_type,
                meta,
                fields: table.len(),
            })
        })
        .collect();

    match args.format {
        OutputFormat::Text => {
            for row in &rows {
                println!(
                    "{} path={} mkey={} fields={}",
                    row.resource_type, row.meta.path, row.meta.mkey, row.fields
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
    }
    Ok(())
}

fn run_inspect(catalog: &Catalog, args: InspectArgs) -> Result<()> {
    let table = convert_cmd::lookup(catalog, &args.resource_type)?;
    if let Some(meta) = catalog.meta(&args.resource_type) {
        println!(
            "{} path={} mkey={}",
            args.resource_type, meta.path, meta.mkey
        );
    }
    print!("{}", render_schema(table, args.depth));
    Ok(())
}

/// Check each schema file on its own so one broken file does not hide the rest.
fn run_validate(schemas_dir: Option<&Path>) -> Result<()> {
    let sources = match schemas_dir {
        Some(dir) => dir_sources(dir)?,
        None => embedded_sources(),
    };

    let mut failed = 0;
    for source in &sources {
        let problems: Vec<String> = match parse_source(source) {
            Err(err) => vec![err.to_string()],
            Ok(parsed) => {
                let mut problems = Vec::new();
                if let Err(err) = validate(&parsed.table) {
                    problems.extend(err.violations.iter().map(ToString::to_string));
                }
                if let Err(err) = check_mkey(&parsed, &source.origin) {
                    problems.push(err.to_string());
                }
                problems
            }
        };

        if problems.is_empty() {
            println!("ok {}", source.origin);
            continue;
        }
        failed += 1;
        println!("invalid {}", source.origin);
        for problem in problems {
            println!("  - {problem}");
        }
    }

    if failed > 0 {
        bail!("{failed} of {} schema file(s) invalid", sources.len());
    }
    Ok(())
}
