use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "fortios-map")]
#[command(about = "Map FortiOS configuration objects between local JSON and the device API model")]
pub struct Cli {
    /// Load schema files from this directory instead of the embedded set.
    #[arg(long, global = true)]
    pub schemas_dir: Option<PathBuf>,
    /// Log filter used when RUST_LOG is not set (for example `debug`).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// List known resource types.
    Schemas(SchemasArgs),
    /// Show the field tree of one resource type.
    Inspect(InspectArgs),
    /// Check every schema file and report all problems.
    Validate,
    /// Convert a local JSON object into the device representation.
    ToRemote(ToRemoteArgs),
    /// Convert a device JSON object into the local representation.
    ToLocal(ToLocalArgs),
    /// Show what applying a local object would change in saved state.
    Plan(PlanArgs),
    /// Create or update a local object on the device and save the result.
    Apply(ApplyArgs),
    /// Refresh saved state of one object from the device.
    Refresh(ObjectArgs),
    /// Adopt an existing device object into saved state.
    Import(ObjectArgs),
    /// Delete one object from the device and drop its saved state.
    Destroy(ObjectArgs),
}

#[derive(Parser, Debug)]
pub struct SchemasArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    pub resource_type: String,
    #[arg(long, default_value_t = 3)]
    pub depth: usize,
}

#[derive(Parser, Debug)]
pub struct ToRemoteArgs {
    pub resource_type: String,
    /// Local JSON object.
    pub input: PathBuf,
    /// Sort identity-matched collections by key.
    #[arg(long)]
    pub sort_sets: bool,
    /// Write the result here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ToLocalArgs {
    pub resource_type: String,
    /// Device JSON object.
    pub input: PathBuf,
    /// Previously known local object (keeps secrets and ordering).
    #[arg(long)]
    pub prior: Option<PathBuf>,
    /// Only bring in block fields the prior object already has.
    #[arg(long)]
    pub known_only: bool,
    /// Sort identity-matched collections that have no prior ordering.
    #[arg(long)]
    pub sort_sets: bool,
    /// Write the result here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    pub resource_type: String,
    /// Desired local JSON object.
    pub input: PathBuf,
    /// Saved state directory (`<dir>/<type>/<id>.json`).
    #[arg(long)]
    pub state_dir: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Include unchanged fields.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(clap::Args, Debug)]
pub struct DeviceArgs {
    /// Emulated device directory (`<dir>/<vdom>/<type>/<id>.json`).
    #[arg(long)]
    pub device_dir: PathBuf,
    /// Saved state directory (`<dir>/<type>/<id>.json`).
    #[arg(long)]
    pub state_dir: PathBuf,
    /// VDOM to operate in; defaults to the root VDOM.
    #[arg(long)]
    pub vdom: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ApplyArgs {
    pub resource_type: String,
    /// Desired local JSON object.
    pub input: PathBuf,
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Parser, Debug)]
pub struct ObjectArgs {
    pub resource_type: String,
    /// Object identifier (value of the primary key).
    pub id: String,
    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
