//! Resource schema catalog.
//!
//! Every FortiOS resource type is described by one TOML file: the API path,
//! the primary key (`mkey`) and the field table. The files under `schemas/`
//! are compiled into the binary and collected through `inventory`; a directory
//! of files can replace them at runtime.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use schema_map_core::{FieldKind, Registry, RegistryError, SchemaTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// A schema file compiled into the binary.
pub struct EmbeddedSchema {
    pub file: &'static str,
    pub source: &'static str,
}

inventory::collect!(EmbeddedSchema);

macro_rules! embed_schema {
    ($file:literal) => {
        inventory::submit! {
            EmbeddedSchema {
                file: $file,
                source: include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/schemas/", $file)),
            }
        }
    };
}

embed_schema!("firewall_address.toml");
embed_schema!("firewall_addrgrp.toml");
embed_schema!("firewall_policy.toml");
embed_schema!("user_local.toml");
embed_schema!("vpn_ipsec_phase1interface.toml");
embed_schema!("wireless_controller_hotspot20_anqp_venue_name.toml");
embed_schema!("switch_controller_lldp_profile.toml");

/// API location and primary key of a resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceMeta {
    /// CMDB path below `/api/v2/cmdb/`, e.g. `firewall/addrgrp`.
    pub path: String,
    /// Local name of the primary-key field.
    pub mkey: String,
}

/// Raw schema file text and where it came from.
#[derive(Debug, Clone)]
pub struct SchemaSource {
    pub origin: String,
    pub raw: String,
}

/// One parsed (not yet validated) schema file.
#[derive(Debug, Clone)]
pub struct ParsedSchema {
    pub resource: String,
    pub meta: ResourceMeta,
    pub table: SchemaTable,
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    resource: String,
    path: String,
    mkey: String,
    #[serde(default)]
    field: SchemaTable,
}

/// Errors returned when loading schema files.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse schema file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("schema file {path}: {source}")]
    Registry {
        path: String,
        source: RegistryError,
    },
    #[error("schema file {path}: mkey `{mkey}` is not a top-level scalar field of `{resource}`")]
    MissingMkey {
        path: String,
        resource: String,
        mkey: String,
    },
}

/// Validated schema tables plus per-resource metadata.
#[derive(Debug, Clone)]
pub struct Catalog {
    registry: Registry,
    meta: BTreeMap<String, ResourceMeta>,
    origin: String,
}

impl Catalog {
    /// Catalog built from the schema files compiled into the binary.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_sources(embedded_sources(), "embedded")
    }

    /// Catalog built from every `*.toml` file in `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, CatalogError> {
        let sources = dir_sources(dir)?;
        Self::from_sources(sources, &format!("dir:{}", dir.display()))
    }

    /// `load_dir` when a directory is given, `embedded` otherwise.
    pub fn resolve(dir: Option<&Path>) -> Result<Self, CatalogError> {
        match dir {
            Some(dir) => Self::load_dir(dir),
            None => Self::embedded(),
        }
    }

    pub fn from_sources(
        sources: Vec<SchemaSource>,
        origin: &str,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Catalog {
            registry: Registry::new(),
            meta: BTreeMap::new(),
            origin: origin.to_string(),
        };
        for source in sources {
            let parsed = parse_source(&source)?;
            check_mkey(&parsed, &source.origin)?;
            catalog
                .registry
                .register(parsed.resource.clone(), parsed.table)
                .map_err(|err| CatalogError::Registry {
                    path: source.origin.clone(),
                    source: err,
                })?;
            debug!(resource = %parsed.resource, origin = %source.origin, "registered schema");
            catalog.meta.insert(parsed.resource, parsed.meta);
        }
        Ok(catalog)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn table(&self, resource_type: &str) -> Option<&SchemaTable> {
        self.registry.lookup(resource_type)
    }

    pub fn meta(&self, resource_type: &str) -> Option<&ResourceMeta> {
        self.meta.get(resource_type)
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.registry.resource_types()
    }

    /// `embedded` or `dir:<path>`.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

/// Schema files compiled into the binary, sorted by file name.
pub fn embedded_sources() -> Vec<SchemaSource> {
    let mut sources: Vec<SchemaSource> = inventory::iter::<EmbeddedSchema>
        .into_iter()
        .map(|schema| SchemaSource {
            origin: format!("embedded:{}", schema.file),
            raw: schema.source.to_string(),
        })
        .collect();
    sources.sort_by(|a, b| a.origin.cmp(&b.origin));
    sources
}

/// Every `*.toml` file in `dir`, sorted by path.
pub fn dir_sources(dir: &Path) -> Result<Vec<SchemaSource>, CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: dir.display().to_string(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let raw = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Ok(SchemaSource {
                origin: path.display().to_string(),
                raw,
            })
        })
        .collect()
}

/// Parse one schema file without validating the table.
pub fn parse_source(source: &SchemaSource) -> Result<ParsedSchema, CatalogError> {
    let file: SchemaFile = toml::from_str(&source.raw).map_err(|err| CatalogError::Parse {
        path: source.origin.clone(),
        source: err,
    })?;
    Ok(ParsedSchema {
        resource: file.resource,
        meta: ResourceMeta {
            path: file.path,
            mkey: file.mkey,
        },
        table: file.field,
    })
}

/// The mkey must name a top-level scalar field.
pub fn check_mkey(parsed: &ParsedSchema, origin: &str) -> Result<(), CatalogError> {
    match parsed.table.field(&parsed.meta.mkey) {
        Some(field) if field.kind == FieldKind::Scalar => Ok(()),
        _ => Err(CatalogError::MissingMkey {
            path: origin.to_string(),
            resource: parsed.resource.clone(),
            mkey: parsed.meta.mkey.clone(),
        }),
    }
}
