//! Saved local state, one object per resource type and identifier.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use schema_map_core::{ConvertError, LocalObject, SchemaTable};
use thiserror::Error;

use crate::transport::file_stem;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state I/O failed for {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("state file {path} is not valid JSON: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("state file {path} does not match its schema: {source}")]
    Decode {
        path: String,
        source: ConvertError,
    },
}

/// Persistence for the last known local object.
///
/// Loading takes the schema table because saved objects are decoded against
/// it, the same way user input is.
pub trait StateStore {
    fn load(
        &self,
        resource_type: &str,
        id: &str,
        table: &SchemaTable,
    ) -> Result<Option<LocalObject>, StateError>;

    fn save(&self, resource_type: &str, id: &str, object: &LocalObject) -> Result<(), StateError>;

    /// Removing a missing entry is not an error.
    fn remove(&self, resource_type: &str, id: &str) -> Result<(), StateError>;
}

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    objects: Mutex<BTreeMap<(String, String), LocalObject>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateStore for MemoryStateStore {
    fn load(
        &self,
        resource_type: &str,
        id: &str,
        _table: &SchemaTable,
    ) -> Result<Option<LocalObject>, StateError> {
        let objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(objects
            .get(&(resource_type.to_string(), id.to_string()))
            .cloned())
    }

    fn save(&self, resource_type: &str, id: &str, object: &LocalObject) -> Result<(), StateError> {
        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        objects.insert((resource_type.to_string(), id.to_string()), object.clone());
        Ok(())
    }

    fn remove(&self, resource_type: &str, id: &str) -> Result<(), StateError> {
        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        objects.remove(&(resource_type.to_string(), id.to_string()));
        Ok(())
    }
}

/// State kept as `<root>/<type>/<id>.json`, in local-model JSON.
#[derive(Debug, Clone)]
pub struct DirStateStore {
    root: PathBuf,
}

impl DirStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn object_path(&self, resource_type: &str, id: &str) -> PathBuf {
        self.root
            .join(resource_type)
            .join(format!("{}.json", file_stem(id)))
    }
}

impl StateStore for DirStateStore {
    fn load(
        &self,
        resource_type: &str,
        id: &str,
        table: &SchemaTable,
    ) -> Result<Option<LocalObject>, StateError> {
        let path = self.object_path(resource_type, id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|source| StateError::Json {
                path: path.display().to_string(),
                source,
            })?;
        LocalObject::from_json(&value, table)
            .map(Some)
            .map_err(|source| StateError::Decode {
                path: path.display().to_string(),
                source,
            })
    }

    fn save(&self, resource_type: &str, id: &str, object: &LocalObject) -> Result<(), StateError> {
        let path = self.object_path(resource_type, id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        let raw =
            serde_json::to_string_pretty(&object.to_json()).map_err(|source| StateError::Json {
                path: path.display().to_string(),
                source,
            })?;
        fs::write(&path, raw).map_err(|source| io_error(&path, source))
    }

    fn remove(&self, resource_type: &str, id: &str) -> Result<(), StateError> {
        let path = self.object_path(resource_type, id);
        match fs::remove_file(&path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(io_error(&path, err)),
            _ => Ok(()),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.display().to_string(),
        source,
    }
}
