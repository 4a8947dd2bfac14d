//! Device transports.
//!
//! A [`Transport`] moves remote objects to and from a FortiOS device. The two
//! implementations here emulate the device rather than talk to one: objects
//! live in memory or in a directory tree, `null` clears a field on update,
//! sensitive fields are accepted but never returned, and responses carry the
//! `q_origin_key` echo the real API adds.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use schema_map_core::{RemoteObject, SchemaTable};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::catalog::Catalog;

/// Optional VDOM the request is scoped to; `None` is the default VDOM.
pub type Scope<'a> = Option<&'a str>;

const DEFAULT_SCOPE: &str = "root";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{resource_type} `{id}` does not exist")]
    NotFound { resource_type: String, id: String },
    #[error("{resource_type} `{id}` already exists")]
    Conflict { resource_type: String, id: String },
    #[error("{resource_type}: {reason}")]
    Rejected {
        resource_type: String,
        reason: String,
    },
    #[error("device I/O failed for {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("device object {path} is not valid JSON: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

pub trait Transport {
    /// `Ok(None)` when the object does not exist.
    fn fetch(
        &self,
        resource_type: &str,
        id: &str,
        scope: Scope<'_>,
    ) -> Result<Option<RemoteObject>, TransportError>;

    /// Create an object and return the identifier the device assigned.
    fn create(
        &self,
        resource_type: &str,
        object: &RemoteObject,
        scope: Scope<'_>,
    ) -> Result<String, TransportError>;

    fn update(
        &self,
        resource_type: &str,
        id: &str,
        object: &RemoteObject,
        scope: Scope<'_>,
    ) -> Result<(), TransportError>;

    fn delete(
        &self,
        resource_type: &str,
        id: &str,
        scope: Scope<'_>,
    ) -> Result<(), TransportError>;
}

/// How the emulated device treats each resource type.
#[derive(Debug, Clone, Default)]
pub struct DeviceModel {
    resources: BTreeMap<String, ResourceModel>,
}

#[derive(Debug, Clone)]
struct ResourceModel {
    mkey: String,
    table: SchemaTable,
}

impl DeviceModel {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut resources = BTreeMap::new();
        for resource_type in catalog.resource_types() {
            let (Some(table), Some(meta)) =
                (catalog.table(resource_type), catalog.meta(resource_type))
            else {
                continue;
            };
            let Some(mkey) = table.field(&meta.mkey) else {
                continue;
            };
            resources.insert(
                resource_type.to_string(),
                ResourceModel {
                    mkey: mkey.remote_name.clone(),
                    table: table.clone(),
                },
            );
        }
        Self { resources }
    }

    fn resource(&self, resource_type: &str) -> Result<&ResourceModel, TransportError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| TransportError::Rejected {
                resource_type: resource_type.to_string(),
                reason: "unknown resource type".to_string(),
            })
    }

    /// Identifier and stored form of a new object.
    fn admit(
        &self,
        resource_type: &str,
        object: &RemoteObject,
    ) -> Result<(String, RemoteObject), TransportError> {
        let model = self.resource(resource_type)?;
        let id = object
            .get(&model.mkey)
            .and_then(key_string)
            .ok_or_else(|| TransportError::Rejected {
                resource_type: resource_type.to_string(),
                reason: format!("missing primary key `{}`", model.mkey),
            })?;

        let mut stored = RemoteObject::new();
        merge_into(&mut stored, object);
        Ok((id, stored))
    }

    /// Stored object as the API returns it.
    fn respond(
        &self,
        resource_type: &str,
        stored: &RemoteObject,
    ) -> Result<RemoteObject, TransportError> {
        let model = self.resource(resource_type)?;
        let mut out = stored.clone();
        redact(&mut out, &model.table);
        if let Some(key) = stored.get(&model.mkey) {
            out.insert("q_origin_key".to_string(), key.clone());
        }
        Ok(out)
    }
}

fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Apply an update: `null` removes the attribute, anything else replaces it.
fn merge_into(stored: &mut RemoteObject, patch: &RemoteObject) {
    for (name, value) in patch {
        if value.is_null() {
            stored.remove(name);
        } else {
            stored.insert(name.clone(), value.clone());
        }
    }
}

fn redact(object: &mut RemoteObject, table: &SchemaTable) {
    for field in table {
        if field.sensitive {
            object.remove(&field.remote_name);
            continue;
        }
        let (Some(nested), Some(Value::Array(entries))) =
            (field.nested.as_ref(), object.get_mut(&field.remote_name))
        else {
            continue;
        };
        for entry in entries.iter_mut() {
            if let Value::Object(entry) = entry {
                redact(entry, nested);
            }
        }
    }
}

fn scope_name(scope: Scope<'_>) -> &str {
    scope.unwrap_or(DEFAULT_SCOPE)
}

fn not_found(resource_type: &str, id: &str) -> TransportError {
    TransportError::NotFound {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
    }
}

type ObjectKey = (String, String, String);

/// Device kept in memory.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    model: DeviceModel,
    objects: Mutex<BTreeMap<ObjectKey, RemoteObject>>,
}

impl MemoryTransport {
    pub fn new(model: DeviceModel) -> Self {
        Self {
            model,
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    fn key(resource_type: &str, id: &str, scope: Scope<'_>) -> ObjectKey {
        (
            scope_name(scope).to_string(),
            resource_type.to_string(),
            id.to_string(),
        )
    }

    /// Raw stored object, including sensitive attributes.
    pub fn stored(&self, resource_type: &str, id: &str, scope: Scope<'_>) -> Option<RemoteObject> {
        let objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        objects.get(&Self::key(resource_type, id, scope)).cloned()
    }

    /// Change an object behind the caller's back, as an operator would.
    pub fn tamper(&self, resource_type: &str, id: &str, scope: Scope<'_>, patch: &RemoteObject) {
        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stored) = objects.get_mut(&Self::key(resource_type, id, scope)) {
            merge_into(stored, patch);
        }
    }
}

impl Transport for MemoryTransport {
    fn fetch(
        &self,
        resource_type: &str,
        id: &str,
        scope: Scope<'_>,
    ) -> Result<Option<RemoteObject>, TransportError> {
        match self.stored(resource_type, id, scope) {
            Some(stored) => self.model.respond(resource_type, &stored).map(Some),
            None => Ok(None),
        }
    }

    fn create(
        &self,
        resource_type: &str,
        object: &RemoteObject,
        scope: Scope<'_>,
    ) -> Result<String, TransportError> {
        let (id, stored) = self.model.admit(resource_type, object)?;
        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        let key = Self::key(resource_type, &id, scope);
        if objects.contains_key(&key) {
            return Err(TransportError::Conflict {
                resource_type: resource_type.to_string(),
                id,
            });
        }
        objects.insert(key, stored);
        Ok(id)
    }

    fn update(
        &self,
        resource_type: &str,
        id: &str,
        object: &RemoteObject,
        scope: Scope<'_>,
    ) -> Result<(), TransportError> {
        self.model.resource(resource_type)?;
        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = objects
            .get_mut(&Self::key(resource_type, id, scope))
            .ok_or_else(|| not_found(resource_type, id))?;
        merge_into(stored, object);
        Ok(())
    }

    fn delete(
        &self,
        resource_type: &str,
        id: &str,
        scope: Scope<'_>,
    ) -> Result<(), TransportError> {
        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        objects
            .remove(&Self::key(resource_type, id, scope))
            .map(|_| ())
            .ok_or_else(|| not_found(resource_type, id))
    }
}

/// Device kept as one JSON file per object: `<root>/<vdom>/<type>/<id>.json`.
#[derive(Debug, Clone)]
pub struct DirTransport {
    root: PathBuf,
    model: DeviceModel,
}

impl DirTransport {
    pub fn new(root: impl Into<PathBuf>, model: DeviceModel) -> Self {
        Self {
            root: root.into(),
            model,
        }
    }

    fn object_path(&self, resource_type: &str, id: &str, scope: Scope<'_>) -> PathBuf {
        self.root
            .join(scope_name(scope))
            .join(resource_type)
            .join(format!("{}.json", file_stem(id)))
    }

    fn read(&self, path: &Path) -> Result<Option<RemoteObject>, TransportError> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path).map_err(|source| io_error(path, source))?;
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| TransportError::Json {
                path: path.display().to_string(),
                source,
            })
    }

    fn write(&self, path: &Path, object: &RemoteObject) -> Result<(), TransportError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        let raw = serde_json::to_string_pretty(object).map_err(|source| TransportError::Json {
            path: path.display().to_string(),
            source,
        })?;
        fs::write(path, raw).map_err(|source| io_error(path, source))
    }
}

impl Transport for DirTransport {
    fn fetch(
        &self,
        resource_type: &str,
        id: &str,
        scope: Scope<'_>,
    ) -> Result<Option<RemoteObject>, TransportError> {
        let path = self.object_path(resource_type, id, scope);
        match self.read(&path)? {
            Some(stored) => self.model.respond(resource_type, &stored).map(Some),
            None => Ok(None),
        }
    }

    fn create(
        &self,
        resource_type: &str,
        object: &RemoteObject,
        scope: Scope<'_>,
    ) -> Result<String, TransportError> {
        let (id, stored) = self.model.admit(resource_type, object)?;
        let path = self.object_path(resource_type, &id, scope);
        if path.exists() {
            return Err(TransportError::Conflict {
                resource_type: resource_type.to_string(),
                id,
            });
        }
        self.write(&path, &stored)?;
        debug!(path = %path.display(), "stored device object");
        Ok(id)
    }

    fn update(
        &self,
        resource_type: &str,
        id: &str,
        object: &RemoteObject,
        scope: Scope<'_>,
    ) -> Result<(), TransportError> {
        self.model.resource(resource_type)?;
        let path = self.object_path(resource_type, id, scope);
        let mut stored = self
            .read(&path)?
            .ok_or_else(|| not_found(resource_type, id))?;
        merge_into(&mut stored, object);
        self.write(&path, &stored)
    }

    fn delete(
        &self,
        resource_type: &str,
        id: &str,
        scope: Scope<'_>,
    ) -> Result<(), TransportError> {
        let path = self.object_path(resource_type, id, scope);
        if !path.exists() {
            return Err(not_found(resource_type, id));
        }
        fs::remove_file(&path).map_err(|source| io_error(&path, source))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> TransportError {
    TransportError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Object names may contain `/` (`10.0.0.0/24`); escape it for the file system.
pub(crate) fn file_stem(id: &str) -> String {
    id.replace('%', "%25").replace('/', "%2F")
}
