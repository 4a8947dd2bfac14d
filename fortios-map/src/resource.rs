//! Resource lifecycle on top of the conversion engine.
//!
//! [`ResourceManager`] ties a [`Catalog`], a [`Transport`] and a
//! [`StateStore`] together: every write is read back from the device and the
//! result becomes the new saved state, so sensitive values and local ordering
//! survive the round trip.

use schema_map_core::{
    diff_with_options, to_local, to_local_with, to_remote, ConvertError, ConvertOptions,
    DiffEntry, DiffOptions, LocalObject, NestedPolicy, SchemaTable,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, ResourceMeta};
use crate::state::{StateError, StateStore};
use crate::transport::{Scope, Transport, TransportError};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("unknown resource type `{0}`")]
    UnknownResource(String),
    #[error("{resource_type}: object has no value for primary key `{mkey}`")]
    MissingMkey { resource_type: String, mkey: String },
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    State(#[from] StateError),
}

/// Result of refreshing an object from the device.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Present(LocalObject),
    /// The device no longer has the object; its saved state was dropped.
    Gone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub id: String,
    pub local: LocalObject,
}

/// What applying a desired object would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanAction {
    Create,
    Update,
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub resource_type: String,
    pub id: String,
    pub action: PlanAction,
    pub entries: Vec<DiffEntry>,
}

pub struct ResourceManager<'c, T, S> {
    catalog: &'c Catalog,
    transport: T,
    state: S,
}

impl<'c, T: Transport, S: StateStore> ResourceManager<'c, T, S> {
    pub fn new(catalog: &'c Catalog, transport: T, state: S) -> Self {
        Self {
            catalog,
            transport,
            state,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Create `desired` on the device and save what the device reports back.
    pub fn create(
        &self,
        resource_type: &str,
        desired: &LocalObject,
        scope: Scope<'_>,
    ) -> Result<Applied, ResourceError> {
        let (table, meta) = resource(self.catalog, resource_type)?;
        mkey_value(resource_type, meta, desired)?;
        let remote = to_remote(desired, table)?;

        let id = self.transport.create(resource_type, &remote, scope)?;
        info!(resource_type, id = %id, vdom = ?scope, "created object");

        let local = self.read_back(resource_type, &id, table, desired, scope)?;
        Ok(Applied { id, local })
    }

    /// Update the object when the device already has it, create it otherwise.
    pub fn apply(
        &self,
        resource_type: &str,
        desired: &LocalObject,
        scope: Scope<'_>,
    ) -> Result<Applied, ResourceError> {
        let (_, meta) = resource(self.catalog, resource_type)?;
        let id = mkey_value(resource_type, meta, desired)?;
        if self.transport.fetch(resource_type, &id, scope)?.is_none() {
            return self.create(resource_type, desired, scope);
        }
        let local = self.update(resource_type, &id, desired, scope)?;
        Ok(Applied { id, local })
    }

    /// Refresh saved state from the device.
    ///
    /// Only block fields already present in saved state are brought in.
    pub fn read(
        &self,
        resource_type: &str,
        id: &str,
        scope: Scope<'_>,
    ) -> Result<ReadOutcome, ResourceError> {
        let (table, _) = resource(self.catalog, resource_type)?;
        let prior = self.state.load(resource_type, id, table)?;

        let Some(remote) = self.transport.fetch(resource_type, id, scope)? else {
            warn!(resource_type, id, "object vanished from device, dropping state");
            self.state.remove(resource_type, id)?;
            return Ok(ReadOutcome::Gone);
        };

        let opts = ConvertOptions {
            nested_policy: NestedPolicy::KnownOnly,
            ..ConvertOptions::default()
        };
        let local = to_local_with(&remote, table, prior.as_ref(), &opts)?;
        self.state.save(resource_type, id, &local)?;
        debug!(resource_type, id, fields = local.len(), "refreshed object");
        Ok(ReadOutcome::Present(local))
    }

    pub fn update(
        &self,
        resource_type: &str,
        id: &str,
        desired: &LocalObject,
        scope: Scope<'_>,
    ) -> Result<LocalObject, ResourceError> {
        let (table, _) = resource(self.catalog, resource_type)?;
        let remote = to_remote(desired, table)?;

        self.transport.update(resource_type, id, &remote, scope)?;
        info!(resource_type, id, vdom = ?scope, "updated object");

        self.read_back(resource_type, id, table, desired, scope)
    }

    /// Delete the object; an object already gone counts as deleted.
    pub fn delete(
        &self,
        resource_type: &str,
        id: &str,
        scope: Scope<'_>,
    ) -> Result<(), ResourceError> {
        resource(self.catalog, resource_type)?;
        match self.transport.delete(resource_type, id, scope) {
            Ok(()) => info!(resource_type, id, vdom = ?scope, "deleted object"),
            Err(TransportError::NotFound { .. }) => {
                debug!(resource_type, id, "object already absent");
            }
            Err(err) => return Err(err.into()),
        }
        self.state.remove(resource_type, id)?;
        Ok(())
    }

    /// Adopt an existing device object nobody has managed before.
    ///
    /// Every block field is brought in and set collections are sorted so the
    /// first saved state is deterministic.
    pub fn import(
        &self,
        resource_type: &str,
        id: &str,
        scope: Scope<'_>,
    ) -> Result<LocalObject, ResourceError> {
        let (table, _) = resource(self.catalog, resource_type)?;
        let remote = self
            .transport
            .fetch(resource_type, id, scope)?
            .ok_or_else(|| TransportError::NotFound {
                resource_type: resource_type.to_string(),
                id: id.to_string(),
            })?;

        let local = to_local_with(&remote, table, None, &ConvertOptions::import())?;
        self.state.save(resource_type, id, &local)?;
        info!(resource_type, id, vdom = ?scope, "imported object");
        Ok(local)
    }

    pub fn plan(&self, resource_type: &str, desired: &LocalObject) -> Result<Plan, ResourceError> {
        plan(
            self.catalog,
            &self.state,
            resource_type,
            desired,
            &DiffOptions::default(),
        )
    }

    fn read_back(
        &self,
        resource_type: &str,
        id: &str,
        table: &SchemaTable,
        desired: &LocalObject,
        scope: Scope<'_>,
    ) -> Result<LocalObject, ResourceError> {
        let remote = self
            .transport
            .fetch(resource_type, id, scope)?
            .ok_or_else(|| TransportError::NotFound {
                resource_type: resource_type.to_string(),
                id: id.to_string(),
            })?;
        let local = to_local(&remote, table, Some(desired))?;
        self.state.save(resource_type, id, &local)?;
        Ok(local)
    }
}

/// Compare saved state with `desired`, keyed by the object's primary key.
pub fn plan<S: StateStore>(
    catalog: &Catalog,
    state: &S,
    resource_type: &str,
    desired: &LocalObject,
    opts: &DiffOptions,
) -> Result<Plan, ResourceError> {
    let (table, meta) = resource(catalog, resource_type)?;
    let id = mkey_value(resource_type, meta, desired)?;
    // Validates the desired object the same way an apply would.
    to_remote(desired, table)?;

    let (action, entries) = match state.load(resource_type, &id, table)? {
        Some(saved) => {
            let entries = diff_with_options(&saved, desired, table, opts);
            let action = if !entries.iter().any(DiffEntry::is_change) {
                PlanAction::NoOp
            } else {
                PlanAction::Update
            };
            (action, entries)
        }
        None => {
            let entries = diff_with_options(&LocalObject::new(), desired, table, opts);
            (PlanAction::Create, entries)
        }
    };

    Ok(Plan {
        resource_type: resource_type.to_string(),
        id,
        action,
        entries,
    })
}

fn resource<'a>(
    catalog: &'a Catalog,
    resource_type: &str,
) -> Result<(&'a SchemaTable, &'a ResourceMeta), ResourceError> {
    catalog
        .table(resource_type)
        .zip(catalog.meta(resource_type))
        .ok_or_else(|| ResourceError::UnknownResource(resource_type.to_string()))
}

/// Primary key of a local object as the identifier string.
pub fn mkey_value(
    resource_type: &str,
    meta: &ResourceMeta,
    object: &LocalObject,
) -> Result<String, ResourceError> {
    object
        .scalar(&meta.mkey)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| ResourceError::MissingMkey {
            resource_type: resource_type.to_string(),
            mkey: meta.mkey.clone(),
        })
}
