//! Identity matching for repeated nested blocks.
//!
//! A freshly fetched remote collection is merged with the previously known
//! local collection so that entries keep their local position across reads:
//! matched entries stay where they were, vanished entries are dropped and new
//! entries are appended in remote order.

use std::collections::HashMap;

use crate::convert::{normalize_scalar, object_to_local, ConvertOptions};
use crate::error::{ConvertError, FieldPath};
use crate::schema::{FieldKind, FieldSpec, SchemaTable};
use crate::value::{LocalObject, RemoteObject, Scalar};

/// One merged entry and whether it was already present locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub entry: LocalObject,
    pub existed: bool,
}

/// Merge `remote` entries into the order of `prior` entries for a
/// `Block`/`BlockSet` field, using the field's identity key.
pub fn reconcile(
    prior: &[LocalObject],
    remote: &[RemoteObject],
    field: &FieldSpec,
) -> Result<Vec<Reconciled>, ConvertError> {
    reconcile_with(prior, remote, field, &ConvertOptions::default())
}

/// [`reconcile`] with explicit conversion options for the nested entries.
pub fn reconcile_with(
    prior: &[LocalObject],
    remote: &[RemoteObject],
    field: &FieldSpec,
    opts: &ConvertOptions,
) -> Result<Vec<Reconciled>, ConvertError> {
    let refs: Vec<&RemoteObject> = remote.iter().collect();
    reconcile_at(
        prior,
        &refs,
        field,
        &FieldPath::root().field(&field.local_name),
        opts,
    )
}

pub(crate) fn reconcile_at(
    prior: &[LocalObject],
    remote: &[&RemoteObject],
    field: &FieldSpec,
    path: &FieldPath,
    opts: &ConvertOptions,
) -> Result<Vec<Reconciled>, ConvertError> {
    let identity = Identity::resolve(field, path)?;
    let remote_index = identity.index_remote(remote, path)?;

    let mut consumed = vec![false; remote.len()];
    let mut out = Vec::with_capacity(remote.len());
    let mut errors = Vec::new();

    for (prior_idx, entry) in prior.iter().enumerate() {
        let Some(key) = identity.of_local(entry, prior_idx, path)? else {
            continue;
        };
        let Some(&idx) = remote_index.get(&key) else {
            continue;
        };
        if consumed[idx] {
            continue;
        }
        consumed[idx] = true;
        match object_to_local(remote[idx], identity.nested, Some(entry), &path.index(idx), opts) {
            Ok(local) => out.push(Reconciled {
                entry: local,
                existed: true,
            }),
            Err(err) => errors.push(err),
        }
    }

    let new_entry_opts = opts.for_new_entry();
    for (idx, entry) in remote.iter().enumerate() {
        if consumed[idx] {
            continue;
        }
        match object_to_local(entry, identity.nested, None, &path.index(idx), &new_entry_opts) {
            Ok(local) => out.push(Reconciled {
                entry: local,
                existed: false,
            }),
            Err(err) => errors.push(err),
        }
    }

    ConvertError::check(errors)?;
    Ok(out)
}

/// Sort entries by the value of their `key` field; entries without it go last.
pub fn sort_by_identity(entries: &mut [LocalObject], key: &str) {
    entries.sort_by(|a, b| match (a.scalar(key), b.scalar(key)) {
        (Some(x), Some(y)) => x.sort_cmp(y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Resolved identity key of a repeated block.
pub(crate) struct Identity<'a> {
    pub(crate) key: &'a FieldSpec,
    pub(crate) nested: &'a SchemaTable,
}

impl<'a> Identity<'a> {
    pub(crate) fn resolve(field: &'a FieldSpec, path: &FieldPath) -> Result<Self, ConvertError> {
        let invalid = || ConvertError::InvalidSchema {
            path: path.to_string(),
        };
        let nested = field.nested.as_ref().ok_or_else(invalid)?;
        let key = field
            .identity_field()
            .filter(|spec| spec.kind == FieldKind::Scalar)
            .ok_or_else(invalid)?;
        Ok(Self { key, nested })
    }

    /// Map identity value to remote index, rejecting missing and duplicate keys.
    pub(crate) fn index_remote(
        &self,
        remote: &[&RemoteObject],
        path: &FieldPath,
    ) -> Result<HashMap<String, usize>, ConvertError> {
        let mut index = HashMap::with_capacity(remote.len());
        for (idx, entry) in remote.iter().enumerate() {
            let key = self.of_remote(entry, idx, path)?;
            if let Some(&first) = index.get(&key) {
                return Err(ConvertError::DuplicateIdentity {
                    path: path.to_string(),
                    key,
                    first,
                    second: idx,
                });
            }
            index.insert(key, idx);
        }
        Ok(index)
    }

    fn of_remote(
        &self,
        entry: &RemoteObject,
        idx: usize,
        path: &FieldPath,
    ) -> Result<String, ConvertError> {
        let key_path = path.index(idx).field(&self.key.local_name);
        let raw = entry
            .get(&self.key.remote_name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ConvertError::MissingIdentity {
                path: path.to_string(),
                key: self.key.local_name.clone(),
                index: idx,
            })?;
        let scalar = crate::convert::scalar_from_json(raw, self.key.scalar_type, &key_path)?;
        Ok(scalar.to_string())
    }

    /// Identity value of the local entry at `idx`, normalized to the declared
    /// type.
    pub(crate) fn of_local(
        &self,
        entry: &LocalObject,
        idx: usize,
        path: &FieldPath,
    ) -> Result<Option<String>, ConvertError> {
        let Some(scalar) = entry.scalar(&self.key.local_name) else {
            return Ok(None);
        };
        let key_path = path.index(idx).field(&self.key.local_name);
        let normalized: Scalar = normalize_scalar(scalar, self.key.scalar_type, &key_path)?;
        Ok(Some(normalized.to_string()))
    }
}
