use std::collections::HashMap;

use serde_json::Value;

use super::coerce::{describe, scalar_from_json};
use super::remote::expected_shape;
use super::{ConvertOptions, NestedPolicy};
use crate::error::{ConvertError, FieldPath};
use crate::reconcile::{reconcile_at, sort_by_identity, Identity};
use crate::schema::{FieldKind, FieldSpec, SchemaTable};
use crate::value::{LocalObject, LocalValue, RemoteObject};

/// Convert a remote object into the local model with default options.
///
/// `prior` is the previously known local object, if any. It supplies values
/// for sensitive fields the remote side never returns and the ordering of
/// `BlockSet` collections.
pub fn to_local(
    remote: &RemoteObject,
    table: &SchemaTable,
    prior: Option<&LocalObject>,
) -> Result<LocalObject, ConvertError> {
    to_local_with(remote, table, prior, &ConvertOptions::default())
}

/// Convert a remote object into the local model.
pub fn to_local_with(
    remote: &RemoteObject,
    table: &SchemaTable,
    prior: Option<&LocalObject>,
    opts: &ConvertOptions,
) -> Result<LocalObject, ConvertError> {
    object_to_local(remote, table, prior, &FieldPath::root(), opts)
}

pub(crate) fn object_to_local(
    remote: &RemoteObject,
    table: &SchemaTable,
    prior: Option<&LocalObject>,
    path: &FieldPath,
    opts: &ConvertOptions,
) -> Result<LocalObject, ConvertError> {
    let mut out = LocalObject::new();
    let mut errors = Vec::new();

    for field in table {
        let field_path = path.field(&field.local_name);
        let prior_value = prior.and_then(|p| p.get(&field.local_name));
        let remote_value = remote
            .get(&field.remote_name)
            .filter(|v| !v.is_null())
            .filter(|v| !(field.sensitive && is_empty_json(v)));

        let Some(remote_value) = remote_value else {
            if field.sensitive {
                if let Some(kept) = prior_value.filter(|v| !v.is_empty()) {
                    out.insert(field.local_name.clone(), kept.clone());
                }
            }
            continue;
        };

        let known_only = opts.nested_policy == NestedPolicy::KnownOnly;
        if field.is_block() && known_only && prior_value.is_none() {
            continue;
        }

        match field_to_local(field, remote_value, prior_value, &field_path, opts) {
            Ok(value) => {
                out.insert(field.local_name.clone(), value);
            }
            Err(err) => errors.push(err),
        }
    }

    ConvertError::check(errors)?;
    Ok(out)
}

fn field_to_local(
    field: &FieldSpec,
    value: &Value,
    prior: Option<&LocalValue>,
    path: &FieldPath,
    opts: &ConvertOptions,
) -> Result<LocalValue, ConvertError> {
    match field.kind {
        FieldKind::Scalar => {
            scalar_from_json(value, field.scalar_type, path).map(LocalValue::Scalar)
        }
        FieldKind::ScalarList => {
            let items = value.as_array().ok_or_else(|| {
                ConvertError::mismatch(path, expected_shape(field.kind), describe(value))
            })?;
            let mut out = Vec::with_capacity(items.len());
            let mut errors = Vec::new();
            for (idx, item) in items.iter().enumerate() {
                match scalar_from_json(item, field.scalar_type, &path.index(idx)) {
                    Ok(scalar) => out.push(scalar),
                    Err(err) => errors.push(err),
                }
            }
            ConvertError::check(errors)?;
            Ok(LocalValue::List(out))
        }
        FieldKind::Block | FieldKind::BlockSet => {
            let entries = remote_entries(field, value, path)?;
            let prior_entries = prior.and_then(LocalValue::as_blocks).unwrap_or(&[]);
            if field.kind == FieldKind::Block {
                ordered_blocks(field, &entries, prior_entries, path, opts)
            } else {
                let mut merged: Vec<LocalObject> =
                    reconcile_at(prior_entries, &entries, field, path, opts)?
                        .into_iter()
                        .map(|r| r.entry)
                        .collect();
                if opts.sort_sets && prior_entries.is_empty() {
                    if let Some(key) = field.identity_key.as_deref() {
                        sort_by_identity(&mut merged, key);
                    }
                }
                Ok(LocalValue::Blocks(merged))
            }
        }
    }
}

/// Ordered blocks keep remote order; prior entries are consulted by identity
/// only so nested sensitive values can be carried forward.
fn ordered_blocks(
    field: &FieldSpec,
    entries: &[&RemoteObject],
    prior_entries: &[LocalObject],
    path: &FieldPath,
    opts: &ConvertOptions,
) -> Result<LocalValue, ConvertError> {
    let identity = Identity::resolve(field, path)?;
    let index = identity.index_remote(entries, path)?;
    let mut keys = vec![String::new(); entries.len()];
    for (key, idx) in index {
        keys[idx] = key;
    }

    let mut by_key: HashMap<String, &LocalObject> = HashMap::new();
    for (idx, entry) in prior_entries.iter().enumerate() {
        if let Some(key) = identity.of_local(entry, idx, path)? {
            by_key.entry(key).or_insert(entry);
        }
    }

    let new_entry_opts = opts.for_new_entry();
    let mut out = Vec::with_capacity(entries.len());
    let mut errors = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        let prior = by_key.get(&keys[idx]).copied();
        let entry_opts = if prior.is_some() { opts } else { &new_entry_opts };
        match object_to_local(entry, identity.nested, prior, &path.index(idx), entry_opts) {
            Ok(local) => out.push(local),
            Err(err) => errors.push(err),
        }
    }
    ConvertError::check(errors)?;
    Ok(LocalValue::Blocks(out))
}

fn remote_entries<'v>(
    field: &FieldSpec,
    value: &'v Value,
    path: &FieldPath,
) -> Result<Vec<&'v RemoteObject>, ConvertError> {
    let items = value
        .as_array()
        .ok_or_else(|| ConvertError::mismatch(path, expected_shape(field.kind), describe(value)))?;
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            item.as_object()
                .ok_or_else(|| ConvertError::mismatch(&path.index(idx), "object", describe(item)))
        })
        .collect()
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
