use serde_json::Value;

use super::coerce::scalar_to_json;
use super::ConvertOptions;
use crate::error::{ConvertError, FieldPath};
use crate::reconcile::sort_by_identity;
use crate::schema::{FieldKind, FieldSpec, SchemaTable};
use crate::value::{LocalObject, LocalValue, RemoteObject};

/// Convert a local object into its remote representation with default options.
pub fn to_remote(local: &LocalObject, table: &SchemaTable) -> Result<RemoteObject, ConvertError> {
    to_remote_with(local, table, &ConvertOptions::default())
}

/// Convert a local object into its remote representation.
///
/// Absent fields become explicit `null` (a request to clear the value on the
/// server) unless the field is `omit_when_absent`. Every failing field is
/// reported; no partial object is returned.
pub fn to_remote_with(
    local: &LocalObject,
    table: &SchemaTable,
    opts: &ConvertOptions,
) -> Result<RemoteObject, ConvertError> {
    object_to_remote(local, table, &FieldPath::root(), opts)
}

fn object_to_remote(
    local: &LocalObject,
    table: &SchemaTable,
    path: &FieldPath,
    opts: &ConvertOptions,
) -> Result<RemoteObject, ConvertError> {
    let mut out = RemoteObject::new();
    let mut errors = Vec::new();

    for name in local.keys() {
        if table.field(name).is_none() {
            errors.push(ConvertError::UnknownField {
                path: path.field(name).to_string(),
            });
        }
    }

    for field in table {
        let field_path = path.field(&field.local_name);
        match local.get(&field.local_name) {
            None if field.omit_when_absent => {}
            None => {
                out.insert(field.remote_name.clone(), Value::Null);
            }
            Some(value) => match field_to_remote(field, value, &field_path, opts) {
                Ok(converted) => {
                    out.insert(field.remote_name.clone(), converted);
                }
                Err(err) => errors.push(err),
            },
        }
    }

    ConvertError::check(errors)?;
    Ok(out)
}

fn field_to_remote(
    field: &FieldSpec,
    value: &LocalValue,
    path: &FieldPath,
    opts: &ConvertOptions,
) -> Result<Value, ConvertError> {
    match (field.kind, value) {
        (FieldKind::Scalar, LocalValue::Scalar(scalar)) => {
            scalar_to_json(scalar, field.scalar_type, path)
        }
        (FieldKind::ScalarList, LocalValue::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            let mut errors = Vec::new();
            for (idx, item) in items.iter().enumerate() {
                match scalar_to_json(item, field.scalar_type, &path.index(idx)) {
                    Ok(v) => out.push(v),
                    Err(err) => errors.push(err),
                }
            }
            ConvertError::check(errors)?;
            Ok(Value::Array(out))
        }
        (FieldKind::Block | FieldKind::BlockSet, LocalValue::Blocks(entries)) => {
            let nested = field
                .nested
                .as_ref()
                .ok_or_else(|| ConvertError::InvalidSchema {
                    path: path.to_string(),
                })?;

            let sorted;
            let entries = match (field.kind, field.identity_key.as_deref()) {
                (FieldKind::BlockSet, Some(key)) if opts.sort_sets => {
                    let mut copy = entries.to_vec();
                    sort_by_identity(&mut copy, key);
                    sorted = copy;
                    sorted.as_slice()
                }
                _ => entries,
            };

            let mut out = Vec::with_capacity(entries.len());
            let mut errors = Vec::new();
            for (idx, entry) in entries.iter().enumerate() {
                match object_to_remote(entry, nested, &path.index(idx), opts) {
                    Ok(obj) => out.push(Value::Object(obj)),
                    Err(err) => errors.push(err),
                }
            }
            ConvertError::check(errors)?;
            Ok(Value::Array(out))
        }
        (kind, other) => Err(ConvertError::mismatch(
            path,
            expected_shape(kind),
            local_shape(other),
        )),
    }
}

pub(crate) fn expected_shape(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Scalar => "scalar",
        FieldKind::ScalarList => "list of scalars",
        FieldKind::Block | FieldKind::BlockSet => "list of objects",
    }
}

fn local_shape(value: &LocalValue) -> &'static str {
    match value {
        LocalValue::Scalar(_) => "scalar",
        LocalValue::List(_) => "list of scalars",
        LocalValue::Blocks(_) => "list of objects",
    }
}
