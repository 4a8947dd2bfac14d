use serde_json::Value;

use super::coerce::{describe, scalar_from_json};
use super::remote::expected_shape;
use crate::error::{ConvertError, FieldPath};
use crate::schema::{FieldKind, SchemaTable};
use crate::value::{LocalObject, LocalValue};

/// Decode local JSON (local names, typed values) against a schema table.
///
/// `null` means "unset". Unknown keys are rejected so typos in hand-written
/// input surface instead of silently clearing the real field.
pub(crate) fn decode_local(
    value: &Value,
    table: &SchemaTable,
) -> Result<LocalObject, ConvertError> {
    decode_object(value, table, &FieldPath::root())
}

fn decode_object(
    value: &Value,
    table: &SchemaTable,
    path: &FieldPath,
) -> Result<LocalObject, ConvertError> {
    let map = value
        .as_object()
        .ok_or_else(|| ConvertError::mismatch(path, "object", describe(value)))?;

    let mut out = LocalObject::new();
    let mut errors = Vec::new();
    for (name, raw) in map {
        let field_path = path.field(name);
        let Some(field) = table.field(name) else {
            errors.push(ConvertError::UnknownField {
                path: field_path.to_string(),
            });
            continue;
        };
        if raw.is_null() {
            continue;
        }

        let decoded = match field.kind {
            FieldKind::Scalar => {
                scalar_from_json(raw, field.scalar_type, &field_path).map(LocalValue::Scalar)
            }
            FieldKind::ScalarList => {
                let expected = expected_shape(field.kind);
                decode_list(raw, &field_path, expected, |item, item_path| {
                    scalar_from_json(item, field.scalar_type, item_path)
                })
                .map(LocalValue::List)
            }
            FieldKind::Block | FieldKind::BlockSet => match field.nested.as_ref() {
                Some(nested) => {
                    let expected = expected_shape(field.kind);
                    decode_list(raw, &field_path, expected, |item, item_path| {
                        decode_object(item, nested, item_path)
                    })
                    .map(LocalValue::Blocks)
                }
                None => Err(ConvertError::InvalidSchema {
                    path: field_path.to_string(),
                }),
            },
        };

        match decoded {
            Ok(v) => {
                out.insert(name.clone(), v);
            }
            Err(err) => errors.push(err),
        }
    }

    ConvertError::check(errors)?;
    Ok(out)
}

fn decode_list<T>(
    raw: &Value,
    path: &FieldPath,
    expected: &str,
    mut decode: impl FnMut(&Value, &FieldPath) -> Result<T, ConvertError>,
) -> Result<Vec<T>, ConvertError> {
    let items = raw
        .as_array()
        .ok_or_else(|| ConvertError::mismatch(path, expected, describe(raw)))?;
    let mut out = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (idx, item) in items.iter().enumerate() {
        match decode(item, &path.index(idx)) {
            Ok(v) => out.push(v),
            Err(err) => errors.push(err),
        }
    }
    ConvertError::check(errors)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::decode_local;
    use crate::error::ConvertError;
    use crate::schema::{FieldSpec, ScalarType, SchemaTable};
    use crate::value::{LocalObject, Scalar};

    fn table() -> SchemaTable {
        SchemaTable::new(vec![
            FieldSpec::scalar("name", "name", ScalarType::String),
            FieldSpec::scalar_list("ports", "ports", ScalarType::Integer),
            FieldSpec::block_set(
                "member",
                "member",
                "name",
                SchemaTable::new(vec![FieldSpec::scalar("name", "name", ScalarType::String)]),
            ),
        ])
    }

    #[test]
    fn decodes_nested_blocks_and_lists() {
        let local = decode_local(
            &json!({"name": "grp", "member": [{"name": "a"}], "comment": null}),
            &table(),
        );
        // `comment` is unknown even when null.
        assert!(matches!(local, Err(ConvertError::UnknownField { ref path }) if path == "comment"));

        let local = decode_local(
            &json!({"name": "grp", "ports": [80, "443"], "member": [{"name": "a"}]}),
            &table(),
        )
        .expect("decode");
        assert_eq!(
            local,
            LocalObject::new()
                .with("name", "grp")
                .with("ports", vec![Scalar::from(80), Scalar::from(443)])
                .with("member", vec![LocalObject::new().with("name", "a")])
        );
    }

    #[test]
    fn null_means_unset() {
        let local = decode_local(&json!({"name": null}), &table()).expect("decode");
        assert!(local.is_empty());
    }

    #[test]
    fn non_list_block_is_rejected() {
        let err = decode_local(&json!({"member": "a"}), &table()).expect_err("not a list");
        assert_eq!(err.path(), Some("member"));
    }
}
