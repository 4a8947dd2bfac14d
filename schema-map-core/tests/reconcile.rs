use pretty_assertions::assert_eq;
use schema_map_core::{
    reconcile, reconcile_with, ConvertError, ConvertOptions, FieldSpec, LocalObject, Reconciled,
    RemoteObject, ScalarType, SchemaTable,
};
use serde_json::json;

fn member_field() -> FieldSpec {
    FieldSpec::block_set(
        "member",
        "member",
        "name",
        SchemaTable::new(vec![
            FieldSpec::scalar("name", "name", ScalarType::String),
            FieldSpec::scalar("secret", "secret", ScalarType::String).sensitive(),
        ]),
    )
}

fn remote(items: serde_json::Value) -> Vec<RemoteObject> {
    items
        .as_array()
        .expect("array")
        .iter()
        .map(|v| v.as_object().expect("object").clone())
        .collect()
}

fn member(name: &str) -> LocalObject {
    LocalObject::new().with("name", name)
}

fn summary(merged: &[Reconciled]) -> Vec<(String, bool)> {
    merged
        .iter()
        .map(|r| {
            let name = r.entry.scalar("name").map(ToString::to_string);
            (name.unwrap_or_default(), r.existed)
        })
        .collect()
}

#[test]
fn prior_order_kept_and_new_entries_appended() {
    let prior = vec![member("c"), member("a"), member("gone")];
    let fetched = remote(json!([{"name": "a"}, {"name": "b"}, {"name": "c"}, {"name": "d"}]));

    let merged = reconcile(&prior, &fetched, &member_field()).expect("reconcile");

    assert_eq!(
        summary(&merged),
        vec![
            ("c".to_string(), true),
            ("a".to_string(), true),
            ("b".to_string(), false),
            ("d".to_string(), false),
        ]
    );
}

#[test]
fn empty_remote_drops_everything() {
    let prior = vec![member("a"), member("b")];
    let merged = reconcile(&prior, &[], &member_field()).expect("reconcile");
    assert!(merged.is_empty());
}

#[test]
fn empty_prior_keeps_remote_order() {
    let fetched = remote(json!([{"name": "b"}, {"name": "a"}]));

    let merged = reconcile(&[], &fetched, &member_field()).expect("reconcile");
    assert_eq!(
        summary(&merged),
        vec![("b".to_string(), false), ("a".to_string(), false)]
    );

    let merged =
        reconcile_with(&[], &fetched, &member_field(), &ConvertOptions::import()).expect("ok");
    assert_eq!(
        summary(&merged),
        vec![("b".to_string(), false), ("a".to_string(), false)]
    );
}

#[test]
fn matched_entries_carry_sensitive_values_forward() {
    let prior = vec![member("a").with("secret", "pw")];
    let fetched = remote(json!([{"name": "a", "secret": ""}]));

    let merged = reconcile(&prior, &fetched, &member_field()).expect("reconcile");

    assert_eq!(merged[0].entry, member("a").with("secret", "pw"));
}

#[test]
fn duplicate_remote_identity_names_both_positions() {
    let fetched = remote(json!([{"name": "a"}, {"name": "b"}, {"name": "a"}]));

    let err = reconcile(&[member("a")], &fetched, &member_field()).expect_err("duplicate");

    assert_eq!(
        err,
        ConvertError::DuplicateIdentity {
            path: "member".to_string(),
            key: "a".to_string(),
            first: 0,
            second: 2,
        }
    );
    assert!(err.to_string().contains("member"));
}

#[test]
fn numeric_identity_matches_across_representations() {
    let field = FieldSpec::block_set(
        "rule",
        "rule",
        "id",
        SchemaTable::new(vec![FieldSpec::scalar("id", "id", ScalarType::Integer)]),
    );
    let prior = vec![LocalObject::new().with("id", 3), LocalObject::new().with("id", 1)];
    let fetched = remote(json!([{"id": 1.0}, {"id": "3"}]));

    let merged = reconcile(&prior, &fetched, &field).expect("reconcile");
    let ids: Vec<_> = merged
        .iter()
        .map(|r| (r.entry.scalar("id").and_then(|s| s.as_i64()), r.existed))
        .collect();
    assert_eq!(ids, vec![(Some(3), true), (Some(1), true)]);
}

#[test]
fn field_without_identity_key_is_rejected() {
    let mut field = member_field();
    field.identity_key = None;

    let err = reconcile(&[], &remote(json!([{"name": "a"}])), &field).expect_err("no key");
    assert_eq!(
        err,
        ConvertError::InvalidSchema {
            path: "member".to_string()
        }
    );
}
