use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use schema_map_core::{
    to_local, to_local_with, to_remote, to_remote_with, validate, ConvertError, ConvertOptions,
    FieldSpec, LocalObject, NestedPolicy, RemoteObject, ScalarType, SchemaTable,
};
use serde::Deserialize;
use serde_json::{json, Value};

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

#[derive(Deserialize)]
struct SchemaFile {
    field: SchemaTable,
}

fn policy_table() -> SchemaTable {
    let raw = fs::read_to_string(fixture("fixtures/schemas/firewall_policy.toml"))
        .expect("read schema");
    let file: SchemaFile = toml::from_str(&raw).expect("parse schema");
    validate(&file.field).expect("valid schema");
    file.field
}

fn read_json(path: &str) -> Value {
    let raw = fs::read_to_string(fixture(path)).expect("read json");
    serde_json::from_str(&raw).expect("parse json")
}

fn policy_remote() -> RemoteObject {
    read_json("fixtures/policy_remote.json")
        .as_object()
        .expect("object")
        .clone()
}

fn policy_local(table: &SchemaTable) -> LocalObject {
    LocalObject::from_json(&read_json("fixtures/policy_local.json"), table).expect("decode local")
}

fn names(obj: &LocalObject, field: &str) -> Vec<String> {
    obj.blocks(field)
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| entry.scalar("name").map(ToString::to_string))
        .collect()
}

fn rule_ids(obj: &LocalObject) -> Vec<i64> {
    obj.blocks("rule")
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| entry.scalar("id").and_then(|id| id.as_i64()))
        .collect()
}

#[test]
fn fresh_read_keeps_remote_order() {
    let table = policy_table();
    let local = to_local(&policy_remote(), &table, None).expect("to_local");

    assert_eq!(names(&local, "srcaddr"), vec!["lan-net", "guest-net"]);
    assert_eq!(names(&local, "service"), vec!["HTTPS", "DNS", "HTTP"]);
    assert_eq!(rule_ids(&local), vec![2, 1]);
    assert_eq!(local.scalar("policyid").and_then(|s| s.as_i64()), Some(12));
    assert!(!local.contains("psk"));
    assert!(!local.contains("comments"));
}

#[test]
fn import_sorts_sets_but_not_ordered_blocks() {
    let table = policy_table();
    let local = to_local_with(&policy_remote(), &table, None, &ConvertOptions::import())
        .expect("to_local");

    assert_eq!(names(&local, "srcaddr"), vec!["guest-net", "lan-net"]);
    assert_eq!(names(&local, "service"), vec!["DNS", "HTTP", "HTTPS"]);
    assert_eq!(rule_ids(&local), vec![2, 1]);
}

#[test]
fn read_with_prior_keeps_local_order_and_secrets() {
    let table = policy_table();
    let prior = policy_local(&table);
    let local = to_local(&policy_remote(), &table, Some(&prior)).expect("to_local");

    // Prior order wins; DNS is new and goes last.
    assert_eq!(names(&local, "srcaddr"), vec!["guest-net", "lan-net"]);
    assert_eq!(names(&local, "service"), vec!["HTTP", "HTTPS", "DNS"]);
    // Ordered blocks follow the device.
    assert_eq!(rule_ids(&local), vec![2, 1]);
    assert_eq!(
        local.scalar("psk").map(ToString::to_string),
        Some("s3cret".to_string())
    );
}

#[test]
fn known_only_skips_unmanaged_blocks() {
    let table = policy_table();
    let opts = ConvertOptions {
        nested_policy: NestedPolicy::KnownOnly,
        ..ConvertOptions::default()
    };

    let mut prior = policy_local(&table);
    prior.remove("rule");
    let local = to_local_with(&policy_remote(), &table, Some(&prior), &opts).expect("to_local");
    assert!(!local.contains("rule"));
    assert!(local.contains("srcaddr"));

    let local = to_local_with(&policy_remote(), &table, None, &opts).expect("to_local");
    assert!(!local.contains("srcaddr"));
    assert_eq!(
        local.scalar("name").map(ToString::to_string),
        Some("lan-to-wan".to_string())
    );
}

#[test]
fn known_only_keeps_nested_blocks_of_new_rules() {
    let table = policy_table();
    let opts = ConvertOptions {
        nested_policy: NestedPolicy::KnownOnly,
        ..ConvertOptions::default()
    };
    let prior = LocalObject::new().with("policyid", 12).with(
        "rule",
        vec![LocalObject::new()
            .with("id", 1)
            .with("groups", vec![LocalObject::new().with("name", "a")])],
    );
    let fetched = json!({
        "policyid": 12,
        "rule": [
            {"id": 1, "groups": [{"name": "a"}]},
            {"id": 2, "groups": [{"name": "b"}]}
        ]
    });

    let local = to_local_with(fetched.as_object().expect("object"), &table, Some(&prior), &opts)
        .expect("to_local");
    assert_eq!(
        local.to_json(),
        json!({
            "policyid": 12,
            "rule": [
                {"id": 1, "groups": [{"name": "a"}]},
                {"id": 2, "groups": [{"name": "b"}]}
            ]
        })
    );
}

#[test]
fn float_fields_round_trip_and_reject_integers() {
    let table = SchemaTable::new(vec![
        FieldSpec::scalar("name", "name", ScalarType::String),
        FieldSpec::scalar("weight", "weight", ScalarType::Float),
    ]);
    let local = LocalObject::from_json(&json!({"name": "uplink", "weight": 3}), &table)
        .expect("decode local");

    let remote = to_remote(&local, &table).expect("to_remote");
    assert_eq!(remote.get("weight"), Some(&json!(3.0)));
    assert_eq!(to_local(&remote, &table, Some(&local)).expect("to_local"), local);

    let untyped = LocalObject::new().with("name", "uplink").with("weight", 3);
    let err = to_remote(&untyped, &table).expect_err("integer under float");
    assert!(matches!(err, ConvertError::TypeMismatch { ref path, .. } if path == "weight"));
}

#[test]
fn to_remote_renames_and_clears() {
    let table = policy_table();
    let mut local = policy_local(&table);
    local.remove("action");

    let remote = to_remote(&local, &table).expect("to_remote");

    assert_eq!(remote.get("action"), Some(&Value::Null));
    assert!(!remote.contains_key("comments"));
    assert_eq!(remote.get("psk"), Some(&json!("s3cret")));
    assert_eq!(
        remote.get("rule"),
        Some(&json!([
            {"id": 1, "source-ip": "10.0.0.1", "groups": []},
            {"id": 2, "source-ip": "10.0.0.2", "groups": [{"name": "ops"}]}
        ]))
    );
}

#[test]
fn to_remote_sorts_sets_on_request() {
    let table = policy_table();
    let local = policy_local(&table).with(
        "service",
        vec![
            LocalObject::new().with("name", "HTTPS"),
            LocalObject::new().with("name", "HTTP"),
        ],
    );
    let opts = ConvertOptions {
        sort_sets: true,
        ..ConvertOptions::default()
    };

    let remote = to_remote_with(&local, &table, &opts).expect("to_remote");
    assert_eq!(
        remote.get("service"),
        Some(&json!([{"name": "HTTP"}, {"name": "HTTPS"}]))
    );
    assert_eq!(
        remote.get("srcaddr"),
        Some(&json!([{"name": "guest-net"}, {"name": "lan-net"}]))
    );
}

#[test]
fn round_trip_through_remote_is_stable() {
    let table = policy_table();
    let local = policy_local(&table);

    let remote = to_remote(&local, &table).expect("to_remote");
    let back = to_local(&remote, &table, Some(&local)).expect("to_local");

    assert_eq!(back, local);
}

#[test]
fn duplicate_identity_in_nested_set_reports_both_indices() {
    let table = policy_table();
    let mut remote = policy_remote();
    remote.insert(
        "rule".to_string(),
        json!([
            {"id": 1, "groups": [{"name": "ops"}, {"name": "dev"}, {"name": "ops"}]}
        ]),
    );

    let err = to_local(&remote, &table, None).expect_err("duplicate group");
    assert_eq!(
        err,
        ConvertError::DuplicateIdentity {
            path: "rule.0.groups".to_string(),
            key: "ops".to_string(),
            first: 0,
            second: 2,
        }
    );
}

#[test]
fn every_bad_local_field_is_reported() {
    let table = policy_table();
    let local = LocalObject::new()
        .with("policyid", "twelve")
        .with("srcaddr", "lan-net")
        .with("typo", true);

    let err = to_remote(&local, &table).expect_err("invalid local");
    let paths: Vec<_> = err.errors().iter().filter_map(|e| e.path()).collect();
    assert_eq!(paths, vec!["typo", "policyid", "srcaddr"]);
}
