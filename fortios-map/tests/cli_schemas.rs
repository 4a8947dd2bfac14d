use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn fortios_map() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("fortios-map"))
}

#[test]
fn schemas_lists_embedded_resources() {
    fortios_map()
        .arg("schemas")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "firewall_addrgrp path=firewall/addrgrp mkey=name",
        ))
        .stdout(predicate::str::contains(
            "firewall_policy path=firewall/policy mkey=policyid",
        ))
        .stdout(predicate::str::contains(
            "wireless_controller_hotspot20_anqp_venue_name",
        ));
}

#[test]
fn schemas_json_output() {
    fortios_map()
        .args(["schemas", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"resource_type\": \"user_local\""))
        .stdout(predicate::str::contains("\"mkey\": \"name\""));
}

#[test]
fn inspect_prints_field_tree() {
    fortios_map()
        .args(["inspect", "vpn_ipsec_phase1interface", "--depth", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "vpn_ipsec_phase1interface path=vpn.ipsec/phase1-interface mkey=name",
        ))
        .stdout(predicate::str::contains("psksecret <- psksecret  string sensitive"))
        .stdout(predicate::str::contains(
            "ipv4_exclude_range <- ipv4-exclude-range  block key=id",
        ))
        .stdout(predicate::str::contains("  start_ip <- start-ip  string"));
}

#[test]
fn inspect_unknown_type_fails() {
    fortios_map()
        .args(["inspect", "firewall_vip"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown resource type 'firewall_vip'"));
}

#[test]
fn validate_accepts_embedded_schemas() {
    fortios_map()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("ok embedded:user_local.toml"))
        .stdout(predicate::str::contains("invalid").not());
}

#[test]
fn validate_reports_every_broken_file() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("addrgrp.toml"),
        r#"
resource = "firewall_addrgrp"
path = "firewall/addrgrp"
mkey = "uuid"

[[field]]
local = "name"
remote = "name"
kind = "scalar"

[[field]]
local = "member"
remote = "member"
kind = "block_set"
"#,
    )
    .expect("write schema");
    fs::write(dir.path().join("broken.toml"), "resource = [").expect("write broken");

    fortios_map()
        .arg("--schemas-dir")
        .arg(dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("member: repeated block has no identity key"))
        .stdout(predicate::str::contains("member: repeated block has no nested table"))
        .stdout(predicate::str::contains("mkey `uuid`"))
        .stdout(predicate::str::contains("failed to parse schema file"))
        .stderr(predicate::str::contains("2 of 2 schema file(s) invalid"));
}
