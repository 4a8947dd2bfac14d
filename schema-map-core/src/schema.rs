use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Single typed value.
    Scalar,
    /// Ordered list of nested objects.
    Block,
    /// Unordered collection of nested objects matched by identity key.
    BlockSet,
    /// List of typed values.
    ScalarList,
}

/// Declared type of a scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    #[default]
    String,
    Integer,
    Float,
    Bool,
}

impl Display for ScalarType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::String => "string",
            ScalarType::Integer => "integer",
            ScalarType::Float => "float",
            ScalarType::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// Declarative description of one attribute and how it maps between models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Name in the local model (`source_ip`).
    #[serde(rename = "local")]
    pub local_name: String,
    /// Name in the remote model (`source-ip`).
    #[serde(rename = "remote")]
    pub remote_name: String,
    pub kind: FieldKind,
    /// Declared type for `Scalar` and `ScalarList` values.
    #[serde(default, rename = "type")]
    pub scalar_type: ScalarType,
    /// Sub-schema for `Block` and `BlockSet`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<SchemaTable>,
    /// Keep the prior local value when the remote side comes back empty.
    #[serde(default)]
    pub sensitive: bool,
    /// Local name of the nested field used to match entries across reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_key: Option<String>,
    /// Skip the field entirely instead of emitting an explicit null.
    #[serde(default)]
    pub omit_when_absent: bool,
}

impl FieldSpec {
    fn with_kind(
        local_name: impl Into<String>,
        remote_name: impl Into<String>,
        kind: FieldKind,
    ) -> Self {
        Self {
            local_name: local_name.into(),
            remote_name: remote_name.into(),
            kind,
            scalar_type: ScalarType::default(),
            nested: None,
            sensitive: false,
            identity_key: None,
            omit_when_absent: false,
        }
    }

    /// A single typed value.
    pub fn scalar(
        local_name: impl Into<String>,
        remote_name: impl Into<String>,
        scalar_type: ScalarType,
    ) -> Self {
        Self {
            scalar_type,
            ..Self::with_kind(local_name, remote_name, FieldKind::Scalar)
        }
    }

    /// A list of typed values.
    pub fn scalar_list(
        local_name: impl Into<String>,
        remote_name: impl Into<String>,
        scalar_type: ScalarType,
    ) -> Self {
        Self {
            scalar_type,
            ..Self::with_kind(local_name, remote_name, FieldKind::ScalarList)
        }
    }

    /// An ordered list of nested objects.
    pub fn block(
        local_name: impl Into<String>,
        remote_name: impl Into<String>,
        identity_key: impl Into<String>,
        nested: SchemaTable,
    ) -> Self {
        Self {
            identity_key: Some(identity_key.into()),
            nested: Some(nested),
            ..Self::with_kind(local_name, remote_name, FieldKind::Block)
        }
    }

    /// An unordered collection of nested objects.
    pub fn block_set(
        local_name: impl Into<String>,
        remote_name: impl Into<String>,
        identity_key: impl Into<String>,
        nested: SchemaTable,
    ) -> Self {
        Self {
            identity_key: Some(identity_key.into()),
            nested: Some(nested),
            ..Self::with_kind(local_name, remote_name, FieldKind::BlockSet)
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn omit_when_absent(mut self) -> Self {
        self.omit_when_absent = true;
        self
    }

    /// True for `Block` and `BlockSet`.
    pub fn is_block(&self) -> bool {
        matches!(self.kind, FieldKind::Block | FieldKind::BlockSet)
    }

    /// Resolve the nested field named by `identity_key`, if the spec is well formed.
    pub fn identity_field(&self) -> Option<&FieldSpec> {
        let key = self.identity_key.as_deref()?;
        self.nested.as_ref()?.field(key)
    }
}

/// Ordered set of attribute specs for one object level.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaTable {
    fields: Vec<FieldSpec>,
}

impl SchemaTable {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldSpec> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by its local name.
    pub fn field(&self, local_name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.local_name == local_name)
    }

    /// Look up a field by its remote name.
    pub fn field_by_remote(&self, remote_name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.remote_name == remote_name)
    }
}

impl FromIterator<FieldSpec> for SchemaTable {
    fn from_iter<I: IntoIterator<Item = FieldSpec>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SchemaTable {
    type Item = &'a FieldSpec;
    type IntoIter = std::slice::Iter<'a, FieldSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// One problem found in a schema table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaViolation {
    #[error("{path}: remote name `{remote_name}` is used more than once")]
    DuplicateRemoteName { path: String, remote_name: String },
    #[error("{path}: local name `{local_name}` is used more than once")]
    DuplicateLocalName { path: String, local_name: String },
    #[error("{path}: repeated block has no identity key")]
    MissingIdentityKey { path: String },
    #[error("{path}: identity key `{key}` is not a field of the nested table")]
    UnknownIdentityKey { path: String, key: String },
    #[error("{path}: identity key `{key}` must be a scalar field")]
    NonScalarIdentityKey { path: String, key: String },
    #[error("{path}: repeated block has no nested table")]
    MissingNested { path: String },
    #[error("{path}: only blocks may declare a nested table")]
    UnexpectedNested { path: String },
}

/// A schema table failed validation; carries every violation found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "invalid schema table ({} problem(s)): {}",
    .violations.len(),
    render_violations(.violations)
)]
pub struct SchemaError {
    pub violations: Vec<SchemaViolation>,
}

fn render_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check a table (recursively) and report all problems at once.
pub fn validate(table: &SchemaTable) -> Result<(), SchemaError> {
    let mut violations = Vec::new();
    validate_level(table, "", &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError { violations })
    }
}

fn validate_level(table: &SchemaTable, prefix: &str, out: &mut Vec<SchemaViolation>) {
    let mut remote_names = BTreeSet::new();
    let mut local_names = BTreeSet::new();

    for field in table {
        let path = join_path(prefix, &field.local_name);

        if !remote_names.insert(field.remote_name.as_str()) {
            out.push(SchemaViolation::DuplicateRemoteName {
                path: path.clone(),
                remote_name: field.remote_name.clone(),
            });
        }
        if !local_names.insert(field.local_name.as_str()) {
            out.push(SchemaViolation::DuplicateLocalName {
                path: path.clone(),
                local_name: field.local_name.clone(),
            });
        }

        if !field.is_block() {
            if field.nested.is_some() {
                out.push(SchemaViolation::UnexpectedNested { path });
            }
            continue;
        }

        let nested = field.nested.as_ref();
        match field.identity_key.as_deref().map(str::trim) {
            None | Some("") => out.push(SchemaViolation::MissingIdentityKey { path: path.clone() }),
            Some(key) => match nested.and_then(|n| n.field(key)) {
                Some(spec) if spec.kind == FieldKind::Scalar => {}
                Some(_) => out.push(SchemaViolation::NonScalarIdentityKey {
                    path: path.clone(),
                    key: key.to_string(),
                }),
                None => out.push(SchemaViolation::UnknownIdentityKey {
                    path: path.clone(),
                    key: key.to_string(),
                }),
            },
        }

        match nested {
            Some(nested) => validate_level(nested, &path, out),
            None => out.push(SchemaViolation::MissingNested { path }),
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::{validate, FieldKind, FieldSpec, ScalarType, SchemaTable, SchemaViolation};

    fn member_table() -> SchemaTable {
        SchemaTable::new(vec![FieldSpec::scalar("name", "name", ScalarType::String)])
    }

    #[test]
    fn accepts_well_formed_nested_table() {
        let table = SchemaTable::new(vec![
            FieldSpec::scalar("name", "name", ScalarType::String),
            FieldSpec::block_set("member", "member", "name", member_table()),
        ]);
        assert!(validate(&table).is_ok());
    }

    #[test]
    fn reports_every_violation_in_one_pass() {
        let mut block = FieldSpec::block("rule", "rule", "id", member_table());
        block.identity_key = None;
        let table = SchemaTable::new(vec![
            FieldSpec::scalar("a", "x", ScalarType::String),
            FieldSpec::scalar("b", "x", ScalarType::Integer),
            block,
        ]);

        let err = validate(&table).expect_err("two problems");
        assert_eq!(err.violations.len(), 2);
        assert!(err.violations.iter().any(|v| matches!(
            v,
            SchemaViolation::DuplicateRemoteName { remote_name, .. } if remote_name == "x"
        )));
        assert!(err
            .violations
            .iter()
            .any(|v| matches!(v, SchemaViolation::MissingIdentityKey { path } if path == "rule")));
    }

    #[test]
    fn identity_key_must_be_a_nested_scalar() {
        let nested = SchemaTable::new(vec![
            FieldSpec::scalar("name", "name", ScalarType::String),
            FieldSpec::scalar_list("tags", "tags", ScalarType::String),
        ]);
        let table = SchemaTable::new(vec![
            FieldSpec::block_set("a", "a", "tags", nested.clone()),
            FieldSpec::block_set("b", "b", "missing", nested),
        ]);

        let err = validate(&table).expect_err("invalid keys");
        assert_eq!(
            err.violations,
            vec![
                SchemaViolation::NonScalarIdentityKey {
                    path: "a".to_string(),
                    key: "tags".to_string(),
                },
                SchemaViolation::UnknownIdentityKey {
                    path: "b".to_string(),
                    key: "missing".to_string(),
                },
            ]
        );
    }

    #[test]
    fn nested_violations_carry_dotted_paths() {
        let inner = SchemaTable::new(vec![
            FieldSpec::scalar("id", "id", ScalarType::Integer),
            FieldSpec::scalar("x", "dup", ScalarType::String),
            FieldSpec::scalar("y", "dup", ScalarType::String),
        ]);
        let table = SchemaTable::new(vec![FieldSpec::block("rule", "rule", "id", inner)]);

        let err = validate(&table).expect_err("duplicate nested remote");
        assert_eq!(
            err.violations,
            vec![SchemaViolation::DuplicateRemoteName {
                path: "rule.y".to_string(),
                remote_name: "dup".to_string(),
            }]
        );
    }

    #[test]
    fn block_without_nested_and_scalar_with_nested_are_flagged() {
        let mut block = FieldSpec::block_set("m", "m", "name", member_table());
        block.nested = None;
        let mut scalar = FieldSpec::scalar("s", "s", ScalarType::String);
        scalar.nested = Some(member_table());
        assert_eq!(scalar.kind, FieldKind::Scalar);

        let err = validate(&SchemaTable::new(vec![block, scalar])).expect_err("invalid");
        assert_eq!(err.violations.len(), 3);
        assert!(err.to_string().contains("3 problem(s)"));
    }
}
