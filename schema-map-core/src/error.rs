use thiserror::Error;

/// Errors produced while converting between local and remote models.
///
/// Every variant carries the dotted field path of the offending value
/// (for example `rule.2.groups.0.name`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// A value's runtime shape or type does not fit its declared field type.
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },
    /// Two remote entries of one repeated block share an identity value.
    #[error("{path}: identity `{key}` appears at entries {first} and {second}")]
    DuplicateIdentity {
        path: String,
        key: String,
        first: usize,
        second: usize,
    },
    /// A remote entry of a repeated block lacks its identity field.
    #[error("{path}: entry {index} has no identity field `{key}`")]
    MissingIdentity {
        path: String,
        key: String,
        index: usize,
    },
    /// Local input names a field the schema does not know.
    #[error("{path}: unknown field")]
    UnknownField { path: String },
    /// A repeated block was used without a usable nested schema or identity key.
    #[error("{path}: repeated block has no usable nested schema")]
    InvalidSchema { path: String },
    /// Several fields failed in one conversion.
    #[error("{} conversion errors: {}", .0.len(), render_all(.0))]
    Multiple(Vec<ConvertError>),
}

fn render_all(errors: &[ConvertError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConvertError {
    pub(crate) fn mismatch(
        path: &FieldPath,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        ConvertError::TypeMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Field path of a single error; `None` for [`ConvertError::Multiple`].
    pub fn path(&self) -> Option<&str> {
        match self {
            ConvertError::TypeMismatch { path, .. }
            | ConvertError::DuplicateIdentity { path, .. }
            | ConvertError::MissingIdentity { path, .. }
            | ConvertError::UnknownField { path }
            | ConvertError::InvalidSchema { path } => Some(path),
            ConvertError::Multiple(_) => None,
        }
    }

    /// Individual errors, flattening [`ConvertError::Multiple`].
    pub fn errors(&self) -> Vec<&ConvertError> {
        match self {
            ConvertError::Multiple(inner) => inner.iter().flat_map(|e| e.errors()).collect(),
            other => vec![other],
        }
    }

    /// Turn accumulated field errors into a single result.
    pub(crate) fn check(errors: Vec<ConvertError>) -> Result<(), ConvertError> {
        let mut flat = Vec::with_capacity(errors.len());
        for err in errors {
            match err {
                ConvertError::Multiple(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Ok(()),
            1 => Err(flat.remove(0)),
            _ => Err(ConvertError::Multiple(flat)),
        }
    }
}

/// Dotted location inside an object tree, built while walking it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FieldPath(String);

impl FieldPath {
    pub(crate) fn root() -> Self {
        Self::default()
    }

    pub(crate) fn field(&self, name: &str) -> Self {
        self.push(name)
    }

    pub(crate) fn index(&self, index: usize) -> Self {
        self.push(&index.to_string())
    }

    fn push(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            Self(segment.to_string())
        } else {
            Self(format!("{}.{segment}", self.0))
        }
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
