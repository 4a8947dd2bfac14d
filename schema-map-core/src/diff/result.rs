use serde::Serialize;
use serde_json::Value;

/// A single diff outcome for a field path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum DiffEntry {
    /// Field or block entry exists on both sides with identical content.
    Identical { path: String },
    /// Value differs between the two sides.
    Modified {
        path: String,
        before: Value,
        after: Value,
    },
    /// Present only on the `after` side.
    Added { path: String, value: Value },
    /// Present only on the `before` side.
    Removed { path: String, value: Value },
}

impl DiffEntry {
    pub fn path(&self) -> &str {
        match self {
            DiffEntry::Identical { path }
            | DiffEntry::Modified { path, .. }
            | DiffEntry::Added { path, .. }
            | DiffEntry::Removed { path, .. } => path,
        }
    }

    /// True for every entry except [`DiffEntry::Identical`].
    pub fn is_change(&self) -> bool {
        !matches!(self, DiffEntry::Identical { .. })
    }
}
