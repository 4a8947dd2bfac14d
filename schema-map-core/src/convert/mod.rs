//! Schema-driven conversion between the local and remote models.

mod codec;
mod coerce;
mod local;
mod remote;

pub(crate) use codec::decode_local;
pub(crate) use coerce::{normalize_scalar, scalar_from_json};
pub(crate) use local::object_to_local;
pub use local::{to_local, to_local_with};
pub use remote::{to_remote, to_remote_with};

/// When nested blocks are flattened into the local model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestedPolicy {
    /// Flatten every `Block`/`BlockSet` field the remote object carries.
    #[default]
    Always,
    /// Flatten a `Block`/`BlockSet` field only if the prior local object
    /// already carried it; unmanaged sub-blocks stay out of the local model.
    /// Nested entries with no prior counterpart are new as a whole and are
    /// flattened completely.
    KnownOnly,
}

/// Tunes conversion behavior.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub nested_policy: NestedPolicy,
    /// Sort `BlockSet` collections by identity value when no prior ordering
    /// exists (local side) and always on the remote side.
    pub sort_sets: bool,
}

impl ConvertOptions {
    /// Options used when adopting an object nobody has managed before.
    pub fn import() -> Self {
        Self {
            nested_policy: NestedPolicy::Always,
            sort_sets: true,
        }
    }

    /// Options for a nested entry that has no prior counterpart.
    pub(crate) fn for_new_entry(&self) -> Self {
        Self {
            nested_policy: NestedPolicy::Always,
            ..self.clone()
        }
    }
}
