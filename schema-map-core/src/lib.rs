//! Schema-driven conversion between a typed local object tree and a
//! wire-format remote JSON object.
//!
//! A [`SchemaTable`] declares, per attribute, the local and remote names, the
//! value shape (scalar, scalar list, ordered block list, identity-matched
//! block set), sensitivity and absent-value policy. The engine uses it to
//!
//! - convert local objects to remote ones ([`to_remote`]),
//! - convert remote objects back, reconciling repeated blocks with the
//!   previously known local object ([`to_local`], [`reconcile`]),
//! - diff two local objects field by field ([`diff`]).
//!
//! All functions are pure and never log; errors carry the dotted field path
//! of the offending value.

pub mod convert;
pub mod diff;
pub mod error;
pub mod format;
pub mod reconcile;
pub mod registry;
pub mod schema;
pub mod value;

pub use convert::{
    to_local, to_local_with, to_remote, to_remote_with, ConvertOptions, NestedPolicy,
};
pub use diff::{diff, diff_with_options, DiffEntry, DiffOptions};
pub use error::ConvertError;
pub use format::{format_json, format_summary, format_text};
pub use reconcile::{reconcile, reconcile_with, sort_by_identity, Reconciled};
pub use registry::{Registry, RegistryError};
pub use schema::{
    validate, FieldKind, FieldSpec, ScalarType, SchemaError, SchemaTable, SchemaViolation,
};
pub use value::{LocalObject, LocalValue, RemoteObject, Scalar};
