use std::collections::BTreeMap;

use thiserror::Error;

use crate::schema::{validate, SchemaError, SchemaTable};

/// Errors returned while populating a [`Registry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The table for a resource type failed validation.
    #[error("resource type `{resource_type}` has an invalid schema: {source}")]
    Schema {
        resource_type: String,
        source: SchemaError,
    },
    /// The resource type was registered twice.
    #[error("resource type `{0}` is already registered")]
    Duplicate(String),
}

/// Resource type -> schema table.
///
/// Populated through `&mut self` at startup, then shared immutably (for
/// example behind an `Arc` or a `OnceLock`); lookups never lock.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tables: BTreeMap<String, SchemaTable>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a table.
    pub fn register(
        &mut self,
        resource_type: impl Into<String>,
        table: SchemaTable,
    ) -> Result<(), RegistryError> {
        let resource_type = resource_type.into();
        if self.tables.contains_key(&resource_type) {
            return Err(RegistryError::Duplicate(resource_type));
        }
        validate(&table).map_err(|source| RegistryError::Schema {
            resource_type: resource_type.clone(),
            source,
        })?;
        self.tables.insert(resource_type, table);
        Ok(())
    }

    pub fn lookup(&self, resource_type: &str) -> Option<&SchemaTable> {
        self.tables.get(resource_type)
    }

    /// Registered resource types in sorted order.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::{Registry, RegistryError};
    use crate::schema::{FieldSpec, ScalarType, SchemaTable};

    fn table() -> SchemaTable {
        SchemaTable::new(vec![FieldSpec::scalar("name", "name", ScalarType::String)])
    }

    #[test]
    fn registers_and_looks_up_tables() {
        let mut registry = Registry::new();
        registry.register("firewall_address", table()).expect("register");
        registry.register("firewall_addrgrp", table()).expect("register");

        assert!(registry.lookup("firewall_address").is_some());
        assert!(registry.lookup("firewall_policy").is_none());
        assert_eq!(
            registry.resource_types().collect::<Vec<_>>(),
            vec!["firewall_address", "firewall_addrgrp"]
        );
    }

    #[test]
    fn rejects_duplicates_and_invalid_tables() {
        let mut registry = Registry::new();
        registry.register("a", table()).expect("register");
        assert_eq!(
            registry.register("a", table()),
            Err(RegistryError::Duplicate("a".to_string()))
        );

        let broken = SchemaTable::new(vec![
            FieldSpec::scalar("x", "dup", ScalarType::String),
            FieldSpec::scalar("y", "dup", ScalarType::String),
        ]);
        assert!(matches!(
            registry.register("b", broken),
            Err(RegistryError::Schema { ref resource_type, .. }) if resource_type == "b"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn frozen_registry_is_shared_across_threads() {
        let mut registry = Registry::new();
        registry.register("a", table()).expect("register");
        let shared = Arc::new(registry);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&shared);
                thread::spawn(move || registry.lookup("a").map(SchemaTable::len))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("thread"), Some(1));
        }
    }
}
