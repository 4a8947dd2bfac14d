//! FortiOS resource mapping on top of `schema-map-core`.
//!
//! The engine crate knows nothing about FortiOS; this crate supplies the
//! FortiOS side:
//!
//! - [`catalog`] loads per-resource schema files (embedded or from a directory)
//!   into a validated registry, with the API path and primary key of each type.
//! - [`transport`] and [`state`] define the device and saved-state
//!   collaborators, with in-memory and directory-backed implementations.
//! - [`resource`] runs the create / read / update / delete / import / plan
//!   lifecycle, reading every write back so secrets and local ordering survive.
//! - [`report`] and [`inspect`] render plans and schema trees for the terminal.
//!
//! # Example
//!
//! ```ignore
//! use fortios_map::catalog::Catalog;
//! use fortios_map::resource::ResourceManager;
//! use fortios_map::state::MemoryStateStore;
//! use fortios_map::transport::{DeviceModel, MemoryTransport};
//! use schema_map_core::LocalObject;
//!
//! let catalog = Catalog::embedded()?;
//! let device = MemoryTransport::new(DeviceModel::from_catalog(&catalog));
//! let mgr = ResourceManager::new(&catalog, device, MemoryStateStore::new());
//!
//! let group = LocalObject::new()
//!     .with("name", "web")
//!     .with("member", vec![LocalObject::new().with("name", "web01")]);
//! let applied = mgr.apply("firewall_addrgrp", &group, None)?;
//! println!("{}", applied.local.to_json());
//! ```

pub mod catalog;
pub mod inspect;
pub mod report;
pub mod resource;
pub mod state;
pub mod transport;
