//! Hierarchical Plan Store
//!
//! The local side of WBS synchronization: a tree of named nodes, each
//! carrying a template ID and a flat map of data elements.
//!
//! # Overview
//!
//! - [`HierPath`]: slash-addressed location of a node (`/Project/Comp/Task`)
//! - [`DataValue`] / [`DataEntry`]: one data element and its edit timestamp
//! - [`HierarchyStore`]: the narrow mutation contract the sync engine uses
//! - [`MemHierarchy`]: in-memory implementation with JSON snapshots
//!
//! # Example
//!
//! ```rust
//! use wbs_hier::{DataEntry, HierarchyStore, HierPath, MemHierarchy};
//!
//! let mut store = MemHierarchy::new();
//! let project: HierPath = "/Project".parse().unwrap();
//! store.add_node(&project, "Team Project Root").unwrap();
//! store.put_data(&project, "Project_ID", Some(DataEntry::text("PROJ"))).unwrap();
//!
//! assert_eq!(store.children(&HierPath::root()), vec!["Project"]);
//! ```

#![warn(missing_docs)]

mod data;
mod mem;
mod path;
mod store;

pub use data::{DataEntry, DataValue};
pub use mem::MemHierarchy;
pub use path::{HierPath, PathError};
pub use store::{HierError, HierarchyStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
