//! WBS Document Model
//!
//! Typed representation of a team work-breakdown-structure document, plus
//! the identity schemes and acquisition sources the sync engine consumes.
//!
//! # Core Concepts
//!
//! - [`WbsDocument`]: A parsed document — project attributes, node tree,
//!   bundle history
//! - [`WbsNode`] / [`NodeTag`]: One element of the tree and its type tag
//! - [`NodeIdent`]: The three identity schemes (official, client, pseudo)
//! - [`TimeAssignments`]: Parsed per-person planned-time attributes
//! - [`DocumentSource`]: Where document bytes come from
//!
//! # Example
//!
//! ```rust,ignore
//! use wbs_model::{DocumentSource, FileSource, WbsDocument};
//!
//! let source = FileSource::new("team/project-dump.json");
//! let doc = WbsDocument::parse(&source.fetch()?)?;
//! println!("project {} has {} top-level nodes",
//!     doc.project_id, doc.root.children.len());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod document;
mod ident;
mod node;
mod source;
mod time;

// Re-exports
pub use document::{BundleRevision, DocumentError, MergeRecord, WbsDocument};
pub use ident::{
    client_ident, join_task_ids, parse_task_ids, pseudo_ident, task_id_node_part, NodeIdent,
};
pub use node::{NodeNote, NodeTag, ScheduleException, SizeRecord, TaskDependency, WbsNode};
pub use source::{BytesSource, DocumentSource, FileSource, SourceError};
pub use time::TimeAssignments;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
