//! The mutation contract between the sync engine and the plan store.

use thiserror::Error;

use crate::data::DataEntry;
use crate::path::HierPath;

/// Errors raised by hierarchy mutations.
#[derive(Debug, Error)]
pub enum HierError {
    /// The addressed node does not exist.
    #[error("no node at {0}")]
    NotFound(String),

    /// A node already occupies the target path.
    #[error("a node already exists at {0}")]
    AlreadyExists(String),

    /// The target's parent does not exist.
    #[error("parent of {0} does not exist")]
    MissingParent(String),

    /// The hierarchy root cannot be created, deleted, moved, or retyped.
    #[error("the hierarchy root cannot be modified")]
    RootImmutable,

    /// A reorder request did not name exactly the current children.
    #[error("reorder of {parent} does not match its children: {detail}")]
    ChildMismatch {
        /// The parent whose children were being reordered.
        parent: String,
        /// What was wrong with the requested order.
        detail: String,
    },

    /// A rename tried to move a node underneath itself.
    #[error("cannot move {from} into its own subtree at {to}")]
    MoveIntoSelf {
        /// The node being moved.
        from: String,
        /// The offending destination.
        to: String,
    },
}

/// A tree of named nodes, each with a template ID and a flat data map.
///
/// This is the entire surface the sync engine needs from the local store.
/// Implementations must keep child order stable, move a node's entire
/// subtree and data on rename, and treat `put_data(.., None)` as restoring
/// the element to its default (absent) state.
pub trait HierarchyStore {
    /// True when a node exists at `path`.
    fn node_exists(&self, path: &HierPath) -> bool;

    /// The template ID of the node at `path`, if it exists. The root's
    /// template ID is the empty string unless a project root was installed.
    fn template_id(&self, path: &HierPath) -> Option<String>;

    /// The names of `path`'s children, in stored order.
    fn children(&self, path: &HierPath) -> Vec<String>;

    /// Every strict descendant of `path`, parents before children.
    fn descendants(&self, path: &HierPath) -> Vec<HierPath>;

    /// Creates a node at `path` with the given template ID.
    ///
    /// # Errors
    /// Fails if the parent is missing or the path is already occupied.
    fn add_node(&mut self, path: &HierPath, template_id: &str) -> Result<(), HierError>;

    /// Removes the node at `path` together with its subtree and data.
    fn delete_node(&mut self, path: &HierPath) -> Result<(), HierError>;

    /// Moves the node at `from` (with its subtree and data) to `to`.
    fn rename_node(&mut self, from: &HierPath, to: &HierPath) -> Result<(), HierError>;

    /// Reorders the children of `path`. `order` must name exactly the
    /// current children.
    fn reorder_children(&mut self, path: &HierPath, order: &[String]) -> Result<(), HierError>;

    /// Replaces the template ID of the node at `path`.
    fn set_template_id(&mut self, path: &HierPath, template_id: &str) -> Result<(), HierError>;

    /// Reads one data element of the node at `path`.
    fn get_data(&self, path: &HierPath, name: &str) -> Option<DataEntry>;

    /// Writes one data element, or restores its default when `entry` is
    /// `None`. The node must exist.
    fn put_data(
        &mut self,
        path: &HierPath,
        name: &str,
        entry: Option<DataEntry>,
    ) -> Result<(), HierError>;

    /// Writes one data element only when it is absent or the new entry's
    /// edit time is newer than the stored one.
    fn put_data_if_newer(
        &mut self,
        path: &HierPath,
        name: &str,
        entry: DataEntry,
    ) -> Result<(), HierError>;

    /// The names of all data elements present on the node at `path`.
    fn data_names(&self, path: &HierPath) -> Vec<String>;
}
