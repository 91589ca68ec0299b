//! The what-if worker: mutations land in an overlay, never the store.
//!
//! A what-if pass runs the exact decision logic of a live pass, so later
//! reads must observe earlier writes. The overlay shadows the store node by
//! node: a node is materialized the first time something touches it, and a
//! structural operation materializes the whole affected subtree before
//! rewriting its coordinates. An untouched path therefore always reads
//! straight from the store at the same coordinates.

use std::collections::{HashMap, HashSet};

use wbs_hier::{DataEntry, DataValue, HierError, HierPath, HierarchyStore};

use crate::error::SyncError;
use crate::worker::{SyncWorker, WorkerLog};

#[derive(Debug, Default)]
struct ShadowNode {
    /// Store path still carrying this node's untouched data, if any.
    backing: Option<HierPath>,
    template: Option<String>,
    values: HashMap<String, Option<DataEntry>>,
}

/// A [`SyncWorker`] that records every mutation in memory and leaves the
/// store untouched. Produces the same change list the live worker would.
pub struct WhatIfSyncWorker<'a> {
    store: &'a dyn HierarchyStore,
    log: WorkerLog,
    /// Touched nodes, keyed by their current overlay coordinates.
    nodes: HashMap<HierPath, ShadowNode>,
    /// Materialized child lists, keyed like `nodes`.
    lists: HashMap<HierPath, Vec<String>>,
    /// Coordinates no longer occupied (deleted, or vacated by a move).
    vacated: HashSet<HierPath>,
}

impl<'a> WhatIfSyncWorker<'a> {
    /// A what-if worker over the given store.
    pub fn new(store: &'a dyn HierarchyStore) -> Self {
        Self {
            store,
            log: WorkerLog::default(),
            nodes: HashMap::new(),
            lists: HashMap::new(),
            vacated: HashSet::new(),
        }
    }

    fn touch_node(&mut self, path: &HierPath) {
        if !self.nodes.contains_key(path) {
            let backed = !self.vacated.contains(path) && self.store.node_exists(path);
            self.nodes.insert(
                path.clone(),
                ShadowNode { backing: backed.then(|| path.clone()), ..ShadowNode::default() },
            );
        }
    }

    fn touch_list(&mut self, path: &HierPath) {
        if !self.lists.contains_key(path) {
            let list = self.children(path);
            self.lists.insert(path.clone(), list);
        }
    }

    /// Current members of the subtree at `root`, parents before children.
    fn subtree(&self, root: &HierPath) -> Vec<HierPath> {
        let mut members = vec![root.clone()];
        let mut next = 0;
        while next < members.len() {
            let node = members[next].clone();
            members.extend(self.children(&node).into_iter().map(|name| node.child(name)));
            next += 1;
        }
        members
    }

    /// Materializes every node and child list in the subtree at `root`.
    fn touch_subtree(&mut self, root: &HierPath) -> Vec<HierPath> {
        let members = self.subtree(root);
        for member in &members {
            self.touch_node(member);
            self.touch_list(member);
        }
        members
    }
}

impl SyncWorker for WhatIfSyncWorker<'_> {
    fn exists(&self, path: &HierPath) -> bool {
        if self.nodes.contains_key(path) {
            return true;
        }
        if self.vacated.contains(path) {
            return false;
        }
        self.store.node_exists(path)
    }

    fn template_id(&self, path: &HierPath) -> Option<String> {
        if let Some(node) = self.nodes.get(path) {
            if let Some(template) = &node.template {
                return Some(template.clone());
            }
            return node.backing.as_ref().and_then(|b| self.store.template_id(b));
        }
        if self.vacated.contains(path) {
            return None;
        }
        self.store.template_id(path)
    }

    fn children(&self, path: &HierPath) -> Vec<String> {
        if let Some(list) = self.lists.get(path) {
            return list.clone();
        }
        if let Some(node) = self.nodes.get(path) {
            return node
                .backing
                .as_ref()
                .map(|b| self.store.children(b))
                .unwrap_or_default();
        }
        if self.vacated.contains(path) {
            return Vec::new();
        }
        self.store.children(path)
    }

    fn get_value(&self, path: &HierPath, name: &str) -> Option<DataEntry> {
        if let Some(node) = self.nodes.get(path) {
            if let Some(value) = node.values.get(name) {
                return value.clone();
            }
            return node.backing.as_ref().and_then(|b| self.store.get_data(b, name));
        }
        if self.vacated.contains(path) {
            return None;
        }
        self.store.get_data(path, name)
    }

    fn create_node(&mut self, path: &HierPath, template_id: &str) -> Result<(), SyncError> {
        let Some(parent) = path.parent() else {
            return Err(HierError::RootImmutable.into());
        };
        if self.exists(path) {
            return Err(HierError::AlreadyExists(path.to_string()).into());
        }
        if !self.exists(&parent) {
            return Err(HierError::MissingParent(path.to_string()).into());
        }
        self.touch_list(&parent);
        if let Some(list) = self.lists.get_mut(&parent) {
            list.push(path.name().unwrap_or_default().to_string());
        }
        self.nodes.insert(
            path.clone(),
            ShadowNode {
                backing: None,
                template: Some(template_id.to_string()),
                values: HashMap::new(),
            },
        );
        self.lists.insert(path.clone(), Vec::new());
        Ok(())
    }

    fn remove_node(&mut self, path: &HierPath) -> Result<(), SyncError> {
        let Some(parent) = path.parent() else {
            return Err(HierError::RootImmutable.into());
        };
        if !self.exists(path) {
            return Err(HierError::NotFound(path.to_string()).into());
        }
        let members = self.touch_subtree(path);
        self.touch_list(&parent);
        if let Some(list) = self.lists.get_mut(&parent) {
            let name = path.name().unwrap_or_default();
            list.retain(|c| c != name);
        }
        for member in members {
            if let Some(node) = self.nodes.remove(&member) {
                if let Some(backing) = node.backing {
                    self.vacated.insert(backing);
                }
            }
            self.lists.remove(&member);
            self.vacated.insert(member);
        }
        Ok(())
    }

    fn move_node(&mut self, from: &HierPath, to: &HierPath) -> Result<(), SyncError> {
        let (Some(from_parent), Some(to_parent)) = (from.parent(), to.parent()) else {
            return Err(HierError::RootImmutable.into());
        };
        if from.is_prefix_of(to) {
            return Err(HierError::MoveIntoSelf {
                from: from.to_string(),
                to: to.to_string(),
            }
            .into());
        }
        if !self.exists(from) {
            return Err(HierError::NotFound(from.to_string()).into());
        }
        if self.exists(to) {
            return Err(HierError::AlreadyExists(to.to_string()).into());
        }
        if !self.exists(&to_parent) {
            return Err(HierError::MissingParent(to.to_string()).into());
        }

        let members = self.touch_subtree(from);

        let from_name = from.name().unwrap_or_default().to_string();
        let to_name = to.name().unwrap_or_default().to_string();
        if from_parent == to_parent {
            // Plain rename keeps the node's position among its siblings.
            self.touch_list(&from_parent);
            if let Some(list) = self.lists.get_mut(&from_parent) {
                if let Some(slot) = list.iter_mut().find(|c| **c == from_name) {
                    *slot = to_name;
                }
            }
        } else {
            self.touch_list(&from_parent);
            self.touch_list(&to_parent);
            if let Some(list) = self.lists.get_mut(&from_parent) {
                list.retain(|c| *c != from_name);
            }
            if let Some(list) = self.lists.get_mut(&to_parent) {
                list.push(to_name);
            }
        }

        for member in members {
            let Some(landed) = member.reroot(from, to) else { continue };
            if let Some(node) = self.nodes.remove(&member) {
                self.nodes.insert(landed.clone(), node);
            }
            if let Some(list) = self.lists.remove(&member) {
                self.lists.insert(landed, list);
            }
            self.vacated.insert(member);
        }
        Ok(())
    }

    fn apply_child_order(&mut self, path: &HierPath, order: &[String]) -> Result<(), SyncError> {
        if !self.exists(path) {
            return Err(HierError::NotFound(path.to_string()).into());
        }
        self.touch_list(path);
        let current = self.lists.get(path).cloned().unwrap_or_default();
        if order.len() != current.len() {
            return Err(HierError::ChildMismatch {
                parent: path.to_string(),
                detail: format!("expected {} names, got {}", current.len(), order.len()),
            }
            .into());
        }
        let mut expected: Vec<&String> = current.iter().collect();
        let mut requested: Vec<&String> = order.iter().collect();
        expected.sort();
        requested.sort();
        if expected != requested {
            return Err(HierError::ChildMismatch {
                parent: path.to_string(),
                detail: "requested order names different children".to_string(),
            }
            .into());
        }
        self.lists.insert(path.clone(), order.to_vec());
        Ok(())
    }

    fn retype_node(&mut self, path: &HierPath, template_id: &str) -> Result<(), SyncError> {
        if path.is_root() {
            return Err(HierError::RootImmutable.into());
        }
        if !self.exists(path) {
            return Err(HierError::NotFound(path.to_string()).into());
        }
        self.touch_node(path);
        if let Some(node) = self.nodes.get_mut(path) {
            node.template = Some(template_id.to_string());
        }
        Ok(())
    }

    fn write_value(
        &mut self,
        path: &HierPath,
        name: &str,
        value: Option<DataValue>,
    ) -> Result<(), SyncError> {
        if !self.exists(path) {
            return Err(HierError::NotFound(path.to_string()).into());
        }
        self.touch_node(path);
        if let Some(node) = self.nodes.get_mut(path) {
            node.values.insert(name.to_string(), value.map(DataEntry::new));
        }
        Ok(())
    }

    fn log(&self) -> &WorkerLog {
        &self.log
    }

    fn log_mut(&mut self) -> &mut WorkerLog {
        &mut self.log
    }

    fn take_log(&mut self) -> WorkerLog {
        std::mem::take(&mut self.log)
    }
}
