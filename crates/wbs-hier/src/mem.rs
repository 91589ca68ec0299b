//! In-memory hierarchy with JSON snapshots.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::data::DataEntry;
use crate::path::HierPath;
use crate::store::{HierError, HierarchyStore};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct NodeRecord {
    template_id: String,
    children: Vec<String>,
}

/// An in-memory [`HierarchyStore`] used by tests, what-if tooling, and the
/// demo binary. Snapshots serialize to JSON so a hierarchy can be saved and
/// reloaded between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemHierarchy {
    nodes: HashMap<String, NodeRecord>,
    data: HashMap<String, IndexMap<String, DataEntry>>,
}

impl MemHierarchy {
    /// An empty hierarchy containing only the root.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), NodeRecord::default());
        Self { nodes, data: HashMap::new() }
    }

    /// Restores a hierarchy from a JSON snapshot.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let mut store: Self = serde_json::from_slice(bytes)?;
        store.nodes.entry("/".to_string()).or_default();
        Ok(store)
    }

    /// Serializes the hierarchy to a JSON snapshot.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    fn key(path: &HierPath) -> String {
        path.to_string()
    }

    /// All keys at or under `path`, including `path` itself.
    fn subtree_keys(&self, path: &HierPath) -> Vec<String> {
        let base = Self::key(path);
        let prefix = if path.is_root() { "/".to_string() } else { format!("{base}/") };
        self.nodes
            .keys()
            .filter(|k| **k == base || k.starts_with(&prefix))
            .cloned()
            .collect()
    }
}

impl Default for MemHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyStore for MemHierarchy {
    fn node_exists(&self, path: &HierPath) -> bool {
        self.nodes.contains_key(&Self::key(path))
    }

    fn template_id(&self, path: &HierPath) -> Option<String> {
        self.nodes.get(&Self::key(path)).map(|r| r.template_id.clone())
    }

    fn children(&self, path: &HierPath) -> Vec<String> {
        self.nodes
            .get(&Self::key(path))
            .map(|r| r.children.clone())
            .unwrap_or_default()
    }

    fn descendants(&self, path: &HierPath) -> Vec<HierPath> {
        let base = Self::key(path);
        let mut out: Vec<HierPath> = self
            .subtree_keys(path)
            .into_iter()
            .filter(|k| *k != base)
            .filter_map(|k| k.parse().ok())
            .collect();
        out.sort();
        out
    }

    fn add_node(&mut self, path: &HierPath, template_id: &str) -> Result<(), HierError> {
        let Some(parent) = path.parent() else {
            return Err(HierError::RootImmutable);
        };
        let key = Self::key(path);
        if self.nodes.contains_key(&key) {
            return Err(HierError::AlreadyExists(key));
        }
        let parent_key = Self::key(&parent);
        let Some(parent_record) = self.nodes.get_mut(&parent_key) else {
            return Err(HierError::MissingParent(key));
        };
        parent_record.children.push(path.name().unwrap_or_default().to_string());
        self.nodes.insert(
            key,
            NodeRecord { template_id: template_id.to_string(), children: Vec::new() },
        );
        Ok(())
    }

    fn delete_node(&mut self, path: &HierPath) -> Result<(), HierError> {
        let Some(parent) = path.parent() else {
            return Err(HierError::RootImmutable);
        };
        let key = Self::key(path);
        if !self.nodes.contains_key(&key) {
            return Err(HierError::NotFound(key));
        }
        let name = path.name().unwrap_or_default().to_string();
        if let Some(parent_record) = self.nodes.get_mut(&Self::key(&parent)) {
            parent_record.children.retain(|c| *c != name);
        }
        for k in self.subtree_keys(path) {
            self.nodes.remove(&k);
            self.data.remove(&k);
        }
        Ok(())
    }

    fn rename_node(&mut self, from: &HierPath, to: &HierPath) -> Result<(), HierError> {
        let (Some(from_parent), Some(to_parent)) = (from.parent(), to.parent()) else {
            return Err(HierError::RootImmutable);
        };
        if from.is_prefix_of(to) {
            return Err(HierError::MoveIntoSelf {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        let from_key = Self::key(from);
        let to_key = Self::key(to);
        if !self.nodes.contains_key(&from_key) {
            return Err(HierError::NotFound(from_key));
        }
        if self.nodes.contains_key(&to_key) {
            return Err(HierError::AlreadyExists(to_key));
        }
        if !self.nodes.contains_key(&Self::key(&to_parent)) {
            return Err(HierError::MissingParent(to_key));
        }

        let from_name = from.name().unwrap_or_default().to_string();
        let to_name = to.name().unwrap_or_default().to_string();
        if from_parent == to_parent {
            // Plain rename keeps the node's position among its siblings.
            if let Some(record) = self.nodes.get_mut(&Self::key(&from_parent)) {
                for child in &mut record.children {
                    if *child == from_name {
                        *child = to_name.clone();
                        break;
                    }
                }
            }
        } else {
            if let Some(record) = self.nodes.get_mut(&Self::key(&from_parent)) {
                record.children.retain(|c| *c != from_name);
            }
            if let Some(record) = self.nodes.get_mut(&Self::key(&to_parent)) {
                record.children.push(to_name);
            }
        }

        let prefix = format!("{from_key}/");
        let moved: Vec<String> = self
            .nodes
            .keys()
            .filter(|k| **k == from_key || k.starts_with(&prefix))
            .cloned()
            .collect();
        for old_key in moved {
            let new_key = format!("{to_key}{}", &old_key[from_key.len()..]);
            if let Some(record) = self.nodes.remove(&old_key) {
                self.nodes.insert(new_key.clone(), record);
            }
            if let Some(values) = self.data.remove(&old_key) {
                self.data.insert(new_key, values);
            }
        }
        Ok(())
    }

    fn reorder_children(&mut self, path: &HierPath, order: &[String]) -> Result<(), HierError> {
        let key = Self::key(path);
        let Some(record) = self.nodes.get_mut(&key) else {
            return Err(HierError::NotFound(key));
        };
        if order.len() != record.children.len() {
            return Err(HierError::ChildMismatch {
                parent: key,
                detail: format!("expected {} names, got {}", record.children.len(), order.len()),
            });
        }
        let mut expected: Vec<&String> = record.children.iter().collect();
        let mut requested: Vec<&String> = order.iter().collect();
        expected.sort();
        requested.sort();
        if expected != requested {
            return Err(HierError::ChildMismatch {
                parent: key,
                detail: "requested order names different children".to_string(),
            });
        }
        record.children = order.to_vec();
        Ok(())
    }

    fn set_template_id(&mut self, path: &HierPath, template_id: &str) -> Result<(), HierError> {
        if path.is_root() {
            return Err(HierError::RootImmutable);
        }
        let key = Self::key(path);
        let Some(record) = self.nodes.get_mut(&key) else {
            return Err(HierError::NotFound(key));
        };
        record.template_id = template_id.to_string();
        Ok(())
    }

    fn get_data(&self, path: &HierPath, name: &str) -> Option<DataEntry> {
        self.data.get(&Self::key(path))?.get(name).cloned()
    }

    fn put_data(
        &mut self,
        path: &HierPath,
        name: &str,
        entry: Option<DataEntry>,
    ) -> Result<(), HierError> {
        let key = Self::key(path);
        if !self.nodes.contains_key(&key) {
            return Err(HierError::NotFound(key));
        }
        match entry {
            Some(entry) => {
                self.data.entry(key).or_default().insert(name.to_string(), entry);
            }
            None => {
                if let Some(values) = self.data.get_mut(&key) {
                    values.shift_remove(name);
                    if values.is_empty() {
                        self.data.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    fn put_data_if_newer(
        &mut self,
        path: &HierPath,
        name: &str,
        entry: DataEntry,
    ) -> Result<(), HierError> {
        let newer = match self.get_data(path, name) {
            None => true,
            Some(existing) => entry.edited > existing.edited,
        };
        if newer {
            self.put_data(path, name, Some(entry))?;
        }
        Ok(())
    }

    fn data_names(&self, path: &HierPath) -> Vec<String> {
        self.data
            .get(&Self::key(path))
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default()
    }
}
