//! The live worker: mutations go straight to the persistent store.

use wbs_hier::{DataEntry, DataValue, HierPath, HierarchyStore};

use crate::error::SyncError;
use crate::worker::{SyncWorker, WorkerLog};

/// A [`SyncWorker`] that applies every mutation to the store immediately.
pub struct LiveSyncWorker<'a> {
    store: &'a mut dyn HierarchyStore,
    log: WorkerLog,
}

impl<'a> LiveSyncWorker<'a> {
    /// A live worker over the given store.
    pub fn new(store: &'a mut dyn HierarchyStore) -> Self {
        Self { store, log: WorkerLog::default() }
    }
}

impl SyncWorker for LiveSyncWorker<'_> {
    fn exists(&self, path: &HierPath) -> bool {
        self.store.node_exists(path)
    }

    fn template_id(&self, path: &HierPath) -> Option<String> {
        self.store.template_id(path)
    }

    fn children(&self, path: &HierPath) -> Vec<String> {
        self.store.children(path)
    }

    fn get_value(&self, path: &HierPath, name: &str) -> Option<DataEntry> {
        self.store.get_data(path, name)
    }

    fn create_node(&mut self, path: &HierPath, template_id: &str) -> Result<(), SyncError> {
        self.store.add_node(path, template_id)?;
        Ok(())
    }

    fn remove_node(&mut self, path: &HierPath) -> Result<(), SyncError> {
        self.store.delete_node(path)?;
        Ok(())
    }

    fn move_node(&mut self, from: &HierPath, to: &HierPath) -> Result<(), SyncError> {
        self.store.rename_node(from, to)?;
        Ok(())
    }

    fn apply_child_order(&mut self, path: &HierPath, order: &[String]) -> Result<(), SyncError> {
        self.store.reorder_children(path, order)?;
        Ok(())
    }

    fn retype_node(&mut self, path: &HierPath, template_id: &str) -> Result<(), SyncError> {
        self.store.set_template_id(path, template_id)?;
        Ok(())
    }

    fn write_value(
        &mut self,
        path: &HierPath,
        name: &str,
        value: Option<DataValue>,
    ) -> Result<(), SyncError> {
        self.store.put_data(path, name, value.map(DataEntry::new))?;
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
