//! A worker decorator that traces every mutation.

use wbs_hier::{DataEntry, DataValue, HierPath};

use crate::error::SyncError;
use crate::worker::{SyncWorker, WorkerLog};

/// Wraps a [`SyncWorker`] and emits a `tracing` event for each mutation.
///
/// Useful when diagnosing a pass: run with `RUST_LOG=wbs_sync=debug` to see
/// the exact operations in order, in live or what-if mode alike.
pub struct TracedWorker<W> {
    inner: W,
}

impl<W: SyncWorker> TracedWorker<W> {
    /// Wraps `inner`.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwraps the decorated worker.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: SyncWorker> SyncWorker for TracedWorker<W> {
    fn exists(&self, path: &HierPath) -> bool {
        self.inner.exists(path)
    }

    fn template_id(&self, path: &HierPath) -> Option<String> {
        self.inner.template_id(path)
    }

    fn children(&self, path: &HierPath) -> Vec<String> {
        self.inner.children(path)
    }

    fn get_value(&self, path: &HierPath, name: &str) -> Option<DataEntry> {
        self.inner.get_value(path, name)
    }

    fn create_node(&mut self, path: &HierPath, template_id: &str) -> Result<(), SyncError> {
        tracing::debug!("Creating '{}' as {}", path, template_id);
        self.inner.create_node(path, template_id)
    }

    fn remove_node(&mut self, path: &HierPath) -> Result<(), SyncError> {
        tracing::debug!("Removing '{}'", path);
        self.inner.remove_node(path)
    }

    fn move_node(&mut self, from: &HierPath, to: &HierPath) -> Result<(), SyncError> {
        tracing::debug!("Moving '{}' to '{}'", from, to);
        self.inner.move_node(from, to)
    }

    fn apply_child_order(&mut self, path: &HierPath, order: &[String]) -> Result<(), SyncError> {
        tracing::debug!("Reordering children of '{}': {:?}", path, order);
        self.inner.apply_child_order(path, order)
    }

    fn retype_node(&mut self, path: &HierPath, template_id: &str) -> Result<(), SyncError> {
        tracing::debug!("Retyping '{}' to {}", path, template_id);
        self.inner.retype_node(path, template_id)
    }

    fn write_value(
        &mut self,
        path: &HierPath,
        name: &str,
        value: Option<DataValue>,
    ) -> Result<(), SyncError> {
        tracing::debug!("Writing '{}' on '{}': {:?}", name, path, value);
        self.inner.write_value(path, name, value)
    }

    fn log(&self) -> &WorkerLog {
        self.inner.log()
    }

    fn log_mut(&mut self) -> &mut WorkerLog {
        self.inner.log_mut()
    }

    fn take_log(&mut self) -> WorkerLog {
        self.inner.take_log()
    }
}
