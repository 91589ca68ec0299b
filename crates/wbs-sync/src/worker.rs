//! The transactional surface a sync pass works through.
//!
//! Every mutation a pass makes goes through [`SyncWorker`]. The trait
//! splits in two layers: a small raw surface each mode implements (live
//! writes, what-if overlay), and provided methods carrying the shared
//! semantics — change-list recording, three-way value merges, completion
//! marking. Because the decision logic lives in the provided layer, a
//! what-if pass produces exactly the change list the live pass would.

use chrono::{DateTime, Utc};
use wbs_hier::{DataEntry, DataValue, HierPath};

use crate::change::ChangeEntry;
use crate::error::SyncError;
use crate::names;

/// The losing side of a three-way value merge where the local edit won.
///
/// Returned so the caller can record a discrepancy telling the document's
/// authoring tool to adopt the local value.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSyncResult {
    /// The locally edited value that was kept.
    pub value: DataValue,
    /// When the local edit happened, if known.
    pub edited: Option<DateTime<Utc>>,
}

/// One node rename or move performed during a pass.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RenameRecord {
    pub from: HierPath,
    pub to: HierPath,
}

/// Everything a pass did, accumulated inside the worker.
#[derive(Debug, Default)]
pub struct WorkerLog {
    changes: Vec<ChangeEntry>,
    added: Vec<HierPath>,
    deleted: Vec<HierPath>,
    completed: Vec<HierPath>,
    renames: Vec<RenameRecord>,
}

impl WorkerLog {
    /// Appends a described change.
    pub fn note_described(&mut self, text: String) {
        self.changes.push(ChangeEntry::Described(text));
    }

    /// Records the unlisted-data sentinel, at most once.
    pub fn note_unlisted(&mut self) {
        if !self.changes.iter().any(ChangeEntry::is_unlisted) {
            self.changes.push(ChangeEntry::Unlisted);
        }
    }

    /// Appends a warning.
    pub fn note_warning(&mut self, text: String) {
        self.changes.push(ChangeEntry::Warning(text));
    }

    pub(crate) fn record_added(&mut self, path: HierPath) {
        self.added.push(path);
    }

    pub(crate) fn record_deleted(&mut self, path: HierPath) {
        self.deleted.push(path);
    }

    pub(crate) fn record_completed(&mut self, path: HierPath) {
        self.completed.push(path);
    }

    pub(crate) fn record_rename(&mut self, from: HierPath, to: HierPath) {
        self.renames.push(RenameRecord { from, to });
    }

    /// The change list so far.
    #[must_use]
    pub fn changes(&self) -> &[ChangeEntry] {
        &self.changes
    }

    /// True once any change entry has been recorded.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Nodes created during the pass, in creation order.
    #[must_use]
    pub fn added(&self) -> &[HierPath] {
        &self.added
    }

    /// Nodes deleted during the pass.
    #[must_use]
    pub fn deleted(&self) -> &[HierPath] {
        &self.deleted
    }

    /// Nodes marked complete during the pass.
    #[must_use]
    pub fn completed(&self) -> &[HierPath] {
        &self.completed
    }

    /// Renames and moves, in the order performed.
    #[must_use]
    pub fn renames(&self) -> &[RenameRecord] {
        &self.renames
    }

    /// Translates a current path back to where that node sat when the pass
    /// started (or where it was created), undoing renames newest-first.
    #[must_use]
    pub fn original_path(&self, current: &HierPath) -> HierPath {
        let mut path = current.clone();
        for record in self.renames.iter().rev() {
            if let Some(rerooted) = path.reroot(&record.to, &record.from) {
                path = rerooted;
            }
        }
        path
    }

    /// Translates a pass-start path to where that node sits now.
    #[must_use]
    pub fn current_path(&self, original: &HierPath) -> HierPath {
        let mut path = original.clone();
        for record in &self.renames {
            if let Some(rerooted) = path.reroot(&record.from, &record.to) {
                path = rerooted;
            }
        }
        path
    }
}

/// The surface a sync pass reads and mutates the plan hierarchy through.
pub trait SyncWorker {
    // Raw surface, one implementation per mode.

    /// True when a node exists at `path` (through the overlay in what-if).
    fn exists(&self, path: &HierPath) -> bool;
    /// The template ID at `path`, if the node exists.
    fn template_id(&self, path: &HierPath) -> Option<String>;
    /// Current child names at `path`, in order.
    fn children(&self, path: &HierPath) -> Vec<String>;
    /// One data element at `path`.
    fn get_value(&self, path: &HierPath, name: &str) -> Option<DataEntry>;
    /// Creates a node. No change recording; use [`SyncWorker::add_template`].
    fn create_node(&mut self, path: &HierPath, template_id: &str) -> Result<(), SyncError>;
    /// Removes a subtree. No change recording; use [`SyncWorker::delete_node`].
    fn remove_node(&mut self, path: &HierPath) -> Result<(), SyncError>;
    /// Moves a subtree. No change recording; use [`SyncWorker::rename_node`].
    fn move_node(&mut self, from: &HierPath, to: &HierPath) -> Result<(), SyncError>;
    /// Applies a child order. Use [`SyncWorker::reorder_children`].
    fn apply_child_order(&mut self, path: &HierPath, order: &[String]) -> Result<(), SyncError>;
    /// Replaces a template ID. Use [`SyncWorker::set_template_id`].
    fn retype_node(&mut self, path: &HierPath, template_id: &str) -> Result<(), SyncError>;
    /// Writes or restores-to-default one data element, without touching the
    /// change list. Sync writes never carry a user-edit timestamp.
    fn write_value(
        &mut self,
        path: &HierPath,
        name: &str,
        value: Option<DataValue>,
    ) -> Result<(), SyncError>;
    /// The pass log.
    fn log(&self) -> &WorkerLog;
    /// The pass log, mutably.
    fn log_mut(&mut self) -> &mut WorkerLog;
    /// Takes the pass log, leaving an empty one.
    fn take_log(&mut self) -> WorkerLog;

    // Provided layer: shared semantics for every mode.

    /// A text-typed element, if present with that type.
    fn get_text(&self, path: &HierPath, name: &str) -> Option<String> {
        self.get_value(path, name).and_then(|e| e.value.as_text().map(str::to_string))
    }

    /// A number-typed element, if present with that type.
    fn get_number(&self, path: &HierPath, name: &str) -> Option<f64> {
        self.get_value(path, name).and_then(|e| e.value.as_number())
    }

    /// Creates a node and records the change.
    fn add_template(&mut self, path: &HierPath, template_id: &str) -> Result<(), SyncError> {
        self.create_node(path, template_id)?;
        self.log_mut().record_added(path.clone());
        self.note_change(format!("Created '{path}'"));
        Ok(())
    }

    /// Deletes a subtree and records the change.
    fn delete_node(&mut self, path: &HierPath) -> Result<(), SyncError> {
        self.remove_node(path)?;
        self.log_mut().record_deleted(path.clone());
        self.note_change(format!("Deleted '{path}'"));
        Ok(())
    }

    /// Renames or moves a node and records the change. The rename is also
    /// remembered for pre-rename path translation.
    fn rename_node(&mut self, from: &HierPath, to: &HierPath) -> Result<(), SyncError> {
        self.move_node(from, to)?;
        self.log_mut().record_rename(from.clone(), to.clone());
        self.note_change(format!("Renamed '{from}' to '{to}'"));
        Ok(())
    }

    /// Reorders children when the requested order differs.
    fn reorder_children(&mut self, path: &HierPath, order: &[String]) -> Result<(), SyncError> {
        if self.children(path) == order {
            return Ok(());
        }
        self.apply_child_order(path, order)?;
        self.note_unlisted_change();
        Ok(())
    }

    /// Changes a node's template when it differs.
    fn set_template_id(&mut self, path: &HierPath, template_id: &str) -> Result<(), SyncError> {
        if self.template_id(path).as_deref() == Some(template_id) {
            return Ok(());
        }
        self.retype_node(path, template_id)?;
        self.note_change(format!("Changed the type of '{path}'"));
        Ok(())
    }

    /// Writes a value when it differs, recording an unlisted change.
    fn put_value(
        &mut self,
        path: &HierPath,
        name: &str,
        value: Option<DataValue>,
    ) -> Result<(), SyncError> {
        let existing = self.get_value(path, name).map(|e| e.value);
        if existing == value {
            return Ok(());
        }
        self.write_value(path, name, value)?;
        self.note_unlisted_change();
        Ok(())
    }

    /// Writes a value unconditionally, without a change entry. For sync
    /// bookkeeping (IDs, counters, companions) that is not user-visible.
    fn force_put_value(
        &mut self,
        path: &HierPath,
        name: &str,
        value: DataValue,
    ) -> Result<(), SyncError> {
        self.write_value(path, name, Some(value))
    }

    /// Three-way value merge of a document value against the local element.
    ///
    /// The baseline is the last value adopted from the document. A side
    /// that still matches the baseline has not moved and yields to the
    /// other; in particular a re-exported but unchanged document value
    /// never overwrites a local edit, whatever the stamps say. When both
    /// sides moved, the fresher one wins: the local value holds when its
    /// edit is newer than `source_stamp`. A winning local value is
    /// returned so the caller can record a discrepancy, and the losing
    /// export's stamp is remembered so refetching that same export does
    /// not reopen the merge. Only a fresher export gets a new hearing.
    fn put_value_synced(
        &mut self,
        path: &HierPath,
        name: &str,
        value: DataValue,
        source_stamp: Option<DateTime<Utc>>,
    ) -> Result<Option<DataSyncResult>, SyncError> {
        let synced_el = names::last_synced(name);
        let baseline = self.get_value(path, &synced_el).map(|e| e.value);
        match self.get_value(path, name) {
            None => {
                self.put_value(path, name, Some(value.clone()))?;
                self.write_value(path, &synced_el, Some(value))?;
                Ok(None)
            }
            Some(current) if current.value == value => {
                if baseline.as_ref() != Some(&value) {
                    self.write_value(path, &synced_el, Some(value))?;
                }
                Ok(None)
            }
            Some(current) => {
                let local_changed = baseline.as_ref() != Some(&current.value);
                let doc_changed = baseline.as_ref() != Some(&value);
                let lost_before = match (
                    source_stamp,
                    self.get_value(path, &names::source_stamp(name)).map(|e| e.value),
                ) {
                    (Some(stamp), Some(DataValue::Date(seen))) => seen >= stamp,
                    _ => false,
                };
                let local_newer = match (current.edited, source_stamp) {
                    (Some(edit), Some(stamp)) => edit > stamp,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if local_changed && (!doc_changed || lost_before || local_newer) {
                    if let Some(stamp) = source_stamp {
                        self.write_value(
                            path,
                            &names::source_stamp(name),
                            Some(DataValue::Date(stamp)),
                        )?;
                    }
                    Ok(Some(DataSyncResult { value: current.value, edited: current.edited }))
                } else {
                    self.put_value(path, name, Some(value.clone()))?;
                    self.write_value(path, &synced_el, Some(value))?;
                    Ok(None)
                }
            }
        }
    }

    /// Marks a leaf complete (if it is not already) with today's date.
    fn mark_leaf_complete(&mut self, path: &HierPath) -> Result<(), SyncError> {
        if self.get_value(path, names::COMPLETED).is_none() {
            self.write_value(path, names::COMPLETED, Some(DataValue::Date(Utc::now())))?;
            self.log_mut().record_completed(path.clone());
            self.note_change(format!("Marked '{path}' complete"));
        }
        Ok(())
    }

    /// Clears a leaf's completion mark.
    fn mark_leaf_incomplete(&mut self, path: &HierPath) -> Result<(), SyncError> {
        if self.get_value(path, names::COMPLETED).is_some() {
            self.write_value(path, names::COMPLETED, None)?;
            self.note_change(format!("Marked '{path}' incomplete"));
        }
        Ok(())
    }

    /// Marks a composite node complete, along with every descendant leaf
    /// that has no completion date yet.
    fn mark_composite_complete(&mut self, path: &HierPath) -> Result<(), SyncError> {
        let mut pending = vec![path.clone()];
        let mut any = false;
        while let Some(node) = pending.pop() {
            let kids = self.children(&node);
            if kids.is_empty() {
                if self.get_value(&node, names::COMPLETED).is_none() {
                    self.write_value(&node, names::COMPLETED, Some(DataValue::Date(Utc::now())))?;
                    self.log_mut().record_completed(node);
                    any = true;
                }
            } else {
                pending.extend(kids.into_iter().map(|k| node.child(k)));
            }
        }
        if any {
            self.note_change(format!("Marked '{path}' complete"));
        }
        Ok(())
    }

    /// Clears completion marks across a composite node's subtree.
    fn mark_composite_incomplete(&mut self, path: &HierPath) -> Result<(), SyncError> {
        let mut pending = vec![path.clone()];
        let mut any = false;
        while let Some(node) = pending.pop() {
            if self.get_value(&node, names::COMPLETED).is_some() {
                self.write_value(&node, names::COMPLETED, None)?;
                any = true;
            }
            pending.extend(self.children(&node).into_iter().map(|k| node.child(k)));
        }
        if any {
            self.note_change(format!("Marked '{path}' incomplete"));
        }
        Ok(())
    }

    /// Where the node now at `current` sat when the pass started.
    fn original_path(&self, current: &HierPath) -> HierPath {
        self.log().original_path(current)
    }

    /// Appends a described change entry.
    fn note_change(&mut self, text: String) {
        self.log_mut().note_described(text);
    }

    /// Records the unlisted-data sentinel.
    fn note_unlisted_change(&mut self) {
        self.log_mut().note_unlisted();
    }

    /// Appends a warning entry.
    fn note_warning(&mut self, text: String) {
        self.log_mut().note_warning(text);
    }

    /// True once the pass has recorded any change.
    fn has_changes(&self) -> bool {
        self.log().has_changes()
    }
}
