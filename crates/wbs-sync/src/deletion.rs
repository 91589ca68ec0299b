//! Deferred resolution of nodes the document no longer contains.
//!
//! Individual-role passes never delete during the walk. Proposals queue
//! up here and are resolved afterwards, when the final shape of the plan
//! is known: an untouched subtree is deleted (permission allowing), a
//! worked leaf is marked complete instead, and a worked interior node
//! keeps its skeleton but loses its document linkage.

use wbs_hier::HierPath;

use crate::error::SyncError;
use crate::names;
use crate::options::Permissions;
use crate::worker::SyncWorker;

/// Deletions proposed during the walk, resolved after it.
#[derive(Debug, Default)]
pub(crate) struct DeletionQueue {
    proposed: Vec<HierPath>,
}

/// Nodes whose resolution is waiting on explicit user permission.
#[derive(Debug, Default)]
pub(crate) struct DeferredOutcome {
    pub deletions_pending: Vec<HierPath>,
    pub completions_pending: Vec<HierPath>,
}

impl DeletionQueue {
    /// Queues one subtree for post-walk resolution.
    pub(crate) fn propose(&mut self, path: HierPath) {
        tracing::debug!("Proposing '{}' for deletion", path);
        self.proposed.push(path);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.proposed.is_empty()
    }

    /// Resolves every queued proposal, parents first. A proposal inside an
    /// already-resolved subtree is redundant and skipped.
    pub(crate) fn resolve(
        self,
        worker: &mut dyn SyncWorker,
        permissions: &Permissions,
    ) -> Result<DeferredOutcome, SyncError> {
        let mut queue = self.proposed;
        queue.sort();
        queue.dedup();

        let mut outcome = DeferredOutcome::default();
        let mut handled: Vec<HierPath> = Vec::new();
        for path in queue {
            if handled.iter().any(|done| done.is_prefix_of(&path)) {
                tracing::debug!("Skipping '{}', covered by an ancestor", path);
                continue;
            }
            resolve_node(worker, &path, permissions, &mut outcome)?;
            handled.push(path);
        }
        Ok(outcome)
    }
}

fn resolve_node(
    worker: &mut dyn SyncWorker,
    path: &HierPath,
    permissions: &Permissions,
    outcome: &mut DeferredOutcome,
) -> Result<(), SyncError> {
    // The walk may have restructured things since the proposal was queued.
    if !worker.exists(path) {
        return Ok(());
    }
    if subtree_is_disposable(worker, path) {
        if permissions.allows_delete(path) {
            worker.delete_node(path)?;
        } else {
            outcome.deletions_pending.push(path.clone());
        }
        return Ok(());
    }
    let children = worker.children(path);
    if children.is_empty() {
        if permissions.allows_complete(path) {
            worker.mark_leaf_complete(path)?;
        } else {
            outcome.completions_pending.push(path.clone());
        }
        return Ok(());
    }
    // The subtree holds work somewhere below. Unhook this node from the
    // document and let each child make its own case.
    worker.put_value(path, names::TASK_IDS, None)?;
    for child in children {
        resolve_node(worker, &path.child(child), permissions, outcome)?;
    }
    Ok(())
}

/// True when nothing in the subtree would be lost by deleting it: no
/// actual time, no defects, no completion dates, no hand-created nodes.
fn subtree_is_disposable(worker: &dyn SyncWorker, path: &HierPath) -> bool {
    let mut pending = vec![path.clone()];
    while let Some(node) = pending.pop() {
        if worker.get_number(&node, names::ACT_TIME).is_some_and(|minutes| minutes > 0.0)
            || worker.get_number(&node, names::DEFECT_COUNT).is_some_and(|count| count > 0.0)
            || worker.get_value(&node, names::COMPLETED).is_some()
            || worker.get_value(&node, names::USER_CREATED).is_some()
        {
            return false;
        }
        pending.extend(worker.children(&node).into_iter().map(|name| node.child(name)));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::LiveSyncWorker;
    use pretty_assertions::assert_eq;
    use wbs_hier::{DataEntry, HierarchyStore, MemHierarchy};

    fn p(s: &str) -> HierPath {
        s.parse().unwrap()
    }

    fn store() -> MemHierarchy {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/A"), names::COMPONENT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/A/B"), names::TASK_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/C"), names::TASK_TEMPLATE).unwrap();
        store
    }

    #[test]
    fn parents_resolve_first_and_cover_their_children() {
        let mut store = store();
        let mut worker = LiveSyncWorker::new(&mut store);
        let mut queue = DeletionQueue::default();
        queue.propose(p("/Proj/A/B"));
        queue.propose(p("/Proj/C"));
        queue.propose(p("/Proj/A"));

        let outcome = queue.resolve(&mut worker, &Permissions::allow_all()).unwrap();
        assert!(outcome.deletions_pending.is_empty());
        // One delete for the whole /Proj/A subtree, one for /Proj/C.
        assert_eq!(worker.log().deleted(), &[p("/Proj/A"), p("/Proj/C")]);
    }

    #[test]
    fn worked_leaves_complete_instead_of_deleting() {
        let mut store = store();
        store.put_data(&p("/Proj/C"), names::ACT_TIME, Some(DataEntry::number(30.0))).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        let mut queue = DeletionQueue::default();
        queue.propose(p("/Proj/C"));

        queue.resolve(&mut worker, &Permissions::allow_all()).unwrap();
        assert!(worker.exists(&p("/Proj/C")));
        assert_eq!(worker.log().completed(), &[p("/Proj/C")]);
    }

    #[test]
    fn worked_interiors_lose_their_linkage_and_recurse() {
        let mut store = store();
        store.put_data(&p("/Proj/A"), names::TASK_IDS, Some(DataEntry::text("PR:7"))).unwrap();
        store
            .put_data(&p("/Proj/A"), names::COMPLETED, Some(DataEntry::text("2026-01-05")))
            .unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        let mut queue = DeletionQueue::default();
        queue.propose(p("/Proj/A"));

        queue.resolve(&mut worker, &Permissions::allow_all()).unwrap();
        // The completed interior survives without its task IDs; the clean
        // child below it is deleted.
        assert!(worker.exists(&p("/Proj/A")));
        assert!(worker.get_value(&p("/Proj/A"), names::TASK_IDS).is_none());
        assert_eq!(worker.log().deleted(), &[p("/Proj/A/B")]);
    }

    #[test]
    fn withheld_permission_defers_to_the_pending_lists() {
        let mut store = store();
        store.put_data(&p("/Proj/C"), names::ACT_TIME, Some(DataEntry::number(10.0))).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        let mut queue = DeletionQueue::default();
        queue.propose(p("/Proj/A"));
        queue.propose(p("/Proj/C"));

        let none_allowed = Permissions::default()
            .with_deletes_allowed(Vec::new())
            .with_completions_allowed(Vec::new());
        let outcome = queue.resolve(&mut worker, &none_allowed).unwrap();
        assert_eq!(outcome.deletions_pending, vec![p("/Proj/A")]);
        assert_eq!(outcome.completions_pending, vec![p("/Proj/C")]);
        assert!(worker.exists(&p("/Proj/A")));
        assert!(worker.log().deleted().is_empty());
    }

    #[test]
    fn vanished_proposals_are_ignored() {
        let mut store = store();
        let mut worker = LiveSyncWorker::new(&mut store);
        let mut queue = DeletionQueue::default();
        queue.propose(p("/Proj/gone"));

        let outcome = queue.resolve(&mut worker, &Permissions::allow_all()).unwrap();
        assert!(outcome.deletions_pending.is_empty());
        assert!(worker.log().deleted().is_empty());
    }

    #[test]
    fn hand_created_nodes_are_not_disposable() {
        let mut store = store();
        store.put_data(&p("/Proj/A/B"), names::USER_CREATED, Some(DataEntry::tag())).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        assert!(!subtree_is_disposable(&worker, &p("/Proj/A")));

        let mut queue = DeletionQueue::default();
        queue.propose(p("/Proj/A"));
        queue.resolve(&mut worker, &Permissions::allow_all()).unwrap();
        // The hand-created leaf completes; its parent skeleton survives.
        assert!(worker.exists(&p("/Proj/A/B")));
        assert_eq!(worker.log().completed(), &[p("/Proj/A/B")]);
    }
}
