//! Legacy process task sync.
//!
//! A process task does not take its structure from the document. Its
//! children are literal phase nodes generated from the project workflow,
//! one per phase, and the member must pick the process configuration by
//! hand when the task first appears. Document children under one are
//! ignored.

use wbs_hier::HierPath;
use wbs_model::WbsNode;

use crate::dispatch::{Dispatch, PseudoBase, SyncAction, SyncContext};
use crate::error::SyncError;
use crate::handler::resolve::place_node;
use crate::handler::task::sync_common_values;
use crate::names;
use crate::worker::SyncWorker;

pub(crate) struct PspTaskSync;

impl SyncAction for PspTaskSync {
    fn sync(
        &self,
        _dispatch: &Dispatch,
        ctx: &mut SyncContext<'_>,
        worker: &mut dyn SyncWorker,
        prefix: &HierPath,
        node: &WbsNode,
        base: Option<&PseudoBase>,
    ) -> Result<Option<String>, SyncError> {
        let placed = place_node(ctx, worker, prefix, node, base, names::PSP_TASK_TEMPLATE)?;
        if !node.children.is_empty() {
            tracing::debug!(
                "Ignoring document children under the process task '{}'",
                placed.path
            );
        }

        sync_phase_children(ctx, worker, &placed.path)?;
        sync_common_values(ctx, worker, &placed.path, node, base)?;

        if placed.created {
            ctx.psp_pending.push(placed.path.clone());
        }
        if node.quasi_pruned {
            ctx.deletions.propose(placed.path.clone());
        }
        Ok(Some(placed.name))
    }
}

/// Keeps the literal phase children in step with the project workflow:
/// missing phases are created, phases dropped from the workflow go to the
/// deferred-deletion queue, and survivors take workflow order with any
/// other children after them.
fn sync_phase_children(
    ctx: &mut SyncContext<'_>,
    worker: &mut dyn SyncWorker,
    path: &HierPath,
) -> Result<(), SyncError> {
    let phases: Vec<String> = ctx.phases.phases().to_vec();
    for phase in &phases {
        let child = path.child(phase.as_str());
        if !worker.exists(&child) {
            worker.add_template(&child, names::PHASE_TEMPLATE)?;
        }
    }

    let current = worker.children(path);
    for name in &current {
        let child = path.child(name.as_str());
        if worker.template_id(&child).as_deref() == Some(names::PHASE_TEMPLATE)
            && !ctx.phases.is_phase_name(name)
        {
            ctx.deletions.propose(child);
        }
    }

    let mut order: Vec<String> = Vec::new();
    for phase in &phases {
        if let Some(name) = current.iter().find(|n| n.eq_ignore_ascii_case(phase)) {
            order.push(name.clone());
        }
    }
    // Everything else, dropped phases included, keeps its relative order
    // at the back. The order must name every child.
    let rest: Vec<String> = current.iter().filter(|n| !order.contains(n)).cloned().collect();
    order.extend(rest);
    worker.reorder_children(path, &order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deletion::DeletionQueue;
    use crate::discrepancy::DiscrepancyLog;
    use crate::identity::IdentityIndex;
    use crate::live::LiveSyncWorker;
    use crate::lock::{LockClass, Pacer, SyncLockRegistry};
    use crate::options::{SyncOptions, SyncRole};
    use crate::phase::PhaseResolver;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use wbs_hier::{DataEntry, HierarchyStore, MemHierarchy};
    use wbs_model::NodeTag;

    fn p(s: &str) -> HierPath {
        s.parse().unwrap()
    }

    macro_rules! psp_ctx {
        ($ctx:ident, $worker:expr, $phases:expr) => {
            let options = SyncOptions::new(SyncRole::individual("aa", "alice"));
            let registry = SyncLockRegistry::new();
            let guard = registry.acquire("/Proj", LockClass::Interactive);
            let mut $ctx = SyncContext {
                options: &options,
                project_id: "PR",
                source_stamp: None,
                index: IdentityIndex::build(&$worker, &p("/Proj")),
                phases: $phases,
                removed: IndexMap::new(),
                discrepancies: DiscrepancyLog::default(),
                deletions: DeletionQueue::default(),
                psp_pending: Vec::new(),
                pacer: Pacer::new(Duration::ZERO, false),
                guard: &guard,
            };
        };
    }

    fn workflow(names: &[&str]) -> PhaseResolver {
        let mut flow = WbsNode::new(NodeTag::Workflow, "Dev");
        flow.children = names.iter().map(|n| WbsNode::new(NodeTag::Other("phase".into()), *n)).collect();
        let root = WbsNode::new(NodeTag::Project, "P").with_child(flow);
        PhaseResolver::from_document(&root)
    }

    #[test]
    fn new_process_task_grows_phase_children_and_prompts() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        psp_ctx!(ctx, worker, workflow(&["Design", "Code", "Test"]));

        let node = WbsNode::new(NodeTag::PspTask, "Module A").with_id("17").with_time("aa=240");
        PspTaskSync
            .sync(&Dispatch::new(), &mut ctx, &mut worker, &p("/Proj"), &node, None)
            .unwrap();

        let path = p("/Proj/Module A");
        assert_eq!(worker.template_id(&path).unwrap(), names::PSP_TASK_TEMPLATE);
        assert_eq!(worker.children(&path), vec!["Design", "Code", "Test"]);
        assert_eq!(ctx.psp_pending, vec![path.clone()]);
        // The estimate lands on the task itself; phases are not document
        // children.
        let est = worker.get_number(&path, names::EST_TIME).unwrap();
        assert!((est - 240.0).abs() < f64::EPSILON);
    }

    #[test]
    fn workflow_changes_reshape_the_phase_children() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/M"), names::PSP_TASK_TEMPLATE).unwrap();
        store.put_data(&p("/Proj/M"), names::WBS_ID, Some(DataEntry::text("17"))).unwrap();
        store.add_node(&p("/Proj/M/Design"), names::PHASE_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/M/Compile"), names::PHASE_TEMPLATE).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        psp_ctx!(ctx, worker, workflow(&["Design", "Code"]));

        let node = WbsNode::new(NodeTag::PspTask, "M").with_id("17").with_time("aa=60");
        PspTaskSync
            .sync(&Dispatch::new(), &mut ctx, &mut worker, &p("/Proj"), &node, None)
            .unwrap();

        // The dropped phase waits for the deferred resolver; the new one
        // exists, and workflow order leads.
        assert_eq!(worker.children(&p("/Proj/M")), vec!["Design", "Code", "Compile"]);
        let queue = std::mem::take(&mut ctx.deletions);
        queue.resolve(&mut worker, &ctx.options.permissions).unwrap();
        assert_eq!(worker.children(&p("/Proj/M")), vec!["Design", "Code"]);
        // An existing task is not re-prompted.
        assert!(ctx.psp_pending.is_empty());
    }

    #[test]
    fn worked_phase_children_complete_instead_of_vanishing() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/M"), names::PSP_TASK_TEMPLATE).unwrap();
        store.put_data(&p("/Proj/M"), names::WBS_ID, Some(DataEntry::text("17"))).unwrap();
        store.add_node(&p("/Proj/M/Compile"), names::PHASE_TEMPLATE).unwrap();
        store
            .put_data(&p("/Proj/M/Compile"), names::ACT_TIME, Some(DataEntry::number(25.0)))
            .unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        psp_ctx!(ctx, worker, workflow(&["Design", "Code"]));

        let node = WbsNode::new(NodeTag::PspTask, "M").with_id("17").with_time("aa=60");
        PspTaskSync
            .sync(&Dispatch::new(), &mut ctx, &mut worker, &p("/Proj"), &node, None)
            .unwrap();
        let queue = std::mem::take(&mut ctx.deletions);
        queue.resolve(&mut worker, &ctx.options.permissions).unwrap();

        assert!(worker.exists(&p("/Proj/M/Compile")));
        assert!(worker.get_value(&p("/Proj/M/Compile"), names::COMPLETED).is_some());
    }
}
