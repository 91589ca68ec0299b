//! Structural node sync: components and read-only document references.

use wbs_hier::{DataValue, HierPath};
use wbs_model::WbsNode;

use crate::dispatch::{child_base, Dispatch, PseudoBase, SyncAction, SyncContext};
use crate::error::SyncError;
use crate::handler::resolve::place_node;
use crate::names;
use crate::worker::SyncWorker;

/// Syncs structural nodes. Components and read-only document references
/// share every behavior except the template they are created with.
pub(crate) struct ComponentSync {
    template: &'static str,
}

impl ComponentSync {
    pub(crate) fn component() -> Self {
        Self { template: names::COMPONENT_TEMPLATE }
    }

    pub(crate) fn read_only() -> Self {
        Self { template: names::READONLY_DOC_TEMPLATE }
    }
}

impl SyncAction for ComponentSync {
    fn sync(
        &self,
        dispatch: &Dispatch,
        ctx: &mut SyncContext<'_>,
        worker: &mut dyn SyncWorker,
        prefix: &HierPath,
        node: &WbsNode,
        base: Option<&PseudoBase>,
    ) -> Result<Option<String>, SyncError> {
        let placed = place_node(ctx, worker, prefix, node, base, self.template)?;
        let next = child_base(node, base);
        dispatch.sync_children(ctx, worker, &placed.path, &node.children, next.as_ref())?;

        if ctx.options.role.is_team() {
            write_rollup_estimate(ctx, worker, &placed.path, node)?;
        }
        if node.quasi_pruned {
            ctx.deletions.propose(placed.path.clone());
        }
        Ok(Some(placed.name))
    }
}

/// Team rollups carry no task nodes; a component's own estimate is the
/// planned time of everything pruned from directly under it.
fn write_rollup_estimate(
    ctx: &SyncContext<'_>,
    worker: &mut dyn SyncWorker,
    path: &HierPath,
    node: &WbsNode,
) -> Result<(), SyncError> {
    let Some(id) = &node.id else {
        return Ok(());
    };
    let minutes = ctx.removed_time(id);
    if minutes > 0.0 || worker.get_number(path, names::EST_TIME).is_some() {
        worker.put_value(path, names::EST_TIME, Some(DataValue::Number(minutes)))?;
    }
    Ok(())
}
