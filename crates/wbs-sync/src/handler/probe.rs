//! Sizing-wizard task sync.
//!
//! A probe task estimates through the local sizing wizard. The document
//! supplies the unit of measure and starting numbers; once the wizard has
//! produced its own estimate, that estimate is the member's plan and the
//! document's planned size no longer adopts. Actual size keeps merging
//! throughout.

use wbs_hier::{DataValue, HierPath};
use wbs_model::WbsNode;

use crate::dispatch::{Dispatch, PseudoBase, SyncAction, SyncContext};
use crate::error::SyncError;
use crate::handler::resolve::place_node;
use crate::handler::task::sync_common_values;
use crate::names;
use crate::worker::SyncWorker;

const STATE_PENDING: &str = "pending";
const STATE_SIZED: &str = "sized";
const STATE_COMPLETE: &str = "complete";

pub(crate) struct ProbeTaskSync;

impl SyncAction for ProbeTaskSync {
    fn sync(
        &self,
        _dispatch: &Dispatch,
        ctx: &mut SyncContext<'_>,
        worker: &mut dyn SyncWorker,
        prefix: &HierPath,
        node: &WbsNode,
        base: Option<&PseudoBase>,
    ) -> Result<Option<String>, SyncError> {
        let placed = place_node(ctx, worker, prefix, node, base, names::PROBE_TASK_TEMPLATE)?;
        if !node.children.is_empty() {
            tracing::debug!(
                "Ignoring document children under the sizing task '{}'",
                placed.path
            );
        }

        sync_wizard_inputs(ctx, worker, &placed.path, node)?;
        sync_common_values(ctx, worker, &placed.path, node, base)?;

        if node.quasi_pruned {
            ctx.deletions.propose(placed.path.clone());
        }
        Ok(Some(placed.name))
    }
}

fn sync_wizard_inputs(
    ctx: &mut SyncContext<'_>,
    worker: &mut dyn SyncWorker,
    path: &HierPath,
    node: &WbsNode,
) -> Result<(), SyncError> {
    if worker.get_text(path, names::WIZARD_STATE).is_none() {
        worker.force_put_value(
            path,
            names::WIZARD_STATE,
            DataValue::Text(STATE_PENDING.to_string()),
        )?;
    }
    let Some(record) = node.sizes.first() else {
        return Ok(());
    };
    worker.put_value(path, names::SIZE_UNITS, Some(DataValue::Text(record.units.clone())))?;

    let stamp = record.timestamp.or(ctx.source_stamp);
    let state = worker.get_text(path, names::WIZARD_STATE);
    let wizard_holds = matches!(state.as_deref(), Some(STATE_SIZED | STATE_COMPLETE));
    if !wizard_holds {
        if let Some(plan) = record.plan {
            worker.put_value_synced(path, names::EST_SIZE, DataValue::Number(plan), stamp)?;
        }
    }
    if let Some(actual) = record.actual {
        worker.put_value_synced(path, names::ACT_SIZE, DataValue::Number(actual), stamp)?;
    }
    Ok(())
}
