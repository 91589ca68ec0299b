//! Ordinary task sync: placement, subtasks, and the value merges.
//!
//! Task values split three ways. Plan values the owner may edit locally
//! (estimate, sizes, note) go through the three-way merge, and a local
//! win becomes a discrepancy for the reverse sync. Document-owned
//! metadata (labels, milestone) is mirrored, with a change entry when it
//! moves. Linkage bookkeeping (dependencies, workflow source) is mirrored
//! silently.

use wbs_hier::{DataValue, HierPath};
use wbs_model::WbsNode;

use crate::dispatch::{child_base, Dispatch, PseudoBase, SyncAction, SyncContext};
use crate::discrepancy::{Discrepancy, SizeMetric};
use crate::error::SyncError;
use crate::handler::resolve::{doc_ident, place_node};
use crate::names;
use crate::options::SyncRole;
use crate::worker::{DataSyncResult, SyncWorker};

pub(crate) struct TaskSync;

impl SyncAction for TaskSync {
    fn sync(
        &self,
        dispatch: &Dispatch,
        ctx: &mut SyncContext<'_>,
        worker: &mut dyn SyncWorker,
        prefix: &HierPath,
        node: &WbsNode,
        base: Option<&PseudoBase>,
    ) -> Result<Option<String>, SyncError> {
        let placed = place_node(ctx, worker, prefix, node, base, names::TASK_TEMPLATE)?;
        let next = child_base(node, base);
        dispatch.sync_children(ctx, worker, &placed.path, &node.children, next.as_ref())?;

        sync_common_values(ctx, worker, &placed.path, node, base)?;
        if node.quasi_pruned {
            ctx.deletions.propose(placed.path.clone());
        }
        Ok(Some(placed.name))
    }
}

/// The value sync every task-like node shares, whatever its template.
pub(crate) fn sync_common_values(
    ctx: &mut SyncContext<'_>,
    worker: &mut dyn SyncWorker,
    path: &HierPath,
    node: &WbsNode,
    base: Option<&PseudoBase>,
) -> Result<(), SyncError> {
    sync_estimate(ctx, worker, path, node, base)?;
    sync_phase(ctx, worker, path, node)?;
    sync_sizes(ctx, worker, path, node, base)?;
    sync_note(ctx, worker, path, node, base)?;
    sync_dependencies(worker, path, node)?;

    worker.put_value(path, names::LABELS, text_value(node.labels.as_deref()))?;
    worker.put_value(path, names::MILESTONE, text_value(node.milestone.as_deref()))?;
    mirror_silently(worker, path, names::WORKFLOW_ID, node.workflow_id.as_deref())?;
    Ok(())
}

fn text_value(value: Option<&str>) -> Option<DataValue> {
    value.map(|v| DataValue::Text(v.to_string()))
}

fn mirror_silently(
    worker: &mut dyn SyncWorker,
    path: &HierPath,
    name: &str,
    value: Option<&str>,
) -> Result<(), SyncError> {
    if worker.get_text(path, name).as_deref() == value {
        return Ok(());
    }
    worker.write_value(path, name, text_value(value))
}

/// Merges the owner's planned minutes onto a leaf task.
///
/// A task the document subdivides carries no direct estimate of its own,
/// the children's estimates are the plan. Completed planning locks the
/// estimate against further document updates.
fn sync_estimate(
    ctx: &mut SyncContext<'_>,
    worker: &mut dyn SyncWorker,
    path: &HierPath,
    node: &WbsNode,
    base: Option<&PseudoBase>,
) -> Result<(), SyncError> {
    if !node.children.is_empty() {
        worker.put_value(path, names::EST_TIME, None)?;
        return Ok(());
    }
    if worker.get_value(path, names::PLANNING_COMPLETE).is_some() {
        return Ok(());
    }
    let Some(initials) = ctx.options.role.initials() else {
        return Ok(());
    };
    let Some(minutes) = node.assignments().for_owner(initials) else {
        return Ok(());
    };
    let kept = worker.put_value_synced(
        path,
        names::EST_TIME,
        DataValue::Number(minutes),
        ctx.source_stamp,
    )?;
    if let Some(kept) = kept {
        if let (Some(local), Some(ident)) = (kept.value.as_number(), doc_ident(node, base)) {
            ctx.discrepancies.record(Discrepancy::PlanTime {
                path: path.clone(),
                ident,
                minutes: local,
                edited: kept.edited,
            });
        }
    }
    Ok(())
}

fn sync_phase(
    ctx: &mut SyncContext<'_>,
    worker: &mut dyn SyncWorker,
    path: &HierPath,
    node: &WbsNode,
) -> Result<(), SyncError> {
    let Some(raw) = node.effective_phase.as_deref().or(node.phase_name.as_deref()) else {
        return Ok(());
    };
    match ctx.phases.resolve(raw) {
        Ok(resolved) => {
            let resolved = resolved.to_string();
            worker.put_value(path, names::EFFECTIVE_PHASE, Some(DataValue::Text(resolved)))
        }
        Err(err) => {
            worker.note_warning(format!("Cannot set the phase of '{path}': {err}"));
            Ok(())
        }
    }
}

fn sync_sizes(
    ctx: &mut SyncContext<'_>,
    worker: &mut dyn SyncWorker,
    path: &HierPath,
    node: &WbsNode,
    base: Option<&PseudoBase>,
) -> Result<(), SyncError> {
    for record in &node.sizes {
        let stamp = record.timestamp.or(ctx.source_stamp);
        if let Some(plan) = record.plan {
            let kept = worker.put_value_synced(
                path,
                &names::size_plan(&record.units),
                DataValue::Number(plan),
                stamp,
            )?;
            record_size_win(ctx, path, node, base, &record.units, SizeMetric::Plan, kept);
        }
        if let Some(actual) = record.actual {
            let kept = worker.put_value_synced(
                path,
                &names::size_actual(&record.units),
                DataValue::Number(actual),
                stamp,
            )?;
            record_size_win(ctx, path, node, base, &record.units, SizeMetric::Actual, kept);
        }
    }
    Ok(())
}

fn record_size_win(
    ctx: &mut SyncContext<'_>,
    path: &HierPath,
    node: &WbsNode,
    base: Option<&PseudoBase>,
    units: &str,
    metric: SizeMetric,
    kept: Option<DataSyncResult>,
) {
    let Some(kept) = kept else { return };
    if let (Some(value), Some(ident)) = (kept.value.as_number(), doc_ident(node, base)) {
        ctx.discrepancies.record(Discrepancy::SizeData {
            path: path.clone(),
            ident,
            units: units.to_string(),
            metric,
            value,
            edited: kept.edited,
        });
    }
}

fn sync_note(
    ctx: &mut SyncContext<'_>,
    worker: &mut dyn SyncWorker,
    path: &HierPath,
    node: &WbsNode,
    base: Option<&PseudoBase>,
) -> Result<(), SyncError> {
    let Some(note) = &node.note else {
        return Ok(());
    };
    let stamp = note.timestamp.or(ctx.source_stamp);
    let kept =
        worker.put_value_synced(path, names::NOTE, DataValue::Text(note.text.clone()), stamp)?;
    if let Some(kept) = kept {
        if let (Some(text), Some(ident)) = (kept.value.as_text(), doc_ident(node, base)) {
            let author = match &ctx.options.role {
                SyncRole::Individual { owner, .. } => Some(owner.clone()),
                SyncRole::Team => None,
            };
            ctx.discrepancies.record(Discrepancy::ItemNote {
                path: path.clone(),
                ident,
                text: text.to_string(),
                author,
                edited: kept.edited,
            });
        }
    }
    Ok(())
}

fn sync_dependencies(
    worker: &mut dyn SyncWorker,
    path: &HierPath,
    node: &WbsNode,
) -> Result<(), SyncError> {
    if node.dependencies.is_empty() {
        if worker.get_value(path, names::DEPENDENCIES).is_some() {
            worker.write_value(path, names::DEPENDENCIES, None)?;
        }
        return Ok(());
    }
    let json = serde_json::to_string(&node.dependencies)?;
    mirror_silently(worker, path, names::DEPENDENCIES, Some(&json))
}
