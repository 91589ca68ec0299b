//! The project root node's sync.
//!
//! The root is the one node placement never touches: it is never renamed,
//! moved, or deleted, because the local project path is the plan owner's
//! own choice. Its sync records the document identities on the existing
//! root and walks the children.

use wbs_hier::{DataValue, HierPath};
use wbs_model::{NodeIdent, WbsNode};

use crate::dispatch::{child_base, Dispatch, SyncContext};
use crate::error::SyncError;
use crate::names;
use crate::worker::SyncWorker;

/// Syncs the document root onto the local project node at `project`.
pub(crate) fn sync_root(
    dispatch: &Dispatch,
    ctx: &mut SyncContext<'_>,
    worker: &mut dyn SyncWorker,
    project: &HierPath,
    root: &WbsNode,
) -> Result<(), SyncError> {
    ctx.tick(worker)?;

    if worker.get_text(project, names::PROJECT_ID).as_deref() != Some(ctx.project_id) {
        worker.force_put_value(
            project,
            names::PROJECT_ID,
            DataValue::Text(ctx.project_id.to_string()),
        )?;
    }
    if let Some(id) = &root.id {
        if worker.get_text(project, names::WBS_ID).as_deref() != Some(id) {
            worker.force_put_value(project, names::WBS_ID, DataValue::Text(id.clone()))?;
        }
        // Registering the root's claim up front lets first-pass pseudo
        // identities resolve down from it.
        ctx.index.record_new(&NodeIdent::Official(id.clone()), project.clone());
    }
    if let Some(tid) = &root.tid {
        if worker.get_text(project, names::TASK_IDS).as_deref() != Some(tid) {
            worker.force_put_value(project, names::TASK_IDS, DataValue::Text(tid.clone()))?;
        }
    }

    dispatch.sync_children(ctx, worker, project, &root.children, child_base(root, None).as_ref())
}
