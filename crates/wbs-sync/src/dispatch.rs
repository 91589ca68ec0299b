//! Per-node-type dispatch and the shared child walk.
//!
//! The walk visits the pruned document tree top-down. Every node type has
//! one [`SyncAction`]; the dispatch table routes each document node to its
//! action, and [`Dispatch::sync_children`] carries the structure work every
//! container shares: recursing in document order, retiring local children
//! the document no longer names, and reordering survivors to match.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use wbs_hier::HierPath;
use wbs_model::{pseudo_ident, NodeTag, WbsNode};

use crate::deletion::DeletionQueue;
use crate::discrepancy::DiscrepancyLog;
use crate::error::{StopReason, SyncError};
use crate::handler;
use crate::identity::IdentityIndex;
use crate::lock::{Pacer, SyncLockGuard};
use crate::names;
use crate::options::SyncOptions;
use crate::phase::PhaseResolver;
use crate::worker::SyncWorker;

/// Pseudo-identity context threaded down the walk: the official ID of the
/// nearest identified ancestor plus the names from it down to the current
/// node's parent.
#[derive(Debug, Clone)]
pub(crate) struct PseudoBase {
    pub(crate) ancestor_id: String,
    pub(crate) rel: Vec<String>,
}

impl PseudoBase {
    /// A base anchored directly at an identified node.
    pub(crate) fn anchored(ancestor_id: impl Into<String>) -> Self {
        Self { ancestor_id: ancestor_id.into(), rel: Vec::new() }
    }

    /// The pseudo identity of a child named `name` of the current node.
    pub(crate) fn ident_for(&self, name: &str) -> String {
        let mut names = self.rel.clone();
        names.push(name.to_string());
        pseudo_ident(&self.ancestor_id, &names)
    }

    /// The base for grandchildren, reached through the child named `name`.
    pub(crate) fn descend(&self, name: &str) -> Self {
        let mut rel = self.rel.clone();
        rel.push(name.to_string());
        Self { ancestor_id: self.ancestor_id.clone(), rel }
    }
}

/// The base a node's children resolve pseudo identities against: the node
/// itself when it carries an official ID, otherwise the parent's base one
/// level further away.
pub(crate) fn child_base(node: &WbsNode, base: Option<&PseudoBase>) -> Option<PseudoBase> {
    match &node.id {
        Some(id) => Some(PseudoBase::anchored(id.clone())),
        None => base.map(|b| b.descend(&node.name)),
    }
}

/// Everything a pass threads through the walk.
pub(crate) struct SyncContext<'a> {
    pub(crate) options: &'a SyncOptions,
    pub(crate) project_id: &'a str,
    /// Document export time, the source stamp for three-way value merges.
    pub(crate) source_stamp: Option<DateTime<Utc>>,
    pub(crate) index: IdentityIndex,
    pub(crate) phases: PhaseResolver,
    /// Pruned-away children by parent official ID, for team aggregates.
    pub(crate) removed: IndexMap<String, Vec<WbsNode>>,
    pub(crate) discrepancies: DiscrepancyLog,
    pub(crate) deletions: DeletionQueue,
    /// Legacy process tasks whose phase children need a manual prompt.
    pub(crate) psp_pending: Vec<HierPath>,
    pub(crate) pacer: Pacer,
    pub(crate) guard: &'a SyncLockGuard,
}

impl SyncContext<'_> {
    /// Node-boundary housekeeping: naps when paced, and in brief mode ends
    /// the walk at the first recorded change.
    pub(crate) fn tick(&self, worker: &dyn SyncWorker) -> Result<(), SyncError> {
        if self.options.mode.is_brief() && worker.has_changes() {
            return Err(SyncError::Stopped(StopReason::ChangeFound));
        }
        self.pacer.pace(self.guard);
        Ok(())
    }

    /// Total planned time pruned from under the parent with official ID
    /// `id`.
    pub(crate) fn removed_time(&self, id: &str) -> f64 {
        self.removed
            .get(id)
            .map_or(0.0, |children| children.iter().map(WbsNode::subtree_time).sum())
    }
}

/// One node type's synchronization behavior.
pub(crate) trait SyncAction {
    /// Syncs `node`, a document child of the local node at `prefix`.
    ///
    /// Returns the local child name the node occupies afterwards, or
    /// `None` when it leaves no local child behind.
    fn sync(
        &self,
        dispatch: &Dispatch,
        ctx: &mut SyncContext<'_>,
        worker: &mut dyn SyncWorker,
        prefix: &HierPath,
        node: &WbsNode,
        base: Option<&PseudoBase>,
    ) -> Result<Option<String>, SyncError>;
}

/// Routes document nodes to their type's action.
pub(crate) struct Dispatch {
    table: HashMap<NodeTag, Box<dyn SyncAction>>,
}

impl Dispatch {
    pub(crate) fn new() -> Self {
        let mut table: HashMap<NodeTag, Box<dyn SyncAction>> = HashMap::new();
        table.insert(NodeTag::Component, Box::new(handler::ComponentSync::component()));
        table.insert(NodeTag::Document, Box::new(handler::ComponentSync::read_only()));
        table.insert(NodeTag::Task, Box::new(handler::TaskSync));
        table.insert(NodeTag::PspTask, Box::new(handler::PspTaskSync));
        table.insert(NodeTag::ProbeTask, Box::new(handler::ProbeTaskSync));
        Self { table }
    }

    #[cfg(test)]
    pub(crate) fn with_table(table: HashMap<NodeTag, Box<dyn SyncAction>>) -> Self {
        Self { table }
    }

    /// Syncs one document node under the local `prefix`.
    pub(crate) fn sync_node(
        &self,
        ctx: &mut SyncContext<'_>,
        worker: &mut dyn SyncWorker,
        prefix: &HierPath,
        node: &WbsNode,
        base: Option<&PseudoBase>,
    ) -> Result<Option<String>, SyncError> {
        ctx.tick(worker)?;
        match self.table.get(&node.tag) {
            Some(action) => action.sync(self, ctx, worker, prefix, node, base),
            None => {
                tracing::debug!("No sync action for '{}' nodes, skipping '{}'", node.tag, node.name);
                Ok(None)
            }
        }
    }

    /// Syncs a container's children: recurses in document order, retires
    /// local children the document no longer names, and reorders the
    /// survivors to the document's order.
    ///
    /// Local children whose template this engine does not own are the
    /// user's and are never retired or reordered away; they keep their
    /// relative order after the document's children.
    pub(crate) fn sync_children(
        &self,
        ctx: &mut SyncContext<'_>,
        worker: &mut dyn SyncWorker,
        parent: &HierPath,
        children: &[WbsNode],
        base: Option<&PseudoBase>,
    ) -> Result<(), SyncError> {
        let mut recognized: Vec<String> = Vec::new();
        for child in children {
            if let Some(name) = self.sync_node(ctx, worker, parent, child, base)? {
                recognized.push(name);
            }
        }

        for name in worker.children(parent) {
            if recognized.iter().any(|r| *r == name) {
                continue;
            }
            let path = parent.child(name);
            let Some(template) = worker.template_id(&path) else { continue };
            if !names::is_wbs_template(&template) {
                continue;
            }
            // Nodes added locally and not yet adopted upstream are not the
            // document's to retire.
            if worker.get_value(&path, names::USER_CREATED).is_some() {
                continue;
            }
            if worker.get_text(&path, names::WBS_ID).is_none()
                && worker.get_value(&path, names::CLIENT_ID).is_some()
            {
                continue;
            }
            if ctx.options.role.is_team() {
                worker.delete_node(&path)?;
            } else {
                ctx.deletions.propose(path);
            }
        }

        if recognized.len() > 1 {
            let current = worker.children(parent);
            let mut order = recognized.clone();
            order.extend(current.into_iter().filter(|name| !recognized.contains(name)));
            worker.reorder_children(parent, &order)?;
        }
        Ok(())
    }
}
