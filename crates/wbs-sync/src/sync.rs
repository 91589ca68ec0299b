//! The synchronization driver.
//!
//! One [`WbsSynchronizer`] is one document-to-plan pairing. Every pass runs
//! the same pipeline regardless of mode: fetch and parse the document,
//! replay unseen fork/merge history, mint local identities and collect the
//! keep-set, prune the document to the role's slice, walk the pruned tree
//! through the per-type handlers, resolve deferred deletions, merge the
//! plan owner's schedule, export the discrepancy list, and stamp the pass.
//! The mode only picks the worker the pipeline mutates through, which is
//! what keeps a what-if report identical to what a live pass would do.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use wbs_hier::{DataValue, HierPath, HierarchyStore};
use wbs_model::{DocumentSource, NodeIdent, NodeTag, WbsDocument, WbsNode};

use crate::change::ChangeEntry;
use crate::deletion::{DeferredOutcome, DeletionQueue};
use crate::discrepancy::{Discrepancy, DiscrepancyLog};
use crate::dispatch::{Dispatch, SyncContext};
use crate::error::SyncError;
use crate::handler;
use crate::identity::{prepare_local, IdentityIndex};
use crate::live::LiveSyncWorker;
use crate::lock::{LockClass, Pacer, SyncLockGuard, SyncLockRegistry};
use crate::names;
use crate::options::{SyncMode, SyncOptions, SyncRole};
use crate::phase::PhaseResolver;
use crate::prune::prune;
use crate::replay::apply_history;
use crate::schedule::sync_member_schedule;
use crate::traced::TracedWorker;
use crate::whatif::WhatIfSyncWorker;
use crate::worker::{RenameRecord, SyncWorker};

/// What one pass changed, deferred, and wants to ask the user about.
#[derive(Debug, Serialize)]
pub struct SyncReport {
    /// The mode the pass ran in.
    pub mode: SyncMode,
    /// User-facing change list, in walk order.
    pub changes: Vec<ChangeEntry>,
    /// Nodes created, in creation order.
    pub nodes_added: Vec<HierPath>,
    /// Nodes deleted.
    pub nodes_deleted: Vec<HierPath>,
    /// Nodes marked complete instead of deleted.
    pub nodes_completed: Vec<HierPath>,
    /// Renames and moves, in the order performed.
    pub renames: Vec<RenameRecord>,
    /// Deletions waiting on explicit user permission.
    pub deletions_pending: Vec<HierPath>,
    /// Completions waiting on explicit user permission.
    pub completions_pending: Vec<HierPath>,
    /// Legacy process tasks whose phase children need a manual prompt.
    pub psp_tasks_pending: Vec<HierPath>,
    /// Reverse-sync records produced by the pass.
    pub discrepancies: Vec<Discrepancy>,
    /// True when a brief pass stopped at its first change.
    pub stopped_early: bool,
}

impl SyncReport {
    /// True when the pass found nothing to change.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }

    /// True when something needs a user decision before the plan fully
    /// matches the document.
    #[must_use]
    pub fn needs_attention(&self) -> bool {
        !self.deletions_pending.is_empty()
            || !self.completions_pending.is_empty()
            || !self.psp_tasks_pending.is_empty()
    }

    /// The warnings recorded during the pass.
    pub fn warnings(&self) -> impl Iterator<Item = &ChangeEntry> {
        self.changes.iter().filter(|c| c.is_warning())
    }
}

/// Bookkeeping a pass accumulates outside the worker log.
#[derive(Default)]
struct PassOutputs {
    deferred: DeferredOutcome,
    psp_pending: Vec<HierPath>,
    discrepancies: Vec<Discrepancy>,
}

/// One configured document-to-plan pairing.
pub struct WbsSynchronizer {
    project: HierPath,
    source: Box<dyn DocumentSource>,
    options: SyncOptions,
    locks: Arc<SyncLockRegistry>,
}

impl WbsSynchronizer {
    /// A synchronizer for the plan at `project`, fed from `source`.
    #[must_use]
    pub fn new(project: HierPath, source: Box<dyn DocumentSource>, options: SyncOptions) -> Self {
        Self { project, source, options, locks: Arc::new(SyncLockRegistry::new()) }
    }

    /// Shares a lock registry with other synchronizers in the process.
    ///
    /// Without this each synchronizer holds a private registry, which
    /// serializes its own passes but not passes started elsewhere.
    #[must_use]
    pub fn with_lock_registry(mut self, locks: Arc<SyncLockRegistry>) -> Self {
        self.locks = locks;
        self
    }

    /// The options this pairing runs under.
    #[must_use]
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Runs one pass against `store` and reports what it did.
    ///
    /// In live mode the store is mutated. In the what-if modes it is only
    /// read, and the report describes what a live pass would have done.
    pub fn sync(&self, store: &mut dyn HierarchyStore) -> Result<SyncReport, SyncError> {
        let bytes = self.source.fetch()?;
        let doc = WbsDocument::parse(&bytes)?;
        if !store.node_exists(&self.project) {
            return Err(SyncError::ProjectMissing(self.project.to_string()));
        }

        tracing::info!(
            "Starting {:?} sync of '{}' from {}",
            self.options.mode,
            self.project,
            self.source.description()
        );
        let class = if self.options.background {
            LockClass::Background
        } else {
            LockClass::Interactive
        };
        let guard = self.locks.acquire(&self.project.to_string(), class);

        if self.options.mode.is_live() {
            let mut worker = TracedWorker::new(LiveSyncWorker::new(store));
            self.run_pass(&mut worker, &doc, &guard)
        } else {
            let mut worker = TracedWorker::new(WhatIfSyncWorker::new(&*store));
            self.run_pass(&mut worker, &doc, &guard)
        }
    }

    fn run_pass(
        &self,
        worker: &mut dyn SyncWorker,
        doc: &WbsDocument,
        guard: &SyncLockGuard,
    ) -> Result<SyncReport, SyncError> {
        let mut outputs = PassOutputs::default();
        let stopped_early = match self.walk(worker, doc, guard, &mut outputs) {
            Ok(()) => false,
            Err(SyncError::Stopped(reason)) => {
                tracing::debug!("Pass over '{}' stopped early: {}", self.project, reason);
                true
            }
            Err(err) => return Err(err),
        };

        let log = worker.take_log();
        let report = SyncReport {
            mode: self.options.mode,
            changes: log.changes().to_vec(),
            nodes_added: log.added().to_vec(),
            nodes_deleted: log.deleted().to_vec(),
            nodes_completed: log.completed().to_vec(),
            renames: log.renames().to_vec(),
            deletions_pending: outputs.deferred.deletions_pending,
            completions_pending: outputs.deferred.completions_pending,
            psp_tasks_pending: outputs.psp_pending,
            discrepancies: outputs.discrepancies,
            stopped_early,
        };
        tracing::info!(
            "Finished sync of '{}': {} changes, {} added, {} deleted, {} pending decisions",
            self.project,
            report.changes.len(),
            report.nodes_added.len(),
            report.nodes_deleted.len(),
            report.deletions_pending.len()
                + report.completions_pending.len()
                + report.psp_tasks_pending.len(),
        );
        Ok(report)
    }

    fn walk(
        &self,
        worker: &mut dyn SyncWorker,
        doc: &WbsDocument,
        guard: &SyncLockGuard,
        outputs: &mut PassOutputs,
    ) -> Result<(), SyncError> {
        apply_history(worker, &self.project, doc)?;
        let keep = prepare_local(worker, &self.project, &self.options)?;
        let pruned = prune(&doc.root, &keep, &self.options.role);

        let mut ctx = SyncContext {
            options: &self.options,
            project_id: &doc.project_id,
            source_stamp: doc.exported,
            index: IdentityIndex::build(worker, &self.project),
            // Phase names resolve against the whole document, not the slice.
            phases: PhaseResolver::from_document(&doc.root),
            removed: pruned.removed,
            discrepancies: DiscrepancyLog::default(),
            deletions: DeletionQueue::default(),
            psp_pending: Vec::new(),
            pacer: Pacer::new(self.options.throttle, self.options.background),
            guard,
        };

        let walked =
            handler::sync_root(&Dispatch::new(), &mut ctx, worker, &self.project, &pruned.root)
                .and_then(|()| self.close_out(&mut ctx, worker, doc, outputs));
        // A stopped pass still hands back whatever it queued first.
        outputs.psp_pending = std::mem::take(&mut ctx.psp_pending);
        outputs.discrepancies = std::mem::take(&mut ctx.discrepancies).into_items();
        walked
    }

    /// The post-walk stages: deferred deletions, the owner's schedule, the
    /// discrepancy export, and the pass timestamp.
    fn close_out(
        &self,
        ctx: &mut SyncContext<'_>,
        worker: &mut dyn SyncWorker,
        doc: &WbsDocument,
        outputs: &mut PassOutputs,
    ) -> Result<(), SyncError> {
        let queue = std::mem::take(&mut ctx.deletions);
        outputs.deferred = queue.resolve(worker, &self.options.permissions)?;

        if let SyncRole::Individual { initials, .. } = &self.options.role {
            if let Some(member) = find_member(&doc.root, initials) {
                match member.id.as_ref().or(doc.root.id.as_ref()) {
                    Some(id) => {
                        let ident = NodeIdent::Official(id.clone());
                        sync_member_schedule(
                            worker,
                            &self.project,
                            &ident,
                            member,
                            &mut ctx.discrepancies,
                        )?;
                    }
                    None => tracing::debug!(
                        "Member row '{}' carries no usable identity, skipping its schedule",
                        member.name
                    ),
                }
            }
        }

        ctx.discrepancies.export(worker, &self.project)?;
        worker.force_put_value(&self.project, names::LAST_SYNC, DataValue::Date(Utc::now()))?;
        Ok(())
    }
}

impl std::fmt::Debug for WbsSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WbsSynchronizer")
            .field("project", &self.project)
            .field("source", &self.source.description())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// The first team-member row whose initials match, searched depth-first
/// through the unpruned document.
fn find_member<'d>(node: &'d WbsNode, initials: &str) -> Option<&'d WbsNode> {
    if node.tag == NodeTag::TeamMember
        && node.initials.as_deref().is_some_and(|i| i.eq_ignore_ascii_case(initials))
    {
        return Some(node);
    }
    node.children.iter().find_map(|child| find_member(child, initials))
}
