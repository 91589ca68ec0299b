//! Local identity index and the keep-set builder.
//!
//! Before the document walk starts, one pass over the local hierarchy
//! mints client IDs for locally created nodes, records which identities
//! are exempt from deletion (the keep-set the pruner consults), and builds
//! the index the handlers use to find a document node's local home across
//! renames.

use std::collections::{HashMap, HashSet};

use wbs_hier::{DataValue, HierPath};
use wbs_model::{client_ident, pseudo_ident, NodeIdent};

use crate::error::SyncError;
use crate::names;
use crate::options::{SyncOptions, SyncRole};
use crate::worker::SyncWorker;

/// Identities that must survive document pruning.
///
/// Empty for the team role: team rollups carry no per-member history, so
/// everything may be pruned.
#[derive(Debug, Default)]
pub struct KeepSet {
    idents: HashSet<NodeIdent>,
}

impl KeepSet {
    /// Adds an identity. The sync driver fills the set via
    /// [`prepare_local`]; embedders can extend it before pruning.
    pub fn insert(&mut self, ident: NodeIdent) {
        self.idents.insert(ident);
    }

    /// True when `ident` must be kept.
    #[must_use]
    pub fn contains(&self, ident: &NodeIdent) -> bool {
        self.idents.contains(ident)
    }

    /// True when nothing is exempt.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.idents.is_empty()
    }
}

/// Where local nodes sit, by identity scheme.
///
/// Official IDs can be claimed by several paths at once (copied subtrees,
/// templates gone wrong); resolution prefers the claimant with the most
/// logged actual time. Client IDs are unique by construction.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    by_official: HashMap<String, Vec<HierPath>>,
    by_client: HashMap<String, HierPath>,
}

impl IdentityIndex {
    /// Indexes the subtree at `root`.
    pub fn build(worker: &dyn SyncWorker, root: &HierPath) -> Self {
        let mut index = Self::default();
        let mut pending = vec![root.clone()];
        while let Some(path) = pending.pop() {
            if let Some(id) = worker.get_text(&path, names::WBS_ID) {
                index.by_official.entry(id).or_default().push(path.clone());
            }
            if let Some(cid) = worker.get_text(&path, names::CLIENT_ID) {
                index.by_client.insert(cid, path.clone());
            }
            pending.extend(worker.children(&path).into_iter().map(|c| path.child(c)));
        }
        index
    }

    /// Every path currently claiming `id`.
    #[must_use]
    pub fn official_candidates(&self, id: &str) -> &[HierPath] {
        self.by_official.get(id).map_or(&[], Vec::as_slice)
    }

    /// True when some path other than `path` claims `id`.
    #[must_use]
    pub fn official_claimed_elsewhere(&self, id: &str, path: &HierPath) -> bool {
        self.official_candidates(id).iter().any(|p| p != path)
    }

    /// Resolves one identity claim to a local path, if any node answers it.
    pub fn resolve(&self, worker: &dyn SyncWorker, ident: &NodeIdent) -> Option<HierPath> {
        match ident {
            NodeIdent::Official(id) => self.best_official(worker, id),
            NodeIdent::Client(cid) => self
                .by_client
                .get(cid)
                .filter(|p| worker.exists(p))
                .cloned(),
            NodeIdent::Pseudo(pseudo) => self.resolve_pseudo(worker, pseudo),
        }
    }

    fn best_official(&self, worker: &dyn SyncWorker, id: &str) -> Option<HierPath> {
        let mut best: Option<(&HierPath, f64)> = None;
        for candidate in self.official_candidates(id) {
            if !worker.exists(candidate) {
                continue;
            }
            let time = subtree_actual_time(worker, candidate);
            match best {
                Some((_, top)) if time <= top => {}
                _ => best = Some((candidate, time)),
            }
        }
        best.map(|(path, _)| path.clone())
    }

    fn resolve_pseudo(&self, worker: &dyn SyncWorker, pseudo: &str) -> Option<HierPath> {
        let (ancestor, rel) = pseudo.split_once(':')?;
        let candidates = self.by_official.get(ancestor)?;
        for base in candidates {
            if !worker.exists(base) {
                continue;
            }
            let mut path = base.clone();
            for name in rel.split('/') {
                path = path.child(name);
            }
            // A node already claimed by an official ID is someone else's.
            if worker.exists(&path) && worker.get_text(&path, names::WBS_ID).is_none() {
                return Some(path);
            }
        }
        None
    }

    /// Rewrites indexed paths after a rename or move.
    pub fn record_move(&mut self, from: &HierPath, to: &HierPath) {
        for paths in self.by_official.values_mut() {
            for path in paths.iter_mut() {
                if let Some(moved) = path.reroot(from, to) {
                    *path = moved;
                }
            }
        }
        for path in self.by_client.values_mut() {
            if let Some(moved) = path.reroot(from, to) {
                *path = moved;
            }
        }
    }

    /// Registers a node created or claimed during the walk.
    pub fn record_new(&mut self, ident: &NodeIdent, path: HierPath) {
        match ident {
            NodeIdent::Official(id) => {
                let paths = self.by_official.entry(id.clone()).or_default();
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
            NodeIdent::Client(cid) => {
                self.by_client.insert(cid.clone(), path);
            }
            NodeIdent::Pseudo(_) => {}
        }
    }
}

/// Total actual time logged in the subtree at `path`.
pub(crate) fn subtree_actual_time(worker: &dyn SyncWorker, path: &HierPath) -> f64 {
    let mut total = 0.0;
    let mut pending = vec![path.clone()];
    while let Some(node) = pending.pop() {
        total += worker.get_number(&node, names::ACT_TIME).unwrap_or(0.0);
        pending.extend(worker.children(&node).into_iter().map(|c| node.child(c)));
    }
    total
}

/// True when the walk must never delete `path`: logged actual time or
/// defects, a completion mark, or withheld deletion permission.
pub(crate) fn deletion_exempt(
    worker: &dyn SyncWorker,
    path: &HierPath,
    options: &SyncOptions,
) -> bool {
    if worker.get_number(path, names::ACT_TIME).unwrap_or(0.0) > 0.0 {
        return true;
    }
    if worker.get_number(path, names::DEFECT_COUNT).unwrap_or(0.0) > 0.0 {
        return true;
    }
    if worker.get_value(path, names::COMPLETED).is_some() {
        return true;
    }
    !options.permissions.allows_delete(path)
}

/// The pre-walk pass over the local hierarchy: mints client IDs for nodes
/// lacking any identity and collects the keep-set.
///
/// Minting goes through `force_put_value` so it happens in what-if mode
/// too, against the overlay. The per-dataset sequence counter persists on
/// the project root.
pub fn prepare_local(
    worker: &mut dyn SyncWorker,
    project: &HierPath,
    options: &SyncOptions,
) -> Result<KeepSet, SyncError> {
    let mut keep = KeepSet::default();
    if options.role.is_team() {
        return Ok(keep);
    }

    let start = worker
        .get_number(project, names::CLIENT_ID_COUNTER)
        .unwrap_or(0.0)
        .max(0.0) as u64;
    let mut counter = start;
    let dataset = worker
        .get_text(project, names::DATASET_ID)
        .unwrap_or_else(|| options.dataset_id.clone());

    let root_official = worker.get_text(project, names::WBS_ID);
    let root_base = root_official.map(|id| (id, Vec::new()));
    for child in worker.children(project) {
        let child_base = extend_base(root_base.as_ref(), &child);
        visit(worker, &project.child(child), child_base, options, &dataset, &mut counter, &mut keep)?;
    }

    if counter != start {
        #[allow(clippy::cast_precision_loss)]
        worker.force_put_value(
            project,
            names::CLIENT_ID_COUNTER,
            DataValue::Number(counter as f64),
        )?;
    }
    Ok(keep)
}

fn extend_base(
    base: Option<&(String, Vec<String>)>,
    child_name: &str,
) -> Option<(String, Vec<String>)> {
    base.map(|(ancestor, rel)| {
        let mut rel = rel.clone();
        rel.push(child_name.to_string());
        (ancestor.clone(), rel)
    })
}

fn visit(
    worker: &mut dyn SyncWorker,
    path: &HierPath,
    base: Option<(String, Vec<String>)>,
    options: &SyncOptions,
    dataset: &str,
    counter: &mut u64,
    keep: &mut KeepSet,
) -> Result<bool, SyncError> {
    let official = worker.get_text(path, names::WBS_ID);
    let mut client = worker.get_text(path, names::CLIENT_ID);

    if official.is_none() && client.is_none() {
        if let SyncRole::Individual { owner, .. } = &options.role {
            *counter += 1;
            let cid = client_ident(owner, dataset, *counter);
            worker.force_put_value(path, names::CLIENT_ID, DataValue::Text(cid.clone()))?;
            client = Some(cid);
        }
    }

    let mut kept = deletion_exempt(worker, path, options);
    for child_name in worker.children(path) {
        let child_base = match &official {
            Some(id) => Some((id.clone(), vec![child_name.clone()])),
            None => extend_base(base.as_ref(), &child_name),
        };
        if visit(worker, &path.child(child_name), child_base, options, dataset, counter, keep)? {
            kept = true;
        }
    }

    if kept {
        if let Some(id) = official {
            keep.insert(NodeIdent::Official(id));
        }
        if let Some(cid) = client {
            keep.insert(NodeIdent::Client(cid));
        }
        if let Some((ancestor, rel)) = base {
            if !rel.is_empty() {
                keep.insert(NodeIdent::Pseudo(pseudo_ident(&ancestor, &rel)));
            }
        }
    }
    Ok(kept)
}
