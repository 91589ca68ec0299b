//! Role-aware document pruning.
//!
//! A personal plan carries only the slice of the WBS assigned to its owner,
//! plus whatever local history forbids removing. A team rollup carries the
//! component structure with every task leaf aggregated away. The pruner
//! produces that slice as a scrubbed copy of the document tree, and a side
//! table of what was cut, keyed by the parent's official ID, so aggregate
//! calculations can still see the removed work.

use std::collections::HashSet;

use indexmap::IndexMap;
use wbs_model::{pseudo_ident, NodeIdent, WbsNode};

use crate::identity::KeepSet;
use crate::options::SyncRole;

/// The pruned copy plus the removed-children side table.
#[derive(Debug)]
pub struct PruneOutcome {
    /// The surviving tree. The project root always survives.
    pub root: WbsNode,
    /// Children cut during pruning, grouped by their parent's official ID.
    /// Children of unidentified parents group under the empty key.
    pub removed: IndexMap<String, Vec<WbsNode>>,
}

impl PruneOutcome {
    /// Total planned time cut from under the parent with official ID `id`.
    #[must_use]
    pub fn removed_time(&self, id: &str) -> f64 {
        self.removed
            .get(id)
            .map_or(0.0, |children| children.iter().map(WbsNode::subtree_time).sum())
    }
}

/// Replaces typographic punctuation and path separators in a node name.
///
/// Names become local node names, so they must survive path addressing and
/// byte-exact matching against what an earlier pass wrote.
#[must_use]
pub fn scrub_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        match ch {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2015}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '/' => out.push('-'),
            _ => out.push(ch),
        }
    }
    out
}

/// Prunes a scrubbed copy of `root` for the given role.
#[must_use]
pub fn prune(root: &WbsNode, keep: &KeepSet, role: &SyncRole) -> PruneOutcome {
    let mut copy = sanitize(root);
    let mut pruner = Pruner { keep, role, removed: IndexMap::new() };
    pruner.prune_children(&mut copy, &[]);
    PruneOutcome { root: copy, removed: pruner.removed }
}

/// Deep-copies a node with scrubbed names and deterministic sibling
/// deduplication: later duplicates get an incrementing `(duplicate N)`
/// suffix, starting at 2.
fn sanitize(node: &WbsNode) -> WbsNode {
    let mut copy = node.clone();
    sanitize_in_place(&mut copy);
    copy
}

fn sanitize_in_place(node: &mut WbsNode) {
    node.name = scrub_name(&node.name);
    let mut used: HashSet<String> = HashSet::new();
    for child in &mut node.children {
        sanitize_in_place(child);
        if child.name.is_empty() {
            continue;
        }
        let base = child.name.clone();
        let mut n = 2;
        while !used.insert(child.name.clone()) {
            child.name = format!("{base} (duplicate {n})");
            n += 1;
        }
    }
}

/// Why a node survived pruning. The distinction matters downstream: nodes
/// held only for history's sake are proposed to the deferred-deletion
/// resolver, nodes holding live work never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Survival {
    /// Cut.
    No,
    /// The actor's live work, here or below.
    Live,
    /// Held only by local history that must not be lost.
    HistoryOnly,
}

struct Pruner<'a> {
    keep: &'a KeepSet,
    role: &'a SyncRole,
    removed: IndexMap<String, Vec<WbsNode>>,
}

impl Pruner<'_> {
    /// Prunes under `node`; returns whether any child survived and whether
    /// any surviving descendant is live work.
    ///
    /// `bases` carries one `(ancestor official ID, relative names)` pair per
    /// identified ancestor, so a child's pseudo identity can be checked
    /// under all of them.
    fn prune_children(
        &mut self,
        node: &mut WbsNode,
        bases: &[(String, Vec<String>)],
    ) -> (bool, bool) {
        let parent_key = node.id.clone().unwrap_or_default();
        let mut surviving = Vec::new();
        let mut any = false;
        let mut live = false;
        for mut child in std::mem::take(&mut node.children) {
            let mut child_bases: Vec<(String, Vec<String>)> = bases
                .iter()
                .map(|(ancestor, rel)| {
                    let mut rel = rel.clone();
                    rel.push(child.name.clone());
                    (ancestor.clone(), rel)
                })
                .collect();
            if let Some(id) = &node.id {
                child_bases.push((id.clone(), vec![child.name.clone()]));
            }
            match self.retain(&mut child, &child_bases) {
                Survival::No => {
                    if child.tag.is_structural() && !child.name.is_empty() {
                        self.removed.entry(parent_key.clone()).or_default().push(child);
                    }
                }
                outcome => {
                    any = true;
                    live |= outcome == Survival::Live;
                    surviving.push(child);
                }
            }
        }
        node.children = surviving;
        (any, live)
    }

    /// Decides whether `node` survives, pruning its subtree along the way.
    fn retain(&mut self, node: &mut WbsNode, bases: &[(String, Vec<String>)]) -> Survival {
        if node.name.is_empty() {
            return Survival::No;
        }
        if !node.tag.is_structural() {
            // Workflow and team rows feed the phase resolver and schedule
            // merge from the unpruned document; they never enter the walk.
            return Survival::No;
        }
        if self.role.is_team() {
            if node.tag.is_task_like() {
                return Survival::No;
            }
            self.prune_children(node, bases);
            return Survival::Live;
        }

        let kept = self.intersects_keep(node, bases);
        let assigned = !node.pruned
            && self
                .role
                .initials()
                .is_some_and(|initials| node.assignments().contains_owner(initials));
        let (any_child, live_below) = self.prune_children(node, bases);

        if assigned || live_below {
            return Survival::Live;
        }
        if kept || any_child {
            node.quasi_pruned = true;
            return Survival::HistoryOnly;
        }
        Survival::No
    }

    fn intersects_keep(&self, node: &WbsNode, bases: &[(String, Vec<String>)]) -> bool {
        if self.keep.is_empty() {
            return false;
        }
        if let Some(id) = &node.id {
            if self.keep.contains(&NodeIdent::Official(id.clone())) {
                return true;
            }
        }
        if let Some(cid) = &node.cid {
            if self.keep.contains(&NodeIdent::Client(cid.clone())) {
                return true;
            }
        }
        bases
            .iter()
            .filter(|(_, rel)| !rel.is_empty())
            .any(|(ancestor, rel)| {
                self.keep.contains(&NodeIdent::Pseudo(pseudo_ident(ancestor, rel)))
            })
    }
}
