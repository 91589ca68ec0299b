//! Finding, moving, or making the local home of a document node.
//!
//! Placement is the first step every handler shares: resolve the document
//! node to a local path through the identity index, move the node so it
//! sits under the current parent with the document's name (renaming any
//! unrelated occupant aside), create it when nothing answers, align its
//! template, and record its identities on the node and in the index.

use wbs_hier::{DataValue, HierPath};
use wbs_model::{NodeIdent, WbsNode};

use crate::discrepancy::Discrepancy;
use crate::dispatch::{PseudoBase, SyncContext};
use crate::error::SyncError;
use crate::names;
use crate::worker::SyncWorker;

/// Where a document node landed locally.
pub(crate) struct Placement {
    pub(crate) path: HierPath,
    /// The child name the node occupies under its parent.
    pub(crate) name: String,
    /// True when placement created the node.
    pub(crate) created: bool,
}

/// The identity a document node answers to, strongest scheme first.
pub(crate) fn doc_ident(node: &WbsNode, base: Option<&PseudoBase>) -> Option<NodeIdent> {
    if let Some(id) = &node.id {
        return Some(NodeIdent::Official(id.clone()));
    }
    if let Some(cid) = &node.cid {
        return Some(NodeIdent::Client(cid.clone()));
    }
    base.map(|b| NodeIdent::Pseudo(b.ident_for(&node.name)))
}

/// Places `node` at `prefix`/`node.name` and returns where it landed.
pub(crate) fn place_node(
    ctx: &mut SyncContext<'_>,
    worker: &mut dyn SyncWorker,
    prefix: &HierPath,
    node: &WbsNode,
    base: Option<&PseudoBase>,
    template: &str,
) -> Result<Placement, SyncError> {
    let target = prefix.child(node.name.as_str());
    let mut found = locate(ctx, worker, node, base);

    if found.as_ref() != Some(&target) && worker.exists(&target) {
        move_occupant_aside(ctx, worker, prefix, &node.name)?;
        // The aside rename may have carried the found node along with the
        // occupant's subtree; resolve again against the updated index.
        found = locate(ctx, worker, node, base);
    }

    let created = match found {
        Some(ref home) if *home == target => false,
        Some(home) => {
            worker.rename_node(&home, &target)?;
            ctx.index.record_move(&home, &target);
            false
        }
        None => {
            worker.add_template(&target, template)?;
            true
        }
    };

    align_template(ctx, worker, &target, node, base, template)?;
    record_identity(ctx, worker, &target, node)?;
    Ok(Placement { path: target, name: node.name.clone(), created })
}

/// Resolves the document node to a local path, trying each identity
/// scheme in strength order. A relaunched node that resolves nowhere
/// under its new ID is found through its previous-cycle ID.
fn locate(
    ctx: &SyncContext<'_>,
    worker: &dyn SyncWorker,
    node: &WbsNode,
    base: Option<&PseudoBase>,
) -> Option<HierPath> {
    if let Some(id) = &node.id {
        if let Some(path) = ctx.index.resolve(worker, &NodeIdent::Official(id.clone())) {
            return Some(path);
        }
    }
    if let Some(cid) = &node.cid {
        if let Some(path) = ctx.index.resolve(worker, &NodeIdent::Client(cid.clone())) {
            return Some(path);
        }
    }
    if let Some(base) = base {
        let pseudo = NodeIdent::Pseudo(base.ident_for(&node.name));
        if let Some(path) = ctx.index.resolve(worker, &pseudo) {
            return Some(path);
        }
    }
    if let Some(source) = &node.relaunch_source_id {
        if let Some(path) = ctx.index.resolve(worker, &NodeIdent::Official(source.clone())) {
            return Some(path);
        }
    }
    None
}

/// Renames the node occupying `prefix`/`name` to the first free
/// `"<name> (non-WBS)"` variant.
fn move_occupant_aside(
    ctx: &mut SyncContext<'_>,
    worker: &mut dyn SyncWorker,
    prefix: &HierPath,
    name: &str,
) -> Result<(), SyncError> {
    let from = prefix.child(name);
    let mut aside = format!("{name} (non-WBS)");
    let mut n = 2;
    while worker.exists(&prefix.child(aside.as_str())) {
        aside = format!("{name} (non-WBS {n})");
        n += 1;
    }
    let to = prefix.child(aside);
    worker.rename_node(&from, &to)?;
    ctx.index.record_move(&from, &to);
    Ok(())
}

/// Brings the local template in line with the type the document wants.
///
/// The document only distinguishes task from structure, while local task
/// templates also name the owner's chosen process. So a task-typed wish
/// never replaces another task template, and a structural node that has
/// grown children is left alone with a recorded type discrepancy rather
/// than having its subtree orphaned under a leaf type.
fn align_template(
    ctx: &mut SyncContext<'_>,
    worker: &mut dyn SyncWorker,
    path: &HierPath,
    node: &WbsNode,
    base: Option<&PseudoBase>,
    want: &str,
) -> Result<(), SyncError> {
    let Some(current) = worker.template_id(path) else {
        return Ok(());
    };
    if current == want {
        return Ok(());
    }
    if is_task_template(want) {
        if is_task_template(&current) {
            return Ok(());
        }
        if !worker.children(path).is_empty() {
            match doc_ident(node, base) {
                Some(ident) => ctx.discrepancies.record(Discrepancy::NodeType {
                    path: path.clone(),
                    ident,
                    requested: want.to_string(),
                    actual: current,
                }),
                None => worker.note_warning(format!(
                    "'{path}' should be a task but holds structure; left unchanged"
                )),
            }
            return Ok(());
        }
    }
    worker.set_template_id(path, want)
}

fn is_task_template(template: &str) -> bool {
    matches!(
        template,
        names::TASK_TEMPLATE | names::PSP_TASK_TEMPLATE | names::PROBE_TASK_TEMPLATE
    )
}

/// Stores the document's identities on the placed node and registers them
/// in the index so later claims resolve here.
fn record_identity(
    ctx: &mut SyncContext<'_>,
    worker: &mut dyn SyncWorker,
    path: &HierPath,
    node: &WbsNode,
) -> Result<(), SyncError> {
    if let Some(id) = &node.id {
        if worker.get_text(path, names::WBS_ID).as_deref() != Some(id) {
            worker.force_put_value(path, names::WBS_ID, DataValue::Text(id.clone()))?;
        }
        ctx.index.record_new(&NodeIdent::Official(id.clone()), path.clone());
        // Adoption upstream ends the node's locally-added life.
        if node.cid.is_none() && worker.get_value(path, names::CLIENT_ID).is_some() {
            worker.write_value(path, names::CLIENT_ID, None)?;
        }
        if worker.get_value(path, names::USER_CREATED).is_some() {
            worker.write_value(path, names::USER_CREATED, None)?;
        }
    }
    if let Some(cid) = &node.cid {
        if worker.get_text(path, names::CLIENT_ID).as_deref() != Some(cid) {
            worker.force_put_value(path, names::CLIENT_ID, DataValue::Text(cid.clone()))?;
        }
        ctx.index.record_new(&NodeIdent::Client(cid.clone()), path.clone());
    }
    if let Some(tid) = &node.tid {
        if worker.get_text(path, names::TASK_IDS).as_deref() != Some(tid) {
            worker.force_put_value(path, names::TASK_IDS, DataValue::Text(tid.clone()))?;
        }
    }
    match &node.url {
        Some(url) => {
            if worker.get_text(path, names::NODE_URL).as_deref() != Some(url) {
                worker.force_put_value(path, names::NODE_URL, DataValue::Text(url.clone()))?;
            }
        }
        None => {
            if worker.get_value(path, names::NODE_URL).is_some() {
                worker.write_value(path, names::NODE_URL, None)?;
            }
        }
    }
    Ok(())
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

    macro_rules! place_ctx {
        ($ctx:ident, $worker:expr) => {
            let options = SyncOptions::new(SyncRole::individual("aa", "alice"));
            let registry = SyncLockRegistry::new();
            let guard = registry.acquire("/Proj", LockClass::Interactive);
            let mut $ctx = SyncContext {
                options: &options,
                project_id: "PR",
                source_stamp: None,
                index: IdentityIndex::build(&$worker, &p("/Proj")),
                phases: PhaseResolver::classic(),
                removed: IndexMap::new(),
                discrepancies: DiscrepancyLog::default(),
                deletions: DeletionQueue::default(),
                psp_pending: Vec::new(),
                pacer: Pacer::new(Duration::ZERO, false),
                guard: &guard,
            };
        };
    }

    #[test]
    fn official_id_finds_the_node_across_a_rename() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/Old Name"), names::TASK_TEMPLATE).unwrap();
        store
            .put_data(&p("/Proj/Old Name"), names::WBS_ID, Some(DataEntry::text("17")))
            .unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        place_ctx!(ctx, worker);

        let node = WbsNode::new(NodeTag::Task, "New Name").with_id("17");
        let placed = place_node(
            &mut ctx,
            &mut worker,
            &p("/Proj"),
            &node,
            None,
            names::TASK_TEMPLATE,
        )
        .unwrap();

        assert!(!placed.created);
        assert_eq!(placed.path, p("/Proj/New Name"));
        assert!(!worker.exists(&p("/Proj/Old Name")));
        assert_eq!(
            ctx.index.resolve(&worker, &NodeIdent::Official("17".into())),
            Some(p("/Proj/New Name"))
        );
    }

    #[test]
    fn unrelated_occupant_moves_aside() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/Build"), "Scratch Pad").unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        place_ctx!(ctx, worker);

        let node = WbsNode::new(NodeTag::Task, "Build").with_id("17");
        let placed = place_node(
            &mut ctx,
            &mut worker,
            &p("/Proj"),
            &node,
            None,
            names::TASK_TEMPLATE,
        )
        .unwrap();

        assert!(placed.created);
        assert_eq!(worker.template_id(&p("/Proj/Build")).unwrap(), names::TASK_TEMPLATE);
        assert_eq!(
            worker.template_id(&p("/Proj/Build (non-WBS)")).unwrap(),
            "Scratch Pad"
        );
    }

    #[test]
    fn pseudo_identity_adopts_an_unidentified_node() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/T"), names::TASK_TEMPLATE).unwrap();
        store.put_data(&p("/Proj"), names::WBS_ID, Some(DataEntry::text("root"))).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        place_ctx!(ctx, worker);

        let node = WbsNode::new(NodeTag::Task, "T").with_id("42");
        let base = PseudoBase::anchored("root");
        let placed = place_node(
            &mut ctx,
            &mut worker,
            &p("/Proj"),
            &node,
            Some(&base),
            names::TASK_TEMPLATE,
        )
        .unwrap();

        assert!(!placed.created);
        assert_eq!(worker.get_text(&p("/Proj/T"), names::WBS_ID).unwrap(), "42");
        assert_eq!(worker.children(&p("/Proj")), vec!["T"]);
    }

    #[test]
    fn adoption_clears_the_locally_added_markers() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/Mine"), names::TASK_TEMPLATE).unwrap();
        store.put_data(&p("/Proj"), names::WBS_ID, Some(DataEntry::text("root"))).unwrap();
        store
            .put_data(&p("/Proj/Mine"), names::CLIENT_ID, Some(DataEntry::text("alice-d:1")))
            .unwrap();
        store
            .put_data(&p("/Proj/Mine"), names::USER_CREATED, Some(DataEntry::tag()))
            .unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        place_ctx!(ctx, worker);

        let node = WbsNode::new(NodeTag::Task, "Mine").with_id("51");
        place_node(&mut ctx, &mut worker, &p("/Proj"), &node, None, names::TASK_TEMPLATE)
            .unwrap();

        let path = p("/Proj/Mine");
        assert_eq!(worker.get_text(&path, names::WBS_ID).unwrap(), "51");
        assert_eq!(worker.get_value(&path, names::CLIENT_ID), None);
        assert_eq!(worker.get_value(&path, names::USER_CREATED), None);
    }

    #[test]
    fn client_id_is_how_adoption_finds_the_node() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/Mine"), names::TASK_TEMPLATE).unwrap();
        store
            .put_data(&p("/Proj/Mine"), names::CLIENT_ID, Some(DataEntry::text("alice-d:1")))
            .unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        place_ctx!(ctx, worker);

        // The document echoes the client ID back alongside the new
        // official ID it assigned.
        let node = WbsNode::new(NodeTag::Task, "Mine").with_id("51").with_client_id("alice-d:1");
        let placed = place_node(
            &mut ctx,
            &mut worker,
            &p("/Proj"),
            &node,
            None,
            names::TASK_TEMPLATE,
        )
        .unwrap();

        assert!(!placed.created);
        let path = p("/Proj/Mine");
        assert_eq!(worker.get_text(&path, names::WBS_ID).unwrap(), "51");
        assert_eq!(worker.get_text(&path, names::CLIENT_ID).unwrap(), "alice-d:1");
    }

    #[test]
    fn task_wish_keeps_a_local_process_template() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/T"), names::PSP_TASK_TEMPLATE).unwrap();
        store.put_data(&p("/Proj/T"), names::WBS_ID, Some(DataEntry::text("17"))).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        place_ctx!(ctx, worker);

        let node = WbsNode::new(NodeTag::Task, "T").with_id("17");
        place_node(&mut ctx, &mut worker, &p("/Proj"), &node, None, names::TASK_TEMPLATE)
            .unwrap();
        assert_eq!(worker.template_id(&p("/Proj/T")).unwrap(), names::PSP_TASK_TEMPLATE);
    }

    #[test]
    fn structure_with_children_yields_a_type_discrepancy() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/C"), names::COMPONENT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/C/Sub"), names::TASK_TEMPLATE).unwrap();
        store.put_data(&p("/Proj/C"), names::WBS_ID, Some(DataEntry::text("9"))).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        place_ctx!(ctx, worker);

        let node = WbsNode::new(NodeTag::Task, "C").with_id("9");
        place_node(&mut ctx, &mut worker, &p("/Proj"), &node, None, names::TASK_TEMPLATE)
            .unwrap();

        assert_eq!(worker.template_id(&p("/Proj/C")).unwrap(), names::COMPONENT_TEMPLATE);
        assert_eq!(ctx.discrepancies.items().len(), 1);
        assert!(matches!(
            &ctx.discrepancies.items()[0],
            Discrepancy::NodeType { requested, actual, .. }
                if requested == names::TASK_TEMPLATE && actual == names::COMPONENT_TEMPLATE
        ));
    }

    #[test]
    fn childless_structure_is_retyped_to_a_task() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/C"), names::COMPONENT_TEMPLATE).unwrap();
        store.put_data(&p("/Proj/C"), names::WBS_ID, Some(DataEntry::text("9"))).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        place_ctx!(ctx, worker);

        let node = WbsNode::new(NodeTag::Task, "C").with_id("9");
        place_node(&mut ctx, &mut worker, &p("/Proj"), &node, None, names::TASK_TEMPLATE)
            .unwrap();
        assert_eq!(worker.template_id(&p("/Proj/C")).unwrap(), names::TASK_TEMPLATE);
    }

    #[test]
    fn relaunch_source_id_finds_the_previous_cycle_node() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/Carry"), names::TASK_TEMPLATE).unwrap();
        store
            .put_data(&p("/Proj/Carry"), names::WBS_ID, Some(DataEntry::text("old-3")))
            .unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        place_ctx!(ctx, worker);

        let mut node = WbsNode::new(NodeTag::Task, "Carry").with_id("new-8");
        node.relaunch_source_id = Some("old-3".into());
        let placed = place_node(
            &mut ctx,
            &mut worker,
            &p("/Proj"),
            &node,
            None,
            names::TASK_TEMPLATE,
        )
        .unwrap();

        assert!(!placed.created);
        assert_eq!(worker.get_text(&p("/Proj/Carry"), names::WBS_ID).unwrap(), "new-8");
    }
}
