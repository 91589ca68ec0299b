//! Replay of document fork/merge history against local references.
//!
//! When two forks of the document are merged, the authoring tool may
//! renumber node IDs and records the old-to-new map in the bundle
//! lineage. Local state embeds those IDs in several places: task
//! cross-reference lists, dependency records, and baseline snapshots.
//! Before a pass matches anything by ID, the unseen part of the lineage
//! is replayed so every embedded reference speaks the document's current
//! ID language. A persisted marker names the last bundle applied, which
//! makes the replay a no-op when nothing new has happened.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wbs_hier::{DataValue, HierPath};
use wbs_model::{join_task_ids, parse_task_ids, TaskDependency, WbsDocument};

use crate::error::SyncError;
use crate::names;
use crate::worker::SyncWorker;

/// One recorded plan baseline: a label and the task IDs frozen under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BaselineSnapshot {
    pub label: String,
    #[serde(rename = "taskIDs")]
    pub task_ids: Vec<String>,
}

/// Applies every merge renumbering the plan has not seen yet, then
/// advances the persisted bundle marker to the lineage head.
///
/// A plan with no marker has never synced against this lineage and holds
/// no stale references, so only the marker is written. A marker missing
/// from the lineage means the document only carries a window of its
/// history and the marker fell off the old end; the whole window applies.
pub(crate) fn apply_history(
    worker: &mut dyn SyncWorker,
    project: &HierPath,
    doc: &WbsDocument,
) -> Result<(), SyncError> {
    let Some(head) = doc.head_bundle() else {
        return Ok(());
    };
    let marker = worker.get_text(project, names::LAST_BUNDLE);
    if marker.as_deref() == Some(head) {
        return Ok(());
    }
    let start = match &marker {
        None => doc.history.len(),
        Some(seen) => doc.history.iter().position(|rev| rev.bundle == *seen).map_or(0, |at| at + 1),
    };
    for revision in &doc.history[start..] {
        let Some(merge) = &revision.merge else { continue };
        if merge.id_map.is_empty() {
            continue;
        }
        tracing::info!("Applying ID renumbering from merged bundle '{}'", revision.bundle);
        apply_id_map(worker, project, &doc.project_id, &merge.id_map)?;
    }
    worker.force_put_value(project, names::LAST_BUNDLE, DataValue::Text(head.to_string()))?;
    Ok(())
}

fn apply_id_map(
    worker: &mut dyn SyncWorker,
    project: &HierPath,
    project_id: &str,
    map: &BTreeMap<String, String>,
) -> Result<(), SyncError> {
    let mut pending = vec![project.clone()];
    while let Some(path) = pending.pop() {
        if let Some(raw) = worker.get_text(&path, names::TASK_IDS) {
            let ids: Vec<String> = parse_task_ids(&raw)
                .into_iter()
                .map(|id| rewrite_task_id(&id, project_id, map).unwrap_or(id))
                .collect();
            let rewritten = join_task_ids(&ids);
            if rewritten != raw {
                worker.force_put_value(&path, names::TASK_IDS, DataValue::Text(rewritten))?;
            }
        }
        if let Some(raw) = worker.get_text(&path, names::DEPENDENCIES) {
            if let Some(rewritten) = rewrite_dependencies(&path, &raw, project_id, map) {
                worker.force_put_value(&path, names::DEPENDENCIES, DataValue::Text(rewritten))?;
            }
        }
        pending.extend(worker.children(&path).into_iter().map(|name| path.child(name)));
    }
    if let Some(raw) = worker.get_text(project, names::BASELINES) {
        if let Some(rewritten) = rewrite_baselines(project, &raw, project_id, map) {
            worker.force_put_value(project, names::BASELINES, DataValue::Text(rewritten))?;
        }
    }
    Ok(())
}

/// The renumbered form of one task ID, or `None` when the map does not
/// touch it. IDs carrying a different project prefix belong to another
/// project and are never rewritten.
fn rewrite_task_id(id: &str, project_id: &str, map: &BTreeMap<String, String>) -> Option<String> {
    match id.split_once(':') {
        Some((prefix, node)) if prefix == project_id => {
            map.get(node).map(|new_id| format!("{prefix}:{new_id}"))
        }
        Some(_) => None,
        None => map.get(id).cloned(),
    }
}

fn rewrite_dependencies(
    path: &HierPath,
    raw: &str,
    project_id: &str,
    map: &BTreeMap<String, String>,
) -> Option<String> {
    let Ok(mut deps) = serde_json::from_str::<Vec<TaskDependency>>(raw) else {
        tracing::warn!("Unreadable dependency list at '{}', not renumbering it", path);
        return None;
    };
    let mut changed = false;
    for dep in &mut deps {
        if let Some(new_id) = rewrite_task_id(&dep.task_id, project_id, map) {
            dep.task_id = new_id;
            changed = true;
        }
    }
    if !changed {
        return None;
    }
    serde_json::to_string(&deps).ok()
}

fn rewrite_baselines(
    project: &HierPath,
    raw: &str,
    project_id: &str,
    map: &BTreeMap<String, String>,
) -> Option<String> {
    let Ok(mut snapshots) = serde_json::from_str::<Vec<BaselineSnapshot>>(raw) else {
        tracing::warn!("Unreadable baseline snapshots at '{}', not renumbering them", project);
        return None;
    };
    let mut changed = false;
    for snapshot in &mut snapshots {
        for id in &mut snapshot.task_ids {
            if let Some(new_id) = rewrite_task_id(id, project_id, map) {
                *id = new_id;
                changed = true;
            }
        }
    }
    if !changed {
        return None;
    }
    serde_json::to_string(&snapshots).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::LiveSyncWorker;
    use pretty_assertions::assert_eq;
    use wbs_hier::{DataEntry, HierarchyStore, MemHierarchy};
    use wbs_model::{BundleRevision, NodeTag, WbsNode};

    fn p(s: &str) -> HierPath {
        s.parse().unwrap()
    }

    fn doc_with_history(history: Vec<BundleRevision>) -> WbsDocument {
        WbsDocument {
            format_version: 1,
            project_id: "PR".to_string(),
            exported: None,
            root: WbsNode::new(NodeTag::Project, "Proj").with_id("root"),
            history,
        }
    }

    fn id_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(old, new)| ((*old).to_string(), (*new).to_string())).collect()
    }

    fn store_with_refs() -> MemHierarchy {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        store.add_node(&p("/Proj/T"), names::TASK_TEMPLATE).unwrap();
        store
            .put_data(&p("/Proj/T"), names::TASK_IDS, Some(DataEntry::text("PR:17,PR:3,OTHER:17")))
            .unwrap();
        store
    }

    #[test]
    fn merge_steps_renumber_task_references() {
        let mut store = store_with_refs();
        store.put_data(&p("/Proj"), names::LAST_BUNDLE, Some(DataEntry::text("b1"))).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        let doc = doc_with_history(vec![
            BundleRevision::plain("b1"),
            BundleRevision::merged("b2", id_map(&[("17", "42")])),
        ]);

        apply_history(&mut worker, &p("/Proj"), &doc).unwrap();
        assert_eq!(
            worker.get_text(&p("/Proj/T"), names::TASK_IDS),
            Some("PR:42,PR:3,OTHER:17".to_string())
        );
        assert_eq!(worker.get_text(&p("/Proj"), names::LAST_BUNDLE), Some("b2".to_string()));
        // Bookkeeping only, nothing user-visible.
        assert!(!worker.has_changes());
    }

    #[test]
    fn replay_stops_at_the_marker_and_reruns_are_no_ops() {
        let mut store = store_with_refs();
        store.put_data(&p("/Proj"), names::LAST_BUNDLE, Some(DataEntry::text("b1"))).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        // b2 would swap 42 back if it ever re-applied.
        let doc = doc_with_history(vec![
            BundleRevision::plain("b1"),
            BundleRevision::merged("b2", id_map(&[("17", "42"), ("42", "17")])),
        ]);

        apply_history(&mut worker, &p("/Proj"), &doc).unwrap();
        let after_first = worker.get_text(&p("/Proj/T"), names::TASK_IDS);
        apply_history(&mut worker, &p("/Proj"), &doc).unwrap();
        assert_eq!(worker.get_text(&p("/Proj/T"), names::TASK_IDS), after_first);
    }

    #[test]
    fn first_sync_only_records_the_head() {
        let mut store = store_with_refs();
        let mut worker = LiveSyncWorker::new(&mut store);
        let doc = doc_with_history(vec![BundleRevision::merged("b1", id_map(&[("17", "42")]))]);

        apply_history(&mut worker, &p("/Proj"), &doc).unwrap();
        assert_eq!(
            worker.get_text(&p("/Proj/T"), names::TASK_IDS),
            Some("PR:17,PR:3,OTHER:17".to_string())
        );
        assert_eq!(worker.get_text(&p("/Proj"), names::LAST_BUNDLE), Some("b1".to_string()));
    }

    #[test]
    fn a_marker_outside_the_window_applies_every_step() {
        let mut store = store_with_refs();
        store.put_data(&p("/Proj"), names::LAST_BUNDLE, Some(DataEntry::text("ancient"))).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        let doc = doc_with_history(vec![
            BundleRevision::merged("b1", id_map(&[("17", "42")])),
            BundleRevision::merged("b2", id_map(&[("42", "99")])),
        ]);

        apply_history(&mut worker, &p("/Proj"), &doc).unwrap();
        assert_eq!(
            worker.get_text(&p("/Proj/T"), names::TASK_IDS),
            Some("PR:99,PR:3,OTHER:17".to_string())
        );
    }

    #[test]
    fn dependencies_and_baselines_are_renumbered_too() {
        let mut store = store_with_refs();
        let deps = serde_json::json!([{ "taskID": "PR:17", "name": "Design" }]).to_string();
        store.put_data(&p("/Proj/T"), names::DEPENDENCIES, Some(DataEntry::text(deps))).unwrap();
        let baselines =
            serde_json::json!([{ "label": "launch", "taskIDs": ["PR:17", "OTHER:17"] }]).to_string();
        store.put_data(&p("/Proj"), names::BASELINES, Some(DataEntry::text(baselines))).unwrap();
        store.put_data(&p("/Proj"), names::LAST_BUNDLE, Some(DataEntry::text("b0"))).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        let doc = doc_with_history(vec![
            BundleRevision::plain("b0"),
            BundleRevision::merged("b1", id_map(&[("17", "42")])),
        ]);

        apply_history(&mut worker, &p("/Proj"), &doc).unwrap();
        let deps: Vec<TaskDependency> =
            serde_json::from_str(&worker.get_text(&p("/Proj/T"), names::DEPENDENCIES).unwrap())
                .unwrap();
        assert_eq!(deps[0].task_id, "PR:42");
        let snapshots: Vec<BaselineSnapshot> =
            serde_json::from_str(&worker.get_text(&p("/Proj"), names::BASELINES).unwrap()).unwrap();
        assert_eq!(snapshots[0].task_ids, vec!["PR:42", "OTHER:17"]);
    }

    #[test]
    fn plain_revisions_change_nothing_but_the_marker() {
        let mut store = store_with_refs();
        store.put_data(&p("/Proj"), names::LAST_BUNDLE, Some(DataEntry::text("b1"))).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        let doc =
            doc_with_history(vec![BundleRevision::plain("b1"), BundleRevision::plain("b2")]);

        apply_history(&mut worker, &p("/Proj"), &doc).unwrap();
        assert_eq!(
            worker.get_text(&p("/Proj/T"), names::TASK_IDS),
            Some("PR:17,PR:3,OTHER:17".to_string())
        );
        assert_eq!(worker.get_text(&p("/Proj"), names::LAST_BUNDLE), Some("b2".to_string()));
    }
}
