//! Testing utilities for the WBS sync workspace
//!
//! Shared fixtures: document trees, plan snapshots, and sync pairings.

#![allow(missing_docs)]

use chrono::{NaiveDate, TimeZone, Utc};
use wbs_hier::{HierPath, HierarchyStore, MemHierarchy};
use wbs_model::{BytesSource, DocumentSource, NodeTag, WbsDocument, WbsNode};
use wbs_sync::{names, SyncOptions, SyncReport, SyncRole, WbsSynchronizer};

/// Project ID every fixture document carries.
pub const PROJECT_ID: &str = "TPROJ";

/// Local path every fixture plan lives at.
pub const PLAN: &str = "/Plan";

pub fn path(s: &str) -> HierPath {
    s.parse().unwrap()
}

pub fn plan_path() -> HierPath {
    path(PLAN)
}

pub fn doc_around(root: WbsNode) -> WbsDocument {
    WbsDocument {
        format_version: 1,
        project_id: PROJECT_ID.to_string(),
        exported: Some(Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap()),
        root,
        history: Vec::new(),
    }
}

pub fn project(name: &str) -> WbsNode {
    WbsNode::new(NodeTag::Project, name)
        .with_id("root")
        .with_task_ids(format!("{PROJECT_ID}:root"))
}

pub fn component(name: &str, id: &str) -> WbsNode {
    WbsNode::new(NodeTag::Component, name).with_id(id)
}

pub fn task(name: &str, id: &str, time: &str) -> WbsNode {
    WbsNode::new(NodeTag::Task, name)
        .with_id(id)
        .with_task_ids(format!("{PROJECT_ID}:{id}"))
        .with_time(time)
}

pub fn psp_task(name: &str, id: &str, time: &str) -> WbsNode {
    let mut node = task(name, id, time);
    node.tag = NodeTag::PspTask;
    node
}

pub fn probe_task(name: &str, id: &str, time: &str) -> WbsNode {
    let mut node = task(name, id, time);
    node.tag = NodeTag::ProbeTask;
    node
}

pub fn workflow(name: &str, phases: &[&str]) -> WbsNode {
    WbsNode::new(NodeTag::Workflow, name)
        .with_children(phases.iter().map(|p| WbsNode::new(NodeTag::Task, *p)).collect())
}

pub fn team_member(name: &str, initials: &str, start: NaiveDate, hours: f64) -> WbsNode {
    let mut node = WbsNode::new(NodeTag::TeamMember, name);
    node.initials = Some(initials.to_string());
    node.start_date = Some(start);
    node.hours_per_week = Some(hours);
    node
}

pub fn source_for(doc: &WbsDocument) -> Box<dyn DocumentSource> {
    Box::new(BytesSource::new("test document", doc.to_bytes().unwrap()))
}

pub fn personal_plan() -> MemHierarchy {
    let mut store = MemHierarchy::new();
    store.add_node(&plan_path(), names::PERSONAL_ROOT_TEMPLATE).unwrap();
    store
}

pub fn team_plan() -> MemHierarchy {
    let mut store = MemHierarchy::new();
    store.add_node(&plan_path(), names::TEAM_ROOT_TEMPLATE).unwrap();
    store
}

pub fn individual_options(initials: &str, owner: &str) -> SyncOptions {
    SyncOptions::new(SyncRole::individual(initials, owner))
}

pub fn team_options() -> SyncOptions {
    SyncOptions::new(SyncRole::Team)
}

/// Runs one pass of `doc` against the fixture plan path.
pub fn sync_once(doc: &WbsDocument, store: &mut MemHierarchy, options: SyncOptions) -> SyncReport {
    WbsSynchronizer::new(plan_path(), source_for(doc), options).sync(store).unwrap()
}
