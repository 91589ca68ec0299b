//! Process-task behavior through the full pipeline: phase scaffolding
//! from the project workflow, the first-appearance prompt, workflow
//! reshapes over worked phases, and the sizing wizard's own numbers.

use pretty_assertions::assert_eq;
use wbs_hier::{DataEntry, HierarchyStore, MemHierarchy};
use wbs_model::{SizeRecord, WbsDocument};
use wbs_sync::{names, SyncOptions};
use wbs_test_utils::{
    component, doc_around, individual_options, path, personal_plan, probe_task, project, psp_task,
    sync_once, workflow,
};

fn opts() -> SyncOptions {
    individual_options("aa", "alice")
}

/// One process task plus the workflow its phases come from.
fn psp_doc(phases: &[&str]) -> WbsDocument {
    doc_around(
        project("Rollout")
            .with_child(workflow("Dev Flow", phases))
            .with_child(component("Server", "1").with_child(psp_task("Module A", "9", "aa=240"))),
    )
}

/// One sizing-wizard task with a single size record.
fn probe_doc(plan: Option<f64>, actual: Option<f64>) -> WbsDocument {
    let mut sizer = probe_task("Size Me", "4", "aa=90");
    sizer.sizes = vec![SizeRecord { units: "LOC".to_string(), plan, actual, timestamp: None }];
    doc_around(project("Rollout").with_child(component("Server", "1").with_child(sizer)))
}

fn text_at(store: &MemHierarchy, at: &str, name: &str) -> Option<String> {
    store.get_data(&path(at), name).and_then(|e| e.value.as_text().map(str::to_string))
}

fn assert_number(store: &MemHierarchy, at: &str, name: &str, want: f64) {
    let got = store.get_data(&path(at), name).and_then(|e| e.value.as_number());
    assert!(
        got.is_some_and(|n| (n - want).abs() < f64::EPSILON),
        "{at} '{name}' is {got:?}, wanted {want}"
    );
}

#[test]
fn a_new_process_task_is_scaffolded_and_prompted() {
    let mut store = personal_plan();
    let report = sync_once(&psp_doc(&["Design", "Code", "Test"]), &mut store, opts());

    let module = path("/Plan/Server/Module A");
    assert_eq!(store.template_id(&module).unwrap(), names::PSP_TASK_TEMPLATE);
    assert_eq!(store.children(&module), vec!["Design", "Code", "Test"]);
    assert_eq!(
        store.template_id(&module.child("Design")).unwrap(),
        names::PHASE_TEMPLATE
    );
    assert_eq!(report.psp_tasks_pending, vec![module.clone()]);
    assert_number(&store, "/Plan/Server/Module A", names::EST_TIME, 240.0);

    // An already-configured task is not prompted again.
    let rerun = sync_once(&psp_doc(&["Design", "Code", "Test"]), &mut store, opts());
    assert!(rerun.psp_tasks_pending.is_empty());
    assert!(rerun.is_noop());
}

#[test]
fn a_workflow_change_reshapes_existing_phase_children() {
    let mut store = personal_plan();
    sync_once(&psp_doc(&["Design", "Code", "Test"]), &mut store, opts());
    store
        .put_data(
            &path("/Plan/Server/Module A/Test"),
            names::ACT_TIME,
            Some(DataEntry::number(25.0)),
        )
        .unwrap();

    // The project swapped its workflow: Code and Test are gone, Implement
    // is new, and the member already logged time against Test.
    let report = sync_once(&psp_doc(&["Design", "Implement"]), &mut store, opts());

    let module = path("/Plan/Server/Module A");
    assert_eq!(store.children(&module), vec!["Design", "Implement", "Test"]);
    assert_eq!(report.nodes_deleted, vec![module.child("Code")]);
    assert_eq!(report.nodes_completed, vec![module.child("Test")]);
    assert!(store.get_data(&module.child("Test"), names::COMPLETED).is_some());
    assert!(report.psp_tasks_pending.is_empty());
}

#[test]
fn the_sizing_wizard_keeps_its_own_numbers() {
    let mut store = personal_plan();
    sync_once(&probe_doc(Some(500.0), None), &mut store, opts());

    let sizer = "/Plan/Server/Size Me";
    assert_eq!(text_at(&store, sizer, names::WIZARD_STATE), Some("pending".to_string()));
    assert_eq!(text_at(&store, sizer, names::SIZE_UNITS), Some("LOC".to_string()));
    assert_number(&store, sizer, names::EST_SIZE, 500.0);

    // The wizard ran locally and produced its own estimate.
    store
        .put_data(&path(sizer), names::WIZARD_STATE, Some(DataEntry::text("sized")))
        .unwrap();
    store.put_data(&path(sizer), names::EST_SIZE, Some(DataEntry::number(800.0))).unwrap();

    // The document re-plans the size and reports measured actuals.
    sync_once(&probe_doc(Some(550.0), Some(430.0)), &mut store, opts());

    assert_number(&store, sizer, names::EST_SIZE, 800.0);
    assert_number(&store, sizer, names::ACT_SIZE, 430.0);
    assert_eq!(text_at(&store, sizer, names::WIZARD_STATE), Some("sized".to_string()));
}
