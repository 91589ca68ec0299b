//! Data element names and template IDs shared across the engine.

/// Official WBS node ID stored on a local node.
pub const WBS_ID: &str = "WBS_Unique_ID";
/// Locally minted client ID, removed once an official ID is adopted.
pub const CLIENT_ID: &str = "Client_Unique_ID";
/// Per-dataset counter backing client ID sequence numbers (project root).
pub const CLIENT_ID_COUNTER: &str = "Client_Unique_ID/Counter";
/// Cross-reference task IDs (`project:node`, comma-separated).
pub const TASK_IDS: &str = "EV_Task_IDs";
/// Official project ID (project root).
pub const PROJECT_ID: &str = "Project_ID";
/// Dataset identity used as the client-ID prefix (project root).
pub const DATASET_ID: &str = "Dataset_ID";

/// Planned minutes for the current plan owner.
pub const EST_TIME: &str = "Estimated Time";
/// Actual minutes logged against the node.
pub const ACT_TIME: &str = "Time";
/// Number of defects logged against the node.
pub const DEFECT_COUNT: &str = "Defect Count";
/// Completion date; presence means the node is complete.
pub const COMPLETED: &str = "Completed";
/// Planning-phase completion date; locks estimates on process tasks.
pub const PLANNING_COMPLETE: &str = "Planning/Completed";
/// Tag marking a node the user created by hand.
pub const USER_CREATED: &str = "User_Created";

/// Resolved process phase of a task.
pub const EFFECTIVE_PHASE: &str = "Effective_Phase";
/// ID of the workflow a task was generated from.
pub const WORKFLOW_ID: &str = "Workflow_Source_ID";
/// Comma-separated task labels.
pub const LABELS: &str = "Task_Labels";
/// Milestone the task is aimed at.
pub const MILESTONE: &str = "Task_Milestone";
/// Serialized cross-task dependency list.
pub const DEPENDENCIES: &str = "Task_Dependencies";
/// Shared team note text.
pub const NOTE: &str = "Team_Note";
/// Deep link into the document's authoring tool.
pub const NODE_URL: &str = "WBS_Node_URL";

/// Size units a sizing-wizard task works in.
pub const SIZE_UNITS: &str = "Size Units";
/// Planned size for a sizing-wizard task.
pub const EST_SIZE: &str = "Estimated Size";
/// Actual size for a sizing-wizard task.
pub const ACT_SIZE: &str = "Actual Size";
/// Progress of the size-estimating wizard (`pending`, `sized`, `complete`).
pub const WIZARD_STATE: &str = "Size_Wizard/State";

/// The plan owner's earned-value schedule (serialized).
pub const SCHEDULE: &str = "Project_Schedule";
/// Schedule as of the last sync, the merge baseline (serialized).
pub const SCHEDULE_SYNCED: &str = "Project_Schedule/Synced";
/// Serialized reverse-sync discrepancies (project root).
pub const DISCREPANCIES: &str = "Discrepancy_List";
/// When this project last completed a sync pass (project root).
pub const LAST_SYNC: &str = "Last_Sync_Timestamp";
/// Newest document bundle whose history has been applied (project root).
pub const LAST_BUNDLE: &str = "Last_Synced_Bundle";
/// Serialized baseline snapshots carrying task IDs (project root).
pub const BASELINES: &str = "Baseline_Snapshots";

/// Template of a team project root node.
pub const TEAM_ROOT_TEMPLATE: &str = "Team Project Root";
/// Template of a personal project root node.
pub const PERSONAL_ROOT_TEMPLATE: &str = "Personal Project Root";
/// Template of a structural component.
pub const COMPONENT_TEMPLATE: &str = "Component";
/// Template of a read-only document reference.
pub const READONLY_DOC_TEMPLATE: &str = "Read Only Document";
/// Template of an ordinary task.
pub const TASK_TEMPLATE: &str = "Task";
/// Template of a legacy process task with literal phase children.
pub const PSP_TASK_TEMPLATE: &str = "PSP Task";
/// Template of a literal phase child under a legacy process task.
pub const PHASE_TEMPLATE: &str = "Phase";
/// Template of a sizing-wizard task.
pub const PROBE_TASK_TEMPLATE: &str = "PROBE Task";

/// True for templates this engine owns. Children with other templates are
/// the user's own nodes and are never deleted or retyped by a sync pass.
#[must_use]
pub fn is_wbs_template(template_id: &str) -> bool {
    matches!(
        template_id,
        TEAM_ROOT_TEMPLATE
            | PERSONAL_ROOT_TEMPLATE
            | COMPONENT_TEMPLATE
            | READONLY_DOC_TEMPLATE
            | TASK_TEMPLATE
            | PSP_TASK_TEMPLATE
            | PHASE_TEMPLATE
            | PROBE_TASK_TEMPLATE
    )
}

/// The companion element holding the last value adopted from the document.
#[must_use]
pub fn last_synced(name: &str) -> String {
    format!("{name}/Last_Synced")
}

/// The companion element stamped when a local edit beats the document.
#[must_use]
pub fn source_stamp(name: &str) -> String {
    format!("{name}/Source_Stamp")
}

/// Planned-size element for one unit of measure.
#[must_use]
pub fn size_plan(units: &str) -> String {
    format!("Sized Objects/{units}/Plan")
}

/// Actual-size element for one unit of measure.
#[must_use]
pub fn size_actual(units: &str) -> String {
    format!("Sized Objects/{units}/Actual")
}
