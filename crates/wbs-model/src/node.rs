//! Nodes of the WBS document tree.
//!
//! Each node carries a type tag, a display name, optional identity and
//! planning attributes, and an ordered list of children. Attributes that a
//! given node type does not use are simply absent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ident::parse_task_ids;
use crate::time::TimeAssignments;

/// The type tag of a document node.
///
/// Tags arrive as plain strings on the wire; unrecognized tags are preserved
/// in [`NodeTag::Other`] so callers can report them instead of failing the
/// whole parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeTag {
    /// The project root element.
    Project,
    /// A structural component grouping tasks and other components.
    Component,
    /// A read-only document reference.
    Document,
    /// An ordinary task, optionally carrying a process phase.
    Task,
    /// A legacy process task that expands into literal phase children.
    PspTask,
    /// A task whose size estimate is produced by the sizing wizard.
    ProbeTask,
    /// A process definition; its task children name the canonical phases.
    Workflow,
    /// A team member row carrying initials and schedule attributes.
    TeamMember,
    /// Any tag this engine does not recognize.
    Other(String),
}

impl NodeTag {
    /// The wire spelling of this tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Project => "project",
            Self::Component => "component",
            Self::Document => "document",
            Self::Task => "task",
            Self::PspTask => "pspTask",
            Self::ProbeTask => "probeTask",
            Self::Workflow => "workflow",
            Self::TeamMember => "teamMember",
            Self::Other(raw) => raw,
        }
    }

    /// True for the three task-shaped tags.
    #[must_use]
    pub fn is_task_like(&self) -> bool {
        matches!(self, Self::Task | Self::PspTask | Self::ProbeTask)
    }

    /// True for tags that describe plan structure rather than sidecar
    /// information such as workflows or the team list.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Project | Self::Component | Self::Document | Self::Task | Self::PspTask | Self::ProbeTask
        )
    }
}

impl From<String> for NodeTag {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "project" => Self::Project,
            "component" => Self::Component,
            "document" => Self::Document,
            "task" => Self::Task,
            "pspTask" => Self::PspTask,
            "probeTask" => Self::ProbeTask,
            "workflow" => Self::Workflow,
            "teamMember" => Self::TeamMember,
            _ => Self::Other(raw),
        }
    }
}

impl From<NodeTag> for String {
    fn from(tag: NodeTag) -> Self {
        tag.as_str().to_string()
    }
}

impl std::fmt::Display for NodeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A free-text note attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeNote {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A dependency of one task on another, referenced by task ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    #[serde(rename = "taskID")]
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Planned and actual size in one unit of measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeRecord {
    pub units: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// One team-member schedule row: planned hours effective from a given week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleException {
    pub week: NaiveDate,
    pub hours: f64,
}

/// One element of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WbsNode {
    pub tag: NodeTag,
    pub name: String,

    /// Official node ID assigned by the document's authoring tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Client-generated ID echoed back by the document for nodes that were
    /// created locally and have not yet received an official ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    /// Comma-separated cross-reference task IDs (`project:node`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,
    /// Per-person planned time, in the `owner=minutes` list format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(rename = "phaseName", default, skip_serializing_if = "Option::is_none")]
    pub phase_name: Option<String>,
    #[serde(rename = "effectivePhase", default, skip_serializing_if = "Option::is_none")]
    pub effective_phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Author marked this subtree as not relevant to any personal plan.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pruned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
    #[serde(rename = "workflowID", default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// For projects relaunched from a prior project: the prior node this one
    /// continues.
    #[serde(rename = "relaunchSourceID", default, skip_serializing_if = "Option::is_none")]
    pub relaunch_source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<NodeNote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<TaskDependency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sizes: Vec<SizeRecord>,

    // Team-member scheduling attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initials: Option<String>,
    #[serde(rename = "startDate", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "hoursPerWeek", default, skip_serializing_if = "Option::is_none")]
    pub hours_per_week: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schedule: Vec<ScheduleException>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<WbsNode>,

    /// Set by the pruning pass when a node survives only for the sake of
    /// local history (its own or a descendant's) rather than live assigned
    /// work. Never serialized.
    #[serde(skip)]
    pub quasi_pruned: bool,
}

impl WbsNode {
    /// Creates a node with the given tag and name and no attributes.
    #[must_use]
    pub fn new(tag: NodeTag, name: impl Into<String>) -> Self {
        Self {
            tag,
            name: name.into(),
            id: None,
            cid: None,
            tid: None,
            time: None,
            phase_name: None,
            effective_phase: None,
            url: None,
            pruned: false,
            labels: None,
            milestone: None,
            workflow_id: None,
            relaunch_source_id: None,
            note: None,
            dependencies: Vec::new(),
            sizes: Vec::new(),
            initials: None,
            start_date: None,
            hours_per_week: None,
            schedule: Vec::new(),
            children: Vec::new(),
            quasi_pruned: false,
        }
    }

    /// Sets the official node ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the echoed client ID.
    #[must_use]
    pub fn with_client_id(mut self, cid: impl Into<String>) -> Self {
        self.cid = Some(cid.into());
        self
    }

    /// Sets the cross-reference task-ID list.
    #[must_use]
    pub fn with_task_ids(mut self, tid: impl Into<String>) -> Self {
        self.tid = Some(tid.into());
        self
    }

    /// Sets the raw per-person time attribute.
    #[must_use]
    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// Sets the process phase name.
    #[must_use]
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase_name = Some(phase.into());
        self
    }

    /// Sets the effective phase override.
    #[must_use]
    pub fn with_effective_phase(mut self, phase: impl Into<String>) -> Self {
        self.effective_phase = Some(phase.into());
        self
    }

    /// Marks the subtree as author-pruned.
    #[must_use]
    pub fn with_pruned(mut self) -> Self {
        self.pruned = true;
        self
    }

    /// Appends one child node.
    #[must_use]
    pub fn with_child(mut self, child: WbsNode) -> Self {
        self.children.push(child);
        self
    }

    /// Replaces the child list.
    #[must_use]
    pub fn with_children(mut self, children: Vec<WbsNode>) -> Self {
        self.children = children;
        self
    }

    /// True when the node has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The parsed time assignments for this node's own `time` attribute.
    #[must_use]
    pub fn assignments(&self) -> TimeAssignments {
        self.time
            .as_deref()
            .map_or_else(TimeAssignments::default, TimeAssignments::parse)
    }

    /// The parsed cross-reference task IDs for this node.
    #[must_use]
    pub fn task_ids(&self) -> Vec<String> {
        self.tid.as_deref().map_or_else(Vec::new, parse_task_ids)
    }

    /// Finds a direct child by name.
    #[must_use]
    pub fn find_child(&self, name: &str) -> Option<&WbsNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Total planned minutes assigned to anyone across this subtree.
    #[must_use]
    pub fn subtree_time(&self) -> f64 {
        let mut total = 0.0;
        self.walk(&mut |node| total += node.assignments().total());
        total
    }

    /// Visits this node and every descendant, parents first.
    pub fn walk(&self, visit: &mut impl FnMut(&WbsNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}
