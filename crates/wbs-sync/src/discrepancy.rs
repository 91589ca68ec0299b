//! Reverse-sync discrepancy recording.
//!
//! Whenever a three-way merge keeps a local value over the document's, the
//! document is now behind. Each such outcome is recorded as a discrepancy:
//! the local path, the node's resolved WBS identity, and the payload the
//! authoring tool needs to patch itself. The list is serialized onto the
//! project root at the end of every pass, where the reverse-sync exporter
//! picks it up and overwrites it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wbs_hier::{DataValue, HierPath};
use wbs_model::{NodeIdent, ScheduleException};

use crate::error::SyncError;
use crate::names;
use crate::worker::SyncWorker;

/// Which size metric a [`Discrepancy::SizeData`] patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMetric {
    Plan,
    Actual,
}

/// One local-state-diverges-from-document event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Discrepancy {
    /// A locally edited plan time won over the document's estimate.
    PlanTime {
        path: HierPath,
        ident: NodeIdent,
        minutes: f64,
        edited: Option<DateTime<Utc>>,
    },
    /// A locally edited size metric won over the document's.
    SizeData {
        path: HierPath,
        ident: NodeIdent,
        units: String,
        metric: SizeMetric,
        value: f64,
        edited: Option<DateTime<Utc>>,
    },
    /// The local node type disagrees with what the document requested.
    NodeType {
        path: HierPath,
        ident: NodeIdent,
        requested: String,
        actual: String,
    },
    /// A local freeform note should flow upstream.
    ItemNote {
        path: HierPath,
        ident: NodeIdent,
        text: String,
        author: Option<String>,
        edited: Option<DateTime<Utc>>,
    },
    /// User-introduced schedule exceptions to re-apply upstream.
    EvSchedule {
        path: HierPath,
        ident: NodeIdent,
        exceptions: Vec<ScheduleException>,
    },
}

/// The discrepancies one pass produced.
#[derive(Debug, Default)]
pub struct DiscrepancyLog {
    items: Vec<Discrepancy>,
}

impl DiscrepancyLog {
    /// Appends one discrepancy.
    pub fn record(&mut self, discrepancy: Discrepancy) {
        self.items.push(discrepancy);
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn items(&self) -> &[Discrepancy] {
        &self.items
    }

    /// Consumes the log, yielding its items.
    #[must_use]
    pub fn into_items(self) -> Vec<Discrepancy> {
        self.items
    }

    /// True when nothing diverged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Serializes the list onto the project root, replacing whatever the
    /// previous pass left there. Runs in what-if mode too, against the
    /// overlay, so dry runs predict the same export.
    pub fn export(
        &self,
        worker: &mut dyn SyncWorker,
        project: &HierPath,
    ) -> Result<(), SyncError> {
        let json = serde_json::to_string(&self.items)?;
        worker.force_put_value(project, names::DISCREPANCIES, DataValue::Text(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::LiveSyncWorker;
    use pretty_assertions::assert_eq;
    use wbs_hier::{HierarchyStore, MemHierarchy};

    fn p(s: &str) -> HierPath {
        s.parse().unwrap()
    }

    #[test]
    fn export_writes_the_serialized_list_to_the_root() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();

        let mut log = DiscrepancyLog::default();
        log.record(Discrepancy::PlanTime {
            path: p("/Proj/T"),
            ident: NodeIdent::Official("17".into()),
            minutes: 90.0,
            edited: None,
        });

        let mut worker = LiveSyncWorker::new(&mut store);
        log.export(&mut worker, &p("/Proj")).unwrap();
        assert!(!worker.has_changes());

        let raw = store
            .get_data(&p("/Proj"), names::DISCREPANCIES)
            .and_then(|e| e.value.as_text().map(str::to_string))
            .unwrap();
        let parsed: Vec<Discrepancy> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, log.items());
    }

    #[test]
    fn wire_form_tags_the_kind() {
        let d = Discrepancy::NodeType {
            path: p("/Proj/T"),
            ident: NodeIdent::Pseudo("9:T".into()),
            requested: "phaseTask".into(),
            actual: "task".into(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "NodeType");
        assert_eq!(json["path"], "/Proj/T");
    }

    #[test]
    fn export_clears_a_stale_list() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);

        let mut log = DiscrepancyLog::default();
        log.record(Discrepancy::ItemNote {
            path: p("/Proj/T"),
            ident: NodeIdent::Client("a-b:1".into()),
            text: "left over".into(),
            author: None,
            edited: None,
        });
        log.export(&mut worker, &p("/Proj")).unwrap();

        DiscrepancyLog::default().export(&mut worker, &p("/Proj")).unwrap();
        let raw = worker.get_text(&p("/Proj"), names::DISCREPANCIES).unwrap();
        assert_eq!(raw, "[]");
    }
}
