//! The plan owner's weekly schedule and its three-way merge.
//!
//! A schedule is a default weekly commitment from a start week plus
//! per-week exception rows. The document carries one per team member;
//! the local plan keeps its own copy (which the owner may have edited)
//! and the copy adopted at the last sync. A pass merges the three so
//! document changes land without discarding the owner's edits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use wbs_hier::{DataValue, HierPath};
use wbs_model::{NodeIdent, ScheduleException, WbsNode};

use crate::discrepancy::{Discrepancy, DiscrepancyLog};
use crate::error::SyncError;
use crate::names;
use crate::worker::SyncWorker;

/// One per-week override of the default commitment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// Calendar week the override applies to.
    pub week: NaiveDate,
    /// Planned hours for that week.
    pub hours: f64,
    /// True when the row came from the document rather than a local edit.
    pub automatic: bool,
}

/// A time-phased weekly commitment, stored serialized on the project root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// First planned week.
    pub start: NaiveDate,
    /// Hours per week wherever no exception row applies.
    pub default_hours: f64,
    /// True once sync owns the calendar; unlocked schedules with user rows
    /// are considered hand-tended and left alone.
    pub dates_locked: bool,
    /// Exception rows, sorted by week.
    #[serde(default)]
    pub rows: Vec<ScheduleRow>,
}

/// The result of merging the owner's schedule with a fresh document one.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The schedule the plan should carry from now on.
    pub merged: Schedule,
    /// User-set rows that survived the merge; the document does not know
    /// about these yet.
    pub exceptions: Vec<ScheduleException>,
}

fn same_hours(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

impl Schedule {
    /// A fresh unlocked schedule with no exception rows.
    #[must_use]
    pub fn seed(start: NaiveDate, default_hours: f64) -> Self {
        Self { start, default_hours, dates_locked: false, rows: Vec::new() }
    }

    /// The schedule a document team-member row describes, or `None` when
    /// the row carries no start date. Every row it produces is automatic.
    #[must_use]
    pub fn from_member(member: &WbsNode) -> Option<Self> {
        let start = member.start_date?;
        let mut schedule = Self {
            start,
            default_hours: member.hours_per_week.unwrap_or(0.0),
            dates_locked: true,
            rows: Vec::new(),
        };
        for exception in &member.schedule {
            schedule.set_exception(exception.week, exception.hours, true);
        }
        Some(schedule)
    }

    /// Parses a schedule from its serialized store form.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The serialized store form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Planned hours for one calendar week.
    #[must_use]
    pub fn hours_for(&self, week: NaiveDate) -> f64 {
        self.rows
            .iter()
            .find(|row| row.week == week)
            .map_or(self.default_hours, |row| row.hours)
    }

    /// True while no row was user-set. An all-automatic schedule carries
    /// nothing worth preserving over the document's version.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.rows.iter().all(|row| row.automatic)
    }

    /// True when the owner has taken over the calendar by hand: the
    /// schedule has more than one user-set row. Paired with unlocked
    /// dates this makes the whole schedule off-limits to sync.
    #[must_use]
    pub fn hand_edited(&self) -> bool {
        self.rows.iter().filter(|row| !row.automatic).count() > 1
    }

    /// Sets the hours for one week, replacing any existing row.
    pub fn set_exception(&mut self, week: NaiveDate, hours: f64, automatic: bool) {
        match self.rows.iter_mut().find(|row| row.week == week) {
            Some(row) => {
                row.hours = hours;
                row.automatic = automatic;
            }
            None => {
                let at = self.rows.partition_point(|row| row.week < week);
                self.rows.insert(at, ScheduleRow { week, hours, automatic });
            }
        }
    }

    /// Merges the owner's `current` schedule with a fresh document
    /// schedule, using the copy adopted at the last sync as the baseline.
    ///
    /// A user-set row whose hours differ from the baseline's hours for the
    /// same calendar week is an edit the document has not seen; it is
    /// layered on top of the fresh document schedule and reported as an
    /// exception. Rows that match the baseline were document data all
    /// along and are dropped in favor of whatever the document says now.
    /// Keying by calendar week keeps an exception attached to its week
    /// even when the new schedule starts on a different date.
    #[must_use]
    pub fn merge(current: &Self, baseline: &Self, wbs: &Self) -> MergeOutcome {
        let mut exceptions = Vec::new();
        for row in &current.rows {
            if row.automatic {
                continue;
            }
            if !same_hours(row.hours, baseline.hours_for(row.week)) {
                exceptions.push(ScheduleException { week: row.week, hours: row.hours });
            }
        }
        let mut merged = wbs.clone();
        for exception in &exceptions {
            merged.set_exception(exception.week, exception.hours, false);
        }
        merged.dates_locked = true;
        MergeOutcome { merged, exceptions }
    }
}

fn read_schedule(
    worker: &dyn SyncWorker,
    project: &HierPath,
    name: &str,
) -> Result<Option<Schedule>, SyncError> {
    worker
        .get_text(project, name)
        .map(|raw| Schedule::parse(&raw))
        .transpose()
        .map_err(SyncError::from)
}

/// Syncs the plan owner's schedule from their document team-member row.
///
/// Hand-edited unlocked schedules are left untouched. A default schedule,
/// or one with no sync baseline yet, is replaced outright. Otherwise the
/// three-way merge runs and any surviving user exceptions are recorded as
/// a discrepancy for the document to adopt.
pub(crate) fn sync_member_schedule(
    worker: &mut dyn SyncWorker,
    project: &HierPath,
    ident: &NodeIdent,
    member: &WbsNode,
    discrepancies: &mut DiscrepancyLog,
) -> Result<(), SyncError> {
    let Some(wbs) = Schedule::from_member(member) else {
        return Ok(());
    };
    let current = read_schedule(worker, project, names::SCHEDULE)?;
    let baseline = read_schedule(worker, project, names::SCHEDULE_SYNCED)?;

    if let Some(cur) = &current {
        if !cur.dates_locked && cur.hand_edited() {
            tracing::debug!("Schedule at '{}' is hand-edited, leaving it alone", project);
            return Ok(());
        }
    }

    let merged = match (&current, &baseline) {
        (Some(cur), Some(base)) if !cur.is_default() => {
            let outcome = Schedule::merge(cur, base, &wbs);
            if !outcome.exceptions.is_empty() {
                discrepancies.record(Discrepancy::EvSchedule {
                    path: project.clone(),
                    ident: ident.clone(),
                    exceptions: outcome.exceptions,
                });
            }
            outcome.merged
        }
        _ => wbs.clone(),
    };

    worker.put_value(project, names::SCHEDULE, Some(DataValue::Text(merged.to_json()?)))?;
    worker.force_put_value(project, names::SCHEDULE_SYNCED, DataValue::Text(wbs.to_json()?))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::LiveSyncWorker;
    use pretty_assertions::assert_eq;
    use wbs_hier::{HierarchyStore, MemHierarchy};
    use wbs_model::{NodeTag, WbsNode};

    fn p(s: &str) -> HierPath {
        s.parse().unwrap()
    }

    fn week(n: u32) -> NaiveDate {
        // Mondays, n weeks after 2026-03-02.
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap() + chrono::Days::new(u64::from(n) * 7)
    }

    fn member(start: NaiveDate, hours: f64) -> WbsNode {
        let mut node = WbsNode::new(NodeTag::TeamMember, "Alice");
        node.initials = Some("aa".to_string());
        node.start_date = Some(start);
        node.hours_per_week = Some(hours);
        node
    }

    #[test]
    fn merge_keeps_a_user_exception_the_document_never_saw() {
        let baseline = Schedule::seed(week(0), 20.0);
        let mut current = baseline.clone();
        current.dates_locked = true;
        current.set_exception(week(3), 10.0, false);
        let wbs = Schedule { default_hours: 15.0, dates_locked: true, ..Schedule::seed(week(0), 0.0) };

        let outcome = Schedule::merge(&current, &baseline, &wbs);
        assert!((outcome.merged.hours_for(week(3)) - 10.0).abs() < 1e-9);
        assert!((outcome.merged.default_hours - 15.0).abs() < 1e-9);
        assert!(outcome.merged.dates_locked);
        assert_eq!(
            outcome.exceptions,
            vec![ScheduleException { week: week(3), hours: 10.0 }]
        );
    }

    #[test]
    fn rows_matching_the_baseline_yield_to_the_document() {
        let mut baseline = Schedule::seed(week(0), 20.0);
        baseline.set_exception(week(2), 30.0, true);
        let mut current = baseline.clone();
        current.dates_locked = true;
        // The owner touched the row but ended up at the baseline value.
        current.rows[0].automatic = false;
        let mut wbs = Schedule::seed(week(0), 20.0);
        wbs.set_exception(week(2), 8.0, true);

        let outcome = Schedule::merge(&current, &baseline, &wbs);
        assert!(outcome.exceptions.is_empty());
        assert!((outcome.merged.hours_for(week(2)) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn hand_edited_needs_more_than_one_user_row() {
        let mut schedule = Schedule::seed(week(0), 20.0);
        schedule.set_exception(week(1), 5.0, false);
        assert!(!schedule.hand_edited());
        schedule.set_exception(week(2), 6.0, false);
        assert!(schedule.hand_edited());
        assert!(!schedule.is_default());
    }

    #[test]
    fn from_member_rows_are_all_automatic() {
        let mut node = member(week(0), 20.0);
        node.schedule.push(ScheduleException { week: week(1), hours: 0.0 });
        let schedule = Schedule::from_member(&node).unwrap();
        assert!(schedule.dates_locked);
        assert!(schedule.is_default());
        assert!((schedule.hours_for(week(1))).abs() < 1e-9);
        assert!((schedule.hours_for(week(2)) - 20.0).abs() < 1e-9);

        node.start_date = None;
        assert!(Schedule::from_member(&node).is_none());
    }

    #[test]
    fn first_sync_adopts_the_document_schedule() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        let mut log = DiscrepancyLog::default();
        let ident = NodeIdent::Official("r1".to_string());
        let node = member(week(0), 20.0);

        sync_member_schedule(&mut worker, &p("/Proj"), &ident, &node, &mut log).unwrap();
        let adopted =
            Schedule::parse(&worker.get_text(&p("/Proj"), names::SCHEDULE).unwrap()).unwrap();
        assert!(adopted.dates_locked);
        assert!((adopted.default_hours - 20.0).abs() < 1e-9);
        assert!(worker.get_text(&p("/Proj"), names::SCHEDULE_SYNCED).is_some());
        assert!(log.is_empty());

        // A second identical pass writes nothing new.
        let first_len = worker.log().changes().len();
        sync_member_schedule(&mut worker, &p("/Proj"), &ident, &node, &mut log).unwrap();
        assert_eq!(worker.log().changes().len(), first_len);
    }

    #[test]
    fn merge_pass_records_the_exception_discrepancy() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        let mut log = DiscrepancyLog::default();
        let ident = NodeIdent::Official("r1".to_string());

        let baseline = Schedule { dates_locked: true, ..Schedule::seed(week(0), 20.0) };
        let mut current = baseline.clone();
        current.set_exception(week(3), 10.0, false);
        worker
            .force_put_value(&p("/Proj"), names::SCHEDULE, DataValue::Text(current.to_json().unwrap()))
            .unwrap();
        worker
            .force_put_value(
                &p("/Proj"),
                names::SCHEDULE_SYNCED,
                DataValue::Text(baseline.to_json().unwrap()),
            )
            .unwrap();

        sync_member_schedule(&mut worker, &p("/Proj"), &ident, &member(week(0), 15.0), &mut log)
            .unwrap();
        let merged =
            Schedule::parse(&worker.get_text(&p("/Proj"), names::SCHEDULE).unwrap()).unwrap();
        assert!((merged.hours_for(week(3)) - 10.0).abs() < 1e-9);
        assert!((merged.default_hours - 15.0).abs() < 1e-9);
        assert_eq!(log.items().len(), 1);
        match &log.items()[0] {
            Discrepancy::EvSchedule { exceptions, .. } => {
                assert_eq!(exceptions, &vec![ScheduleException { week: week(3), hours: 10.0 }]);
            }
            other => panic!("unexpected discrepancy {other:?}"),
        }
    }

    #[test]
    fn hand_edited_unlocked_schedules_are_untouched() {
        let mut store = MemHierarchy::new();
        store.add_node(&p("/Proj"), names::PERSONAL_ROOT_TEMPLATE).unwrap();
        let mut worker = LiveSyncWorker::new(&mut store);
        let mut log = DiscrepancyLog::default();

        let mut current = Schedule::seed(week(0), 20.0);
        current.set_exception(week(1), 5.0, false);
        current.set_exception(week(2), 6.0, false);
        let raw = current.to_json().unwrap();
        worker
            .force_put_value(&p("/Proj"), names::SCHEDULE, DataValue::Text(raw.clone()))
            .unwrap();

        let ident = NodeIdent::Official("r1".to_string());
        sync_member_schedule(&mut worker, &p("/Proj"), &ident, &member(week(0), 40.0), &mut log)
            .unwrap();
        assert_eq!(worker.get_text(&p("/Proj"), names::SCHEDULE), Some(raw));
        assert!(worker.get_text(&p("/Proj"), names::SCHEDULE_SYNCED).is_none());
        assert!(log.is_empty());
    }
}
