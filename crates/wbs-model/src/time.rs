//! Per-person planned-time attribute parsing.
//!
//! The document stores planned time as a comma-separated list of
//! `owner=minutes` entries, e.g. `"aa=120,bb=45.5"`. Owners are the team
//! members' initials.

use tracing::debug;

/// Parsed per-person planned time, preserving document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeAssignments {
    entries: Vec<(String, f64)>,
}

impl TimeAssignments {
    /// Parses the raw attribute value.
    ///
    /// Parsing is tolerant: entries without an `=` contribute zero minutes
    /// for the named owner, and malformed minute values are coerced to zero.
    // TODO: surface malformed minute values to the caller's change list
    // instead of coercing them to zero here.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut entries = Vec::new();
        for item in raw.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (owner, minutes) = match item.split_once('=') {
                Some((owner, value)) => {
                    let minutes = value.trim().parse::<f64>().unwrap_or_else(|_| {
                        debug!(entry = item, "malformed minute value in time assignment");
                        0.0
                    });
                    (owner.trim(), minutes)
                }
                None => (item, 0.0),
            };
            if owner.is_empty() {
                continue;
            }
            entries.push((owner.to_string(), minutes));
        }
        Self { entries }
    }

    /// True when no owner appears in the attribute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total minutes across all owners.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, m)| m).sum()
    }

    /// Minutes assigned to one owner, if the owner appears at all.
    ///
    /// Owner comparison is case-insensitive, matching how initials are
    /// entered by hand.
    #[must_use]
    pub fn for_owner(&self, initials: &str) -> Option<f64> {
        self.entries
            .iter()
            .filter(|(o, _)| o.eq_ignore_ascii_case(initials))
            .map(|(_, m)| *m)
            .reduce(|a, b| a + b)
    }

    /// True when the owner appears in the attribute, even with zero minutes.
    #[must_use]
    pub fn contains_owner(&self, initials: &str) -> bool {
        self.entries.iter().any(|(o, _)| o.eq_ignore_ascii_case(initials))
    }

    /// The owners in document order.
    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(o, _)| o.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_lists() {
        let t = TimeAssignments::parse("aa=120,bb=45.5");
        assert_eq!(t.for_owner("aa"), Some(120.0));
        assert_eq!(t.for_owner("bb"), Some(45.5));
        assert!((t.total() - 165.5).abs() < f64::EPSILON);
    }

    #[test]
    fn owner_without_minutes_counts_as_zero() {
        let t = TimeAssignments::parse("aa,bb=30");
        assert_eq!(t.for_owner("aa"), Some(0.0));
        assert!(t.contains_owner("aa"));
    }

    #[test]
    fn malformed_minutes_coerce_to_zero() {
        let t = TimeAssignments::parse("aa=oops,bb=15");
        assert_eq!(t.for_owner("aa"), Some(0.0));
        assert_eq!(t.for_owner("bb"), Some(15.0));
    }

    #[test]
    fn owner_lookup_ignores_case() {
        let t = TimeAssignments::parse("AA=60");
        assert_eq!(t.for_owner("aa"), Some(60.0));
    }

    #[test]
    fn repeated_owner_entries_accumulate() {
        let t = TimeAssignments::parse("aa=10,aa=20");
        assert_eq!(t.for_owner("aa"), Some(30.0));
    }

    #[test]
    fn empty_and_junk_entries_are_skipped() {
        let t = TimeAssignments::parse(" , =5 ,");
        assert!(t.is_empty());
        assert_eq!(t.for_owner("aa"), None);
    }
}
