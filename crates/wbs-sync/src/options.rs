//! Configuration for a synchronization pairing.

use serde::Serialize;
use std::time::Duration;
use wbs_hier::HierPath;

/// Who is running the sync: the team rollup or one plan owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SyncRole {
    /// Team-level sync: components only, task leaves are aggregated away.
    Team,
    /// Personal sync for one team member.
    Individual {
        /// The member's initials, as used in document time assignments.
        initials: String,
        /// The member's username, the first half of the client-ID prefix.
        owner: String,
    },
}

impl SyncRole {
    /// An individual role from initials and username.
    #[must_use]
    pub fn individual(initials: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::Individual { initials: initials.into(), owner: owner.into() }
    }

    /// True for the team rollup role.
    #[must_use]
    pub fn is_team(&self) -> bool {
        matches!(self, Self::Team)
    }

    /// The plan owner's initials, if this is an individual role.
    #[must_use]
    pub fn initials(&self) -> Option<&str> {
        match self {
            Self::Team => None,
            Self::Individual { initials, .. } => Some(initials),
        }
    }
}

/// Whether a pass writes through to the store, and how eagerly it walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncMode {
    /// Apply changes to the persistent store.
    Live,
    /// Compute the full change list against an in-memory overlay; the
    /// persistent store is never touched.
    WhatIf,
    /// Like [`SyncMode::WhatIf`], but stop at the first change found.
    /// Used to answer "is a sync needed?" cheaply.
    WhatIfBrief,
}

impl SyncMode {
    /// True when the pass mutates the persistent store.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }

    /// True when the pass stops at the first change.
    #[must_use]
    pub fn is_brief(self) -> bool {
        matches!(self, Self::WhatIfBrief)
    }
}

/// Allow-lists gating destructive actions.
///
/// An action outside its allow-list is never taken; the node is recorded in
/// the report's pending lists so the user can be prompted.
#[derive(Debug, Clone, Default)]
pub struct Permissions {
    delete: Option<Vec<HierPath>>,
    complete: Option<Vec<HierPath>>,
}

impl Permissions {
    /// Permissions allowing every deletion and completion.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Restricts deletion to the given subtrees.
    #[must_use]
    pub fn with_deletes_allowed(mut self, paths: Vec<HierPath>) -> Self {
        self.delete = Some(paths);
        self
    }

    /// Restricts completion to the given subtrees.
    #[must_use]
    pub fn with_completions_allowed(mut self, paths: Vec<HierPath>) -> Self {
        self.complete = Some(paths);
        self
    }

    /// True when `path` may be deleted.
    #[must_use]
    pub fn allows_delete(&self, path: &HierPath) -> bool {
        Self::allows(self.delete.as_deref(), path)
    }

    /// True when `path` may be marked complete.
    #[must_use]
    pub fn allows_complete(&self, path: &HierPath) -> bool {
        Self::allows(self.complete.as_deref(), path)
    }

    fn allows(list: Option<&[HierPath]>, path: &HierPath) -> bool {
        match list {
            None => true,
            Some(allowed) => allowed.iter().any(|a| a.is_prefix_of(path)),
        }
    }
}

/// Everything configurable about a sync pairing.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Who is syncing.
    pub role: SyncRole,
    /// Live or what-if.
    pub mode: SyncMode,
    /// Background passes throttle themselves between nodes and yield to
    /// interactive runs.
    pub background: bool,
    /// Destructive-action allow-lists.
    pub permissions: Permissions,
    /// Dataset identity used in client IDs when the store does not carry
    /// one.
    pub dataset_id: String,
    /// Nap taken between nodes by background passes.
    pub throttle: Duration,
}

impl SyncOptions {
    /// Options for the given role: live, interactive, everything permitted.
    #[must_use]
    pub fn new(role: SyncRole) -> Self {
        Self {
            role,
            mode: SyncMode::Live,
            background: false,
            permissions: Permissions::allow_all(),
            dataset_id: "local".to_string(),
            throttle: Duration::from_millis(25),
        }
    }

    /// Sets the pass mode.
    #[must_use]
    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }

    /// Marks the pass as a background run.
    #[must_use]
    pub fn with_background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    /// Sets the destructive-action allow-lists.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Overrides the dataset identity for client IDs.
    #[must_use]
    pub fn with_dataset_id(mut self, dataset_id: impl Into<String>) -> Self {
        self.dataset_id = dataset_id.into();
        self
    }

    /// Overrides the background throttle nap.
    #[must_use]
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }
}
