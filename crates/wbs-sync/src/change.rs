//! Entries of the user-facing change list.

use serde::Serialize;

/// One entry in a pass's change list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum ChangeEntry {
    /// A structural change worth describing to the user.
    Described(String),
    /// The sentinel for data-value changes that are not itemized.
    Unlisted,
    /// A non-fatal problem found during the pass.
    Warning(String),
}

impl ChangeEntry {
    /// True for the unlisted-data sentinel.
    #[must_use]
    pub fn is_unlisted(&self) -> bool {
        matches!(self, Self::Unlisted)
    }

    /// True for warnings.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }
}

impl std::fmt::Display for ChangeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Described(text) => f.write_str(text),
            Self::Unlisted => f.write_str("(data values were updated)"),
            Self::Warning(text) => write!(f, "warning: {text}"),
        }
    }
}
