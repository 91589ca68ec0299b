//! Engine error taxonomy.

use thiserror::Error;
use wbs_hier::HierError;
use wbs_model::{DocumentError, SourceError};

/// Why a pass stopped before completing its walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A brief what-if pass found its first change and stopped on purpose.
    ChangeFound,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChangeFound => f.write_str("a change was found"),
        }
    }
}

/// Errors raised by a synchronization pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The document could not be fetched. A missing document is a normal
    /// condition; callers usually skip the pass quietly for
    /// [`SourceError::NotFound`] and report the others.
    #[error("could not fetch the WBS document: {0}")]
    Source(#[from] SourceError),

    /// The fetched bytes were not a usable document. Always fatal for the
    /// pass; the store is left untouched.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The local store rejected a mutation.
    #[error("hierarchy update failed: {0}")]
    Hier(#[from] HierError),

    /// Bookkeeping data (dependency lists, schedules, discrepancies) could
    /// not be encoded.
    #[error("failed to encode sync bookkeeping data: {0}")]
    Encode(#[from] serde_json::Error),

    /// No project exists at the configured path.
    #[error("no project exists at {0}")]
    ProjectMissing(String),

    /// Internal control flow: the pass stopped early. Converted into a
    /// normal report by the driver, never surfaced to callers.
    #[error("synchronization pass stopped early: {0}")]
    Stopped(StopReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_errors_convert() {
        let err: SyncError = SourceError::NotFound("x".into()).into();
        assert!(matches!(err, SyncError::Source(SourceError::NotFound(_))));
    }

    #[test]
    fn hier_errors_convert() {
        let err: SyncError = HierError::RootImmutable.into();
        assert!(err.to_string().contains("hierarchy update failed"));
    }
}
