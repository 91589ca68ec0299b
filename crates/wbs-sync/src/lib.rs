//! WBS Synchronization Engine
//!
//! Reconciles a team work-breakdown-structure document with a local plan
//! hierarchy, in both directions: document structure and planning values
//! flow into the local store, while locally-edited values that win a merge
//! are recorded as discrepancies for the document's authoring tool to adopt.
//!
//! # Core Concepts
//!
//! - [`WbsSynchronizer`]: one configured sync pairing; runs passes
//! - [`SyncOptions`] / [`SyncRole`] / [`SyncMode`]: who is syncing and how
//! - [`SyncWorker`]: the transactional surface a pass mutates through;
//!   live and what-if implementations share every decision path
//! - [`SyncReport`]: what a pass changed, deferred, and wants to ask about
//! - [`Discrepancy`]: reverse-sync records carried back to the document
//! - [`SyncLockRegistry`]: per-project cooperative exclusion and throttling
//!
//! # Example
//!
//! ```rust,ignore
//! use wbs_sync::{SyncMode, SyncOptions, SyncRole, WbsSynchronizer};
//! use wbs_model::FileSource;
//!
//! let options = SyncOptions::new(SyncRole::individual("aa", "alice"))
//!     .with_mode(SyncMode::WhatIf);
//! let syncer = WbsSynchronizer::new(
//!     "/Project".parse()?,
//!     Box::new(FileSource::new("wbs-dump.json")),
//!     options,
//! );
//! let report = syncer.sync(&mut store)?;
//! println!("{} changes", report.changes.len());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod change;
mod deletion;
mod discrepancy;
mod dispatch;
mod error;
mod handler;
mod identity;
mod live;
mod lock;
pub mod names;
mod options;
mod phase;
mod prune;
mod replay;
mod schedule;
mod sync;
mod traced;
mod whatif;
mod worker;

// Re-exports
pub use change::ChangeEntry;
pub use discrepancy::{Discrepancy, DiscrepancyLog, SizeMetric};
pub use error::{StopReason, SyncError};
pub use identity::{prepare_local, IdentityIndex, KeepSet};
pub use live::LiveSyncWorker;
pub use lock::{LockClass, Pacer, SyncLockGuard, SyncLockRegistry};
pub use options::{Permissions, SyncMode, SyncOptions, SyncRole};
pub use phase::{PhaseError, PhaseResolver};
pub use prune::{prune, scrub_name, PruneOutcome};
pub use schedule::{MergeOutcome, Schedule, ScheduleRow};
pub use sync::{SyncReport, WbsSynchronizer};
pub use traced::TracedWorker;
pub use whatif::WhatIfSyncWorker;
pub use worker::{DataSyncResult, RenameRecord, SyncWorker, WorkerLog};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
