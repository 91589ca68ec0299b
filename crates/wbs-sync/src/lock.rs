//! Per-project cooperative locking and pacing.
//!
//! Only one pass may walk a project at a time, live or what-if alike: a
//! live pass mutates the store, and a what-if pass must not observe a store
//! shifting underneath it. Locks are cooperative rather than preemptive. An
//! interactive pass arriving while a background pass holds the lock raises
//! a yield flag; the background pass checks the flag between nodes,
//! finishes the node in hand, and releases.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

/// Who is asking for a project lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockClass {
    /// A scheduled pass. Naps between nodes and yields to interactive work.
    Background,
    /// A user-initiated pass. Signals background holders to wrap up.
    Interactive,
}

#[derive(Debug, Default)]
struct LockState {
    held: bool,
    holder_background: bool,
}

#[derive(Debug, Default)]
struct LockEntry {
    state: Mutex<LockState>,
    freed: Condvar,
    /// Raised while an interactive pass is waiting on a background holder.
    yield_requested: AtomicBool,
}

/// Registry of per-project sync locks.
///
/// Create one per process and hand a clone of the `Arc` to every
/// synchronizer. The registry is never a hidden global; its lifetime is the
/// embedder's to manage.
#[derive(Debug, Default)]
pub struct SyncLockRegistry {
    entries: DashMap<String, Arc<LockEntry>>,
}

impl SyncLockRegistry {
    /// A fresh registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, project: &str) -> Arc<LockEntry> {
        self.entries.entry(project.to_string()).or_default().clone()
    }

    /// Acquires the lock for `project`, blocking until it is free.
    ///
    /// While an interactive caller waits behind a background holder, the
    /// holder's yield flag stays raised so it releases at the next node
    /// boundary.
    pub fn acquire(&self, project: &str, class: LockClass) -> SyncLockGuard {
        let entry = self.entry(project);
        let mut state = entry.state.lock();
        while state.held {
            if class == LockClass::Interactive && state.holder_background {
                entry.yield_requested.store(true, Ordering::Relaxed);
            }
            entry.freed.wait(&mut state);
        }
        state.held = true;
        state.holder_background = class == LockClass::Background;
        entry.yield_requested.store(false, Ordering::Relaxed);
        drop(state);
        SyncLockGuard { entry }
    }

    /// Acquires the lock only if it is free right now.
    pub fn try_acquire(&self, project: &str, class: LockClass) -> Option<SyncLockGuard> {
        let entry = self.entry(project);
        let mut state = entry.state.lock();
        if state.held {
            return None;
        }
        state.held = true;
        state.holder_background = class == LockClass::Background;
        entry.yield_requested.store(false, Ordering::Relaxed);
        drop(state);
        Some(SyncLockGuard { entry })
    }
}

/// Holds a project lock until dropped.
pub struct SyncLockGuard {
    entry: Arc<LockEntry>,
}

impl SyncLockGuard {
    /// True once an interactive pass is waiting and this holder should
    /// finish the node in hand and release.
    #[must_use]
    pub fn should_yield(&self) -> bool {
        self.entry.yield_requested.load(Ordering::Relaxed)
    }
}

impl Drop for SyncLockGuard {
    fn drop(&mut self) {
        let mut state = self.entry.state.lock();
        state.held = false;
        state.holder_background = false;
        drop(state);
        self.entry.freed.notify_all();
    }
}

impl std::fmt::Debug for SyncLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncLockGuard")
            .field("should_yield", &self.should_yield())
            .finish()
    }
}

/// Spreads a background pass out over time so it does not monopolize the
/// store. Interactive passes, and background passes asked to yield, never
/// nap.
#[derive(Debug, Clone)]
pub struct Pacer {
    nap: Duration,
    enabled: bool,
}

impl Pacer {
    /// A pacer napping `nap` between nodes when `enabled`.
    #[must_use]
    pub fn new(nap: Duration, enabled: bool) -> Self {
        Self { nap, enabled }
    }

    /// Called between nodes during a walk.
    pub fn pace(&self, guard: &SyncLockGuard) {
        if self.enabled && !self.nap.is_zero() && !guard.should_yield() {
            std::thread::sleep(self.nap);
        }
    }
}
