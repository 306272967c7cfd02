//! Per-entity in-flight sync markers.
//!
//! The guard set locks *intent to sync*, never the documents themselves —
//! the host store serializes document writes on its own. One set per
//! orchestrator instance; there is no process-global state.

use std::collections::HashSet;
use std::sync::Mutex;

use hordebond_core::EntityId;

/// Set of entity ids currently mid-sync.
///
/// Acquisition is atomic per id. A second attempt while a permit is held
/// returns `None` and the caller drops the sync (not queued, not retried).
#[derive(Debug, Default)]
pub struct SyncGuard {
    inflight: Mutex<HashSet<EntityId>>,
}

impl SyncGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as mid-sync. `None` when a sync is already in flight for it.
    /// The returned permit releases on drop, on every path.
    pub fn acquire(&self, id: &EntityId) -> Option<SyncPermit<'_>> {
        let mut inflight = self.lock();
        if inflight.insert(id.clone()) {
            Some(SyncPermit {
                guard: self,
                id: id.clone(),
            })
        } else {
            None
        }
    }

    /// Whether a sync targeting `id` is currently in flight.
    pub fn is_held(&self, id: &EntityId) -> bool {
        self.lock().contains(id)
    }

    /// Drop every marker. Teardown only — outstanding permits become no-ops.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn release(&self, id: &EntityId) {
        self.lock().remove(id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<EntityId>> {
        // A poisoned lock only means another sync panicked mid-flight; the
        // set itself is still coherent.
        self.inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// RAII marker for one in-flight sync. Releasing is unconditional.
#[derive(Debug)]
pub struct SyncPermit<'a> {
    guard: &'a SyncGuard,
    id: EntityId,
}

impl SyncPermit<'_> {
    pub fn entity(&self) -> &EntityId {
        &self.id
    }
}

impl Drop for SyncPermit<'_> {
    fn drop(&mut self) {
        self.guard.release(&self.id);
    }
}
