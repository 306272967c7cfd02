//! Sync orchestrator — direction arbitration, guards, batch sweeps.
//!
//! One instance per process, constructed with the host substrate and torn
//! down explicitly. Every public operation degrades errors to a reported
//! boolean or count at its own boundary; a fault here must never escape
//! into the host's event pipeline.

use std::sync::Arc;

use hordebond_core::{registry, EntityId, EntityStore, Notifier, SyncOptions, UserId};

use crate::delta;
use crate::error::EngineError;
use crate::guard::{SyncGuard, SyncPermit};
use crate::writer::{self, WriteOutcome};

/// How a link operation resolved for an already-/not-yet-linked horde.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkOutcome {
    Created,
    Updated,
}

pub struct Orchestrator {
    store: Arc<dyn EntityStore>,
    notifier: Arc<dyn Notifier>,
    guard: SyncGuard,
    local_user: UserId,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn EntityStore>,
        notifier: Arc<dyn Notifier>,
        local_user: UserId,
    ) -> Self {
        Self {
            store,
            notifier,
            guard: SyncGuard::new(),
            local_user,
        }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn local_user(&self) -> &UserId {
        &self.local_user
    }

    /// Cancel-everything teardown: drops every in-flight marker. Call once
    /// when the host environment shuts the module down.
    pub fn teardown(&self) {
        self.guard.clear();
    }

    // -----------------------------------------------------------------------
    // Guards
    // -----------------------------------------------------------------------

    /// Advisory permit marking `entity` as mid-sync. Both sync directions
    /// acquire through this; embedders may hold one to fence an entity
    /// against syncs during their own bulk edits. `None` when already held.
    pub fn begin_sync(&self, entity: &EntityId) -> Option<SyncPermit<'_>> {
        self.guard.acquire(entity)
    }

    /// Whether a sync targeting `entity` is currently in flight.
    pub fn is_syncing(&self, entity: &EntityId) -> bool {
        self.guard.is_held(entity)
    }

    // -----------------------------------------------------------------------
    // Directional syncs
    // -----------------------------------------------------------------------

    /// Mirror the summoner's enabled stats onto one linked horde.
    ///
    /// Returns `false` without mutating anything when either entity is
    /// missing, the horde has no bond, the horde is already mid-sync, or
    /// the store rejects the write. A `false` from a guarded horde means
    /// "try again later", not failure.
    pub fn sync_summoner_to_horde(&self, summoner: &EntityId, horde: &EntityId) -> bool {
        if !self.store.exists(summoner) || !self.store.exists(horde) {
            tracing::debug!(summoner = %summoner, horde = %horde, "sync skipped, entity missing");
            return false;
        }
        let Some(bond) = registry::find_bond(self.store.as_ref(), horde) else {
            tracing::debug!(horde = %horde, "sync skipped, horde not linked");
            return false;
        };
        let Some(_permit) = self.guard.acquire(horde) else {
            tracing::debug!(horde = %horde, "sync skipped, already in flight");
            return false;
        };

        match self.forward_sync(summoner, horde, bond) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(summoner = %summoner, horde = %horde, error = %err, "summoner→horde sync failed");
                self.notifier.error("Failed to sync stats onto the linked horde.");
                false
            }
        }
    }

    /// Mirror the horde's current and temporary HP back onto the summoner
    /// (shared HP pool). Max HP is never written — the summoner is the
    /// source of truth for it.
    pub fn sync_horde_to_summoner(&self, horde: &EntityId, summoner: &EntityId) -> bool {
        if !self.store.exists(horde) || !self.store.exists(summoner) {
            tracing::debug!(horde = %horde, summoner = %summoner, "hp sync skipped, entity missing");
            return false;
        }
        let Some(bond) = registry::find_bond(self.store.as_ref(), horde) else {
            tracing::debug!(horde = %horde, "hp sync skipped, horde not linked");
            return false;
        };
        if !bond.options.hp {
            tracing::debug!(horde = %horde, "hp sync skipped, hp category disabled");
            return false;
        }
        let Some(_permit) = self.guard.acquire(summoner) else {
            tracing::debug!(summoner = %summoner, "hp sync skipped, already in flight");
            return false;
        };

        match self.copy_hp(horde, summoner) {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(horde = %horde, summoner = %summoner, error = %err, "horde→summoner hp sync failed");
                self.notifier.error("Failed to mirror horde damage onto the summoner.");
                false
            }
        }
    }

    fn forward_sync(
        &self,
        summoner: &EntityId,
        horde: &EntityId,
        bond: hordebond_core::BondRecord,
    ) -> Result<(), EngineError> {
        let modifiers = delta::compute_modifiers(self.store.as_ref(), summoner, horde, &bond);
        let (outcome, bond) = writer::apply_modifiers(self.store.as_ref(), horde, &bond, &modifiers)?;

        let hp_copied = if bond.options.hp {
            self.copy_hp(summoner, horde)?
        } else {
            false
        };

        // A pass that only moved HP still counts as a sync; stamp it. A pass
        // that moved nothing stays silent so the ripple terminates here.
        if hp_copied && outcome == WriteOutcome::Unchanged {
            registry::stamp_bond(self.store.as_ref(), horde, bond)?;
        }
        Ok(())
    }

    /// Direct copy of current/temp HP from `from` onto `onto`, skipped when
    /// the figures already match. Max HP is untouched by construction.
    fn copy_hp(&self, from: &EntityId, onto: &EntityId) -> Result<bool, EngineError> {
        let source = self.store.hp(from).unwrap_or_default();
        let target = self.store.hp(onto).unwrap_or_default();
        if source.value == target.value && source.temp == target.temp {
            return Ok(false);
        }
        self.store.set_hp(onto, source.value, source.temp)?;
        tracing::debug!(from = %from, onto = %onto, value = source.value, temp = source.temp, "copied hp");
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Sweeps
    // -----------------------------------------------------------------------

    /// Sync every link the local user can act on. Returns the number of
    /// hordes synced and reports a distinct outcome for zero vs nonzero.
    pub fn sync_all(&self) -> usize {
        let synced = self.sweep();
        if synced == 0 {
            self.notifier.info("No linked hordes to sync.");
        } else {
            self.notifier.info(&format!("Synced {synced} linked horde(s)."));
        }
        synced
    }

    /// Exposed alias for [`Orchestrator::sync_all`].
    pub fn sync(&self) -> usize {
        self.sync_all()
    }

    /// The `sync_all` sweep without any user-facing outcome — run once after
    /// the host finishes loading, to reconcile drift accumulated while no
    /// observer was listening.
    pub fn initial_sync(&self) {
        let synced = self.sweep();
        tracing::debug!(synced, "initial sync sweep complete");
    }

    fn sweep(&self) -> usize {
        let store = self.store.as_ref();

        // Deduplicate by summoner so each fan-out is processed once even
        // when several of its hordes are modifiable.
        let mut summoners: Vec<EntityId> = Vec::new();
        for id in store.entity_ids() {
            if !store.is_owner(&self.local_user, &id) {
                continue;
            }
            if let Some(summoner) = registry::summoner_id_of(store, &id) {
                if !summoners.contains(&summoner) {
                    summoners.push(summoner);
                }
            }
        }

        let mut synced = 0;
        for summoner in &summoners {
            for horde in registry::hordes_of(store, summoner) {
                if !store.is_owner(&self.local_user, &horde) {
                    continue;
                }
                if self.sync_summoner_to_horde(summoner, &horde) {
                    synced += 1;
                }
            }
        }
        synced
    }

    // -----------------------------------------------------------------------
    // Link / unlink
    // -----------------------------------------------------------------------

    /// Create or update the bond from `horde_id` to `summoner_id`, then run
    /// one synchronous summoner→horde sync so the bond is not left stale.
    ///
    /// Omitted `options` keep the prior toggles on an existing bond and
    /// default to all-enabled on a new one.
    pub fn link_horde(
        &self,
        summoner_id: &EntityId,
        horde_id: &EntityId,
        options: Option<SyncOptions>,
    ) -> bool {
        match self.try_link(summoner_id, horde_id, options) {
            Ok(LinkOutcome::Created) => {
                self.notifier
                    .info(&format!("Linked horde '{horde_id}' to summoner '{summoner_id}'."));
                if !self.sync_summoner_to_horde(summoner_id, horde_id) {
                    tracing::warn!(horde = %horde_id, "post-link sync did not run");
                }
                true
            }
            Ok(LinkOutcome::Updated) => {
                self.notifier
                    .info(&format!("Updated link for horde '{horde_id}'."));
                if !self.sync_summoner_to_horde(summoner_id, horde_id) {
                    tracing::warn!(horde = %horde_id, "post-link sync did not run");
                }
                true
            }
            Err(err) => {
                self.report(&err);
                false
            }
        }
    }

    fn try_link(
        &self,
        summoner_id: &EntityId,
        horde_id: &EntityId,
        options: Option<SyncOptions>,
    ) -> Result<LinkOutcome, EngineError> {
        if summoner_id == horde_id {
            return Err(EngineError::SelfLink {
                entity: horde_id.clone(),
            });
        }
        let store = self.store.as_ref();
        for id in [summoner_id, horde_id] {
            if !store.exists(id) {
                return Err(EngineError::NotFound { entity: id.clone() });
            }
        }
        for id in [summoner_id, horde_id] {
            if !store.is_owner(&self.local_user, id) {
                return Err(EngineError::PermissionDenied { entity: id.clone() });
            }
        }

        match registry::find_bond(store, horde_id) {
            Some(existing) => {
                registry::update_bond(
                    store,
                    horde_id,
                    existing,
                    Some(summoner_id.clone()),
                    options,
                )?;
                Ok(LinkOutcome::Updated)
            }
            None => {
                registry::create_bond(
                    store,
                    horde_id,
                    summoner_id.clone(),
                    options.unwrap_or_default(),
                )?;
                Ok(LinkOutcome::Created)
            }
        }
    }

    /// Remove the bond from `horde_id`. Unlinking an unlinked horde reports
    /// a "not linked" outcome and returns false; it never faults.
    pub fn unlink_horde(&self, horde_id: &EntityId) -> bool {
        match self.try_unlink(horde_id) {
            Ok(()) => {
                self.notifier
                    .info(&format!("Unlinked horde '{horde_id}' from its summoner."));
                true
            }
            Err(err) => {
                self.report(&err);
                false
            }
        }
    }

    fn try_unlink(&self, horde_id: &EntityId) -> Result<(), EngineError> {
        let store = self.store.as_ref();
        if !store.exists(horde_id) {
            return Err(EngineError::NotFound {
                entity: horde_id.clone(),
            });
        }
        if !store.is_owner(&self.local_user, horde_id) {
            return Err(EngineError::PermissionDenied {
                entity: horde_id.clone(),
            });
        }
        if !registry::delete_bond(store, horde_id)? {
            return Err(EngineError::NotLinked {
                entity: horde_id.clone(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookup surface
    // -----------------------------------------------------------------------

    /// Every horde currently linked to `summoner_id`.
    pub fn find_linked_hordes(&self, summoner_id: &EntityId) -> Vec<EntityId> {
        registry::hordes_of(self.store.as_ref(), summoner_id)
    }

    /// The summoner `horde_id` is linked to, if any.
    pub fn find_linked_summoner(&self, horde_id: &EntityId) -> Option<EntityId> {
        registry::summoner_id_of(self.store.as_ref(), horde_id)
    }

    // -----------------------------------------------------------------------
    // Reporting
    // -----------------------------------------------------------------------

    fn report(&self, err: &EngineError) {
        tracing::warn!(error = %err, "link operation aborted");
        match err {
            EngineError::NotLinked { .. } | EngineError::PermissionDenied { .. } => {
                self.notifier.warn(&err.to_string());
            }
            _ => self.notifier.error(&err.to_string()),
        }
    }
}
