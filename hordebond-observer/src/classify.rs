//! Update-event classification.
//!
//! Decides whether one host update event should schedule a sync, and in
//! which direction. Pure against the store; scheduling belongs to the
//! runtime loop.

use hordebond_core::host::touches_hp;
use hordebond_core::{registry, EntityId, EntityStore, UpdateEvent, UserId};

/// The sync a qualifying event asks for. One of these at a time sits in the
/// runtime's debounce slot; a newer one replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingSync {
    /// A summoner changed; re-mirror onto every linked horde.
    Fanout { summoner: EntityId },
    /// A horde's hit points changed; mirror them back onto its summoner.
    HordeHp { horde: EntityId },
}

/// Classify one update event, or `None` when it must not schedule anything.
///
/// Events from other user sessions are dropped first — every connected
/// client sees every remote edit, and only the originating session syncs.
/// An entity that is somehow both summoner and horde classifies as
/// summoner; that role wins for the notification.
pub fn classify(
    store: &dyn EntityStore,
    local_user: &UserId,
    event: &UpdateEvent,
) -> Option<PendingSync> {
    if event.user != *local_user {
        tracing::debug!(entity = %event.entity, user = %event.user, "ignoring remote-session update");
        return None;
    }

    if !registry::hordes_of(store, &event.entity).is_empty() {
        return Some(PendingSync::Fanout {
            summoner: event.entity.clone(),
        });
    }

    if registry::find_bond(store, &event.entity).is_some() && touches_hp(&event.changed) {
        return Some(PendingSync::HordeHp {
            horde: event.entity.clone(),
        });
    }

    None
}
