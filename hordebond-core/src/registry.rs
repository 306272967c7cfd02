//! Link registry — locates, creates, and removes the bond record attached
//! to a horde entity, and resolves summoner↔horde relationships.
//!
//! The bond lives inside the horde's own document (see
//! [`crate::host::BOND_PATH`]); the host deletes it together with the horde.
//! All functions here go through [`EntityStore`] and never cache.

use chrono::Utc;

use crate::error::StoreError;
use crate::host::EntityStore;
use crate::types::{BondRecord, BondRule, EntityId, SyncOptions};

// ---------------------------------------------------------------------------
// 1. Lookup
// ---------------------------------------------------------------------------

/// The bond attached to `horde`, or `None` when absent or malformed.
///
/// A malformed payload is treated as "not linked" and logged; it is the
/// host's document and may have been hand-edited.
pub fn find_bond(store: &dyn EntityStore, horde: &EntityId) -> Option<BondRecord> {
    let raw = store.bond_value(horde)?;
    match serde_json::from_value::<BondRecord>(raw) {
        Ok(bond) => Some(bond),
        Err(err) => {
            tracing::warn!(horde = %horde, error = %err, "malformed bond record, treating as unlinked");
            None
        }
    }
}

/// The summoner a horde is linked to, or `None` when unlinked.
pub fn summoner_id_of(store: &dyn EntityStore, horde: &EntityId) -> Option<EntityId> {
    find_bond(store, horde).map(|bond| bond.summoner_id)
}

/// Every horde whose bond points at `summoner`, in host iteration order.
/// The order carries no meaning.
pub fn hordes_of(store: &dyn EntityStore, summoner: &EntityId) -> Vec<EntityId> {
    store
        .entity_ids()
        .into_iter()
        .filter(|id| summoner_id_of(store, id).as_ref() == Some(summoner))
        .collect()
}

// ---------------------------------------------------------------------------
// 2. Create
// ---------------------------------------------------------------------------

/// Attach a new bond to a previously unlinked horde.
///
/// `last_synced` starts unset. The rule list starts as the all-zero modifier
/// set for the enabled categories, which is what makes the bond visible to
/// the host's derived-stat computation before the first real sync runs.
pub fn create_bond(
    store: &dyn EntityStore,
    horde: &EntityId,
    summoner_id: EntityId,
    options: SyncOptions,
) -> Result<BondRecord, StoreError> {
    let bond = BondRecord {
        summoner_id,
        options,
        rules: zeroed_rules(&options),
        last_synced: None,
    };
    persist(store, horde, &bond)?;
    tracing::info!(horde = %horde, summoner = %bond.summoner_id, "created bond");
    Ok(bond)
}

/// The all-zero rule list for the enabled categories.
pub fn zeroed_rules(options: &SyncOptions) -> Vec<BondRule> {
    options
        .selectors()
        .into_iter()
        .map(|selector| BondRule::owned(selector, 0))
        .collect()
}

// ---------------------------------------------------------------------------
// 3. Update
// ---------------------------------------------------------------------------

/// Replace the targeted fields of an existing bond in place.
///
/// `options` replaces the whole toggle set when supplied — flags are never
/// merged individually. Unsupplied fields keep their prior values.
pub fn update_bond(
    store: &dyn EntityStore,
    horde: &EntityId,
    existing: BondRecord,
    summoner_id: Option<EntityId>,
    options: Option<SyncOptions>,
) -> Result<BondRecord, StoreError> {
    let bond = BondRecord {
        summoner_id: summoner_id.unwrap_or(existing.summoner_id),
        options: options.unwrap_or(existing.options),
        ..existing
    };
    persist(store, horde, &bond)?;
    tracing::info!(horde = %horde, summoner = %bond.summoner_id, "updated bond");
    Ok(bond)
}

/// Stamp `last_synced` and persist, leaving everything else untouched.
pub fn stamp_bond(
    store: &dyn EntityStore,
    horde: &EntityId,
    mut bond: BondRecord,
) -> Result<BondRecord, StoreError> {
    bond.last_synced = Some(Utc::now());
    persist(store, horde, &bond)?;
    Ok(bond)
}

// ---------------------------------------------------------------------------
// 4. Delete
// ---------------------------------------------------------------------------

/// Remove the bond from `horde` entirely. `Ok(false)` when none existed;
/// callers report that, it is not fatal.
pub fn delete_bond(store: &dyn EntityStore, horde: &EntityId) -> Result<bool, StoreError> {
    let removed = store.remove_bond(horde)?;
    if removed {
        tracing::info!(horde = %horde, "deleted bond");
    } else {
        tracing::debug!(horde = %horde, "delete requested but no bond present");
    }
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn persist(store: &dyn EntityStore, horde: &EntityId, bond: &BondRecord) -> Result<(), StoreError> {
    let value = serde_json::to_value(bond)?;
    store.put_bond(horde, &value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
