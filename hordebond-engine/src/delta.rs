//! Delta calculator — the next modifier set that makes the horde's
//! effective stats equal the summoner's.
//!
//! Per enabled selector, independently:
//!
//! 1. `applied` — the offset the bond currently contributes (0 if none).
//! 2. `base = horde_effective - applied` — the horde's stat as if the bond
//!    were absent.
//! 3. `offset = summoner_effective - base`.
//!
//! Recomputing against stats that already include the previous offset
//! yields the same offset again — the set never compounds.

use hordebond_core::{BondRecord, EntityId, EntityStore, ModifierSet, StatSelector};

/// Compute the modifier set for one summoner→horde pass.
///
/// Covers exactly the selectors enabled in the bond's options; disabled
/// categories are omitted so the writer clears them from the rule list.
/// `MaxHp` compares effective max HP — current HP is copied directly by the
/// orchestrator, never offset. Missing host values fall back to the
/// selector baseline on both sides.
pub fn compute_modifiers(
    store: &dyn EntityStore,
    summoner: &EntityId,
    horde: &EntityId,
    bond: &BondRecord,
) -> ModifierSet {
    let mut modifiers = ModifierSet::default();
    for selector in bond.options.selectors() {
        modifiers.push(selector, offset_for(store, summoner, horde, bond, selector));
    }
    modifiers
}

fn offset_for(
    store: &dyn EntityStore,
    summoner: &EntityId,
    horde: &EntityId,
    bond: &BondRecord,
    selector: StatSelector,
) -> i32 {
    let applied = bond.applied_offset(selector);
    let horde_effective = store
        .effective_value(horde, selector)
        .unwrap_or_else(|| selector.baseline());
    let summoner_effective = store
        .effective_value(summoner, selector)
        .unwrap_or_else(|| selector.baseline());
    let base = horde_effective - applied;
    summoner_effective - base
}
