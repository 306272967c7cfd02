//! Modifier writer — digest-gated, replace-not-append rule persistence.
//!
//! The whole previous rule list is discarded and rebuilt from the computed
//! modifier set on every write; nothing is ever appended. A SHA-256 digest
//! of the canonical serialized rule list gates the store call: when the
//! rebuilt list matches what the bond already carries, no write happens at
//! all — no write, no update event, no further ripple through the host.

use chrono::Utc;
use sha2::{Digest, Sha256};

use hordebond_core::{BondRecord, BondRule, EntityId, EntityStore, ModifierSet, StoreError};

/// Outcome of one rule-list write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The rule list changed and was persisted; `last_synced` was stamped.
    Written,
    /// The rebuilt list matches the persisted one; the store was not touched.
    Unchanged,
}

/// Replace the bond's rule list with `modifiers`, digest-gated.
///
/// Returns the outcome and the bond as it now stands (persisted on
/// `Written`, the untouched input on `Unchanged`). Store rejection surfaces
/// as an error for the orchestrator to degrade — it is never propagated
/// into the event pipeline.
pub fn apply_modifiers(
    store: &dyn EntityStore,
    horde: &EntityId,
    bond: &BondRecord,
    modifiers: &ModifierSet,
) -> Result<(WriteOutcome, BondRecord), StoreError> {
    let rules: Vec<BondRule> = modifiers
        .iter()
        .map(|(selector, value)| BondRule::owned(selector, value))
        .collect();

    let next_digest = rules_digest(&rules)?;
    let current_digest = rules_digest(&bond.rules)?;
    if next_digest == current_digest {
        tracing::debug!(horde = %horde, digest = %next_digest, "rule list unchanged, skipping write");
        return Ok((WriteOutcome::Unchanged, bond.clone()));
    }

    let next = BondRecord {
        rules,
        last_synced: Some(Utc::now()),
        ..bond.clone()
    };
    let value = serde_json::to_value(&next)?;
    store.put_bond(horde, &value)?;
    tracing::info!(
        horde = %horde,
        rules = next.rules.len(),
        digest = %next_digest,
        "wrote bond rule list",
    );
    Ok((WriteOutcome::Written, next))
}

/// Hex SHA-256 of the canonical serialized rule list.
fn rules_digest(rules: &[BondRule]) -> Result<String, StoreError> {
    let canonical = serde_json::to_vec(rules)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}
