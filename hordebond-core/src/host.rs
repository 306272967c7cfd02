//! Consumed host interfaces.
//!
//! The host platform owns the entity documents, permissions, derived-stat
//! computation, and user-facing notifications. This module is the narrow
//! surface the sync engine reads and writes through; nothing here is
//! reimplemented host behavior.

use serde_json::Value;

use crate::error::StoreError;
use crate::types::{EntityId, HpState, StatSelector, UserId};

// ---------------------------------------------------------------------------
// Field paths
// ---------------------------------------------------------------------------

/// Nested document subtree holding hit points.
pub const HP_ROOT: &str = "system.attributes.hp";
pub const HP_VALUE_PATH: &str = "system.attributes.hp.value";
pub const HP_TEMP_PATH: &str = "system.attributes.hp.temp";

/// Document path of the embedded bond record on a horde.
pub const BOND_PATH: &str = "flags.hordebond.bond";

/// True when any changed field path enters the hit-point subtree.
pub fn touches_hp(changed: &[String]) -> bool {
    changed.iter().any(|path| path.starts_with(HP_ROOT))
}

/// Document path of the effective value backing a selector.
pub fn field_path(selector: StatSelector) -> String {
    match selector {
        StatSelector::Ac => "system.attributes.ac.value".to_owned(),
        StatSelector::Fortitude => "system.saves.fortitude.value".to_owned(),
        StatSelector::Reflex => "system.saves.reflex.value".to_owned(),
        StatSelector::Will => "system.saves.will.value".to_owned(),
        StatSelector::Skill(skill) => format!("system.skills.{}.value", skill.as_str()),
        StatSelector::MaxHp => "system.attributes.hp.max".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Update events
// ---------------------------------------------------------------------------

/// One per-entity update notification from the host.
///
/// Delivered over a channel whose receiver half is the disposable
/// subscription handle; dropping it ends the subscription.
#[derive(Debug, Clone)]
pub struct UpdateEvent {
    pub entity: EntityId,
    /// Nested field paths the update touched.
    pub changed: Vec<String>,
    /// The user session the change originated from.
    pub user: UserId,
}

// ---------------------------------------------------------------------------
// Store and notifier traits
// ---------------------------------------------------------------------------

/// Read/write access to the host document store.
///
/// Every implementation is expected to serialize concurrent writes to the
/// same document; this crate locks only intent-to-sync, never documents.
pub trait EntityStore: Send + Sync {
    /// Whether `id` resolves to a known entity.
    fn exists(&self, id: &EntityId) -> bool;

    /// Every known entity, in host iteration order. The order carries no
    /// meaning and callers must not rely on it.
    fn entity_ids(&self) -> Vec<EntityId>;

    /// Whether `user` holds modify rights on `id`.
    fn is_owner(&self, user: &UserId, id: &EntityId) -> bool;

    /// The fully derived value of a stat, after every modifier the host
    /// applies — bond rules included. `None` when the entity or stat is
    /// unknown; callers substitute [`StatSelector::baseline`].
    fn effective_value(&self, id: &EntityId, selector: StatSelector) -> Option<i32>;

    /// Current hit-point snapshot, `None` for an unknown entity.
    fn hp(&self, id: &EntityId) -> Option<HpState>;

    /// Partial write of current and temporary HP. Never touches max HP.
    fn set_hp(&self, id: &EntityId, value: i32, temp: i32) -> Result<(), StoreError>;

    /// The raw embedded bond record, `None` when absent. Malformed payloads
    /// are returned as-is; the registry decides they mean "not linked".
    fn bond_value(&self, id: &EntityId) -> Option<Value>;

    /// Replace the embedded bond record as a unit.
    fn put_bond(&self, id: &EntityId, bond: &Value) -> Result<(), StoreError>;

    /// Remove the embedded bond record. `Ok(false)` when none existed.
    fn remove_bond(&self, id: &EntityId) -> Result<bool, StoreError>;
}

/// Fire-and-forget transient user-facing messages.
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// [`Notifier`] that routes to tracing — the default for embedders whose
/// host has no message UI wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}
