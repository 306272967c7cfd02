//! In-memory reference host.
//!
//! Implements the consumed host interfaces the way the real platform
//! behaves as seen from the sync engine: effective values are base values
//! plus every rule the entity's document carries (bond-owned and foreign),
//! writes raise update events attributed to the acting user, and the bond
//! record rides inside the horde's own document.
//!
//! Test-only conveniences (`edit_stat`, `damage`, `set_fail_writes`) model
//! a player editing a sheet or a flaky store, not extra engine surface.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::mpsc;

use hordebond_core::error::write_rejected;
use hordebond_core::host::{field_path, BOND_PATH, HP_TEMP_PATH, HP_VALUE_PATH};
use hordebond_core::{
    BondRecord, BondRule, EntityId, EntityStore, HpState, StatSelector, StoreError, UpdateEvent,
    UserId,
};

#[derive(Debug, Clone, Default)]
struct EntityRecord {
    owners: Vec<UserId>,
    stats: HashMap<StatSelector, i32>,
    hp: HpState,
    /// Modifiers from sources other than the bond (items, spells, …).
    external: Vec<BondRule>,
    bond: Option<Value>,
}

pub struct MemoryHost {
    state: Mutex<HashMap<EntityId, EntityRecord>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<UpdateEvent>>>,
    acting_user: Mutex<UserId>,
    fail_writes: AtomicBool,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
            acting_user: Mutex::new(UserId::from("gm")),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Register a new entity. `add_summoner` and `add_horde` are the same
    /// operation — the role only emerges once a bond points somewhere.
    pub fn add_summoner(&self, id: &EntityId) -> EntityBuilder<'_> {
        self.builder(id)
    }

    pub fn add_horde(&self, id: &EntityId) -> EntityBuilder<'_> {
        self.builder(id)
    }

    fn builder(&self, id: &EntityId) -> EntityBuilder<'_> {
        EntityBuilder {
            host: self,
            id: id.clone(),
            record: EntityRecord {
                owners: vec![self.acting_user()],
                ..EntityRecord::default()
            },
        }
    }

    /// New subscription; the receiver is the disposable handle. Dropped
    /// receivers are pruned on the next emit.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UpdateEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock_subscribers().push(tx);
        rx
    }

    /// The user attributed to engine-driven store writes.
    pub fn set_acting_user(&self, user: &UserId) {
        *self.lock(&self.acting_user) = user.clone();
    }

    /// Make every subsequent write fail, as a rejecting host store would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Attach a bond without raising an update event. Fixture setup only.
    pub fn install_bond(&self, id: &EntityId, bond: &BondRecord) {
        let value = serde_json::to_value(bond).expect("bond record serializes");
        if let Some(record) = self.lock_state().get_mut(id) {
            record.bond = Some(value);
        }
    }

    /// Attach a raw (possibly malformed) bond payload. Fixture setup only.
    pub fn install_raw_bond(&self, id: &EntityId, value: Value) {
        if let Some(record) = self.lock_state().get_mut(id) {
            record.bond = Some(value);
        }
    }

    /// Remove an entity entirely; its embedded bond goes with it, as the
    /// host deletes embedded records together with their parent.
    pub fn remove_entity(&self, id: &EntityId) {
        self.lock_state().remove(id);
    }

    /// A user edits one stat on a sheet: base value changes, an update
    /// event attributed to that user goes out.
    pub fn edit_stat(&self, user: &UserId, id: &EntityId, selector: StatSelector, value: i32) {
        {
            let mut state = self.lock_state();
            let Some(record) = state.get_mut(id) else { return };
            record.stats.insert(selector, value);
        }
        self.emit(id, vec![field_path(selector)], user.clone());
    }

    /// A user damages or heals an entity: current/temp HP change, max stays.
    pub fn damage(&self, user: &UserId, id: &EntityId, value: i32, temp: i32) {
        {
            let mut state = self.lock_state();
            let Some(record) = state.get_mut(id) else { return };
            record.hp.value = value;
            record.hp.temp = temp;
        }
        self.emit(
            id,
            vec![HP_VALUE_PATH.to_owned(), HP_TEMP_PATH.to_owned()],
            user.clone(),
        );
    }

    fn acting_user(&self) -> UserId {
        self.lock(&self.acting_user).clone()
    }

    fn emit(&self, entity: &EntityId, changed: Vec<String>, user: UserId) {
        let event = UpdateEvent {
            entity: entity.clone(),
            changed,
            user,
        };
        self.lock_subscribers()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn rule_offset(record: &EntityRecord, selector: StatSelector) -> i32 {
        let from_bond = record
            .bond
            .as_ref()
            .and_then(|raw| serde_json::from_value::<BondRecord>(raw.clone()).ok())
            .map(|bond| {
                bond.rules
                    .iter()
                    .filter(|r| r.selector == selector)
                    .map(|r| r.value)
                    .sum::<i32>()
            })
            .unwrap_or(0);
        let from_external = record
            .external
            .iter()
            .filter(|r| r.selector == selector)
            .map(|r| r.value)
            .sum::<i32>();
        from_bond + from_external
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, HashMap<EntityId, EntityRecord>> {
        self.lock(&self.state)
    }

    fn lock_subscribers(
        &self,
    ) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<UpdateEvent>>> {
        self.lock(&self.subscribers)
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EntityStore for MemoryHost {
    fn exists(&self, id: &EntityId) -> bool {
        self.lock_state().contains_key(id)
    }

    fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.lock_state().keys().cloned().collect();
        // HashMap order is arbitrary; sort so test runs are reproducible.
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        ids
    }

    fn is_owner(&self, user: &UserId, id: &EntityId) -> bool {
        self.lock_state()
            .get(id)
            .map(|record| record.owners.contains(user))
            .unwrap_or(false)
    }

    fn effective_value(&self, id: &EntityId, selector: StatSelector) -> Option<i32> {
        let state = self.lock_state();
        let record = state.get(id)?;
        if selector == StatSelector::MaxHp {
            return Some(record.hp.max + Self::rule_offset(record, selector));
        }
        let base = *record.stats.get(&selector)?;
        Some(base + Self::rule_offset(record, selector))
    }

    fn hp(&self, id: &EntityId) -> Option<HpState> {
        let state = self.lock_state();
        let record = state.get(id)?;
        Some(HpState {
            value: record.hp.value,
            temp: record.hp.temp,
            max: record.hp.max + Self::rule_offset(record, StatSelector::MaxHp),
        })
    }

    fn set_hp(&self, id: &EntityId, value: i32, temp: i32) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(write_rejected(id, "host rejected hp update"));
        }
        {
            let mut state = self.lock_state();
            let record = state
                .get_mut(id)
                .ok_or_else(|| write_rejected(id, "no such entity"))?;
            record.hp.value = value;
            record.hp.temp = temp;
        }
        self.emit(
            id,
            vec![HP_VALUE_PATH.to_owned(), HP_TEMP_PATH.to_owned()],
            self.acting_user(),
        );
        Ok(())
    }

    fn bond_value(&self, id: &EntityId) -> Option<Value> {
        self.lock_state().get(id)?.bond.clone()
    }

    fn put_bond(&self, id: &EntityId, bond: &Value) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(write_rejected(id, "host rejected bond update"));
        }
        {
            let mut state = self.lock_state();
            let record = state
                .get_mut(id)
                .ok_or_else(|| write_rejected(id, "no such entity"))?;
            record.bond = Some(bond.clone());
        }
        self.emit(id, vec![BOND_PATH.to_owned()], self.acting_user());
        Ok(())
    }

    fn remove_bond(&self, id: &EntityId) -> Result<bool, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(write_rejected(id, "host rejected bond removal"));
        }
        let removed = {
            let mut state = self.lock_state();
            state
                .get_mut(id)
                .map(|record| record.bond.take().is_some())
                .unwrap_or(false)
        };
        if removed {
            self.emit(id, vec![BOND_PATH.to_owned()], self.acting_user());
        }
        Ok(removed)
    }
}

/// Chainable setup for one entity; `commit` registers it.
pub struct EntityBuilder<'a> {
    host: &'a MemoryHost,
    id: EntityId,
    record: EntityRecord,
}

impl EntityBuilder<'_> {
    pub fn stat(mut self, selector: StatSelector, value: i32) -> Self {
        self.record.stats.insert(selector, value);
        self
    }

    pub fn hp(mut self, value: i32, temp: i32, max: i32) -> Self {
        self.record.hp = HpState { value, temp, max };
        self
    }

    /// A modifier some other source (item, spell) already applies.
    pub fn external_rule(mut self, selector: StatSelector, value: i32, source: &str) -> Self {
        self.record.external.push(BondRule {
            selector,
            value,
            source: source.to_owned(),
        });
        self
    }

    /// Replace the owner list with exactly `user`.
    pub fn owned_by(mut self, user: &UserId) -> Self {
        self.record.owners = vec![user.clone()];
        self
    }

    pub fn commit(self) {
        self.host.lock_state().insert(self.id, self.record);
    }
}
