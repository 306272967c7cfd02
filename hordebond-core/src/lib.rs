//! hordebond core — domain types, host interfaces, link registry, errors.
//!
//! Public API surface:
//! - [`types`] — identifiers, selectors, bond records, sync options
//! - [`host`] — the consumed [`host::EntityStore`] / [`host::Notifier`] traits
//! - [`registry`] — bond lookup / create / update / delete
//! - [`error`] — [`StoreError`]

pub mod error;
pub mod host;
pub mod registry;
pub mod types;

pub use error::StoreError;
pub use host::{EntityStore, Notifier, TracingNotifier, UpdateEvent};
pub use types::{
    BondRecord, BondRule, EntityId, HpState, ModifierSet, Skill, StatSelector, SyncOptions,
    UserId, BOND_SOURCE,
};
