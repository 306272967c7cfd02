//! Error types for hordebond-engine.

use thiserror::Error;

use hordebond_core::{EntityId, StoreError};

/// All errors a link or sync operation can abort on.
///
/// Public orchestrator entry points never let these escape — each degrades
/// to a reported boolean outcome at its own boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A supplied identifier does not resolve to a known entity.
    #[error("no entity found for '{entity}'")]
    NotFound { entity: EntityId },

    /// The local user lacks modify rights on an entity.
    #[error("missing permission to modify '{entity}'")]
    PermissionDenied { entity: EntityId },

    /// A link operation targeted an entity as its own summoner.
    #[error("'{entity}' cannot be linked to itself")]
    SelfLink { entity: EntityId },

    /// An unlink operation targeted an entity with no bond.
    #[error("'{entity}' is not linked to a summoner")]
    NotLinked { entity: EntityId },

    /// The host rejected a persistence call.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
