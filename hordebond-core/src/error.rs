//! Error types for hordebond-core.

use thiserror::Error;

use crate::types::EntityId;

/// Failures surfaced by the host document store.
///
/// Caught at each write boundary; never propagated into the event pipeline.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The host rejected or failed a persistence call.
    #[error("store rejected write to {entity}: {detail}")]
    WriteRejected { entity: EntityId, detail: String },

    /// A record could not be serialized for the host document.
    #[error("bond record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience constructor for [`StoreError::WriteRejected`].
pub fn write_rejected(entity: &EntityId, detail: impl Into<String>) -> StoreError {
    StoreError::WriteRejected {
        entity: entity.clone(),
        detail: detail.into(),
    }
}
