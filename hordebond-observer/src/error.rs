//! Error types for hordebond-observer.

use thiserror::Error;

/// Failures surfaced by observer lifecycle management.
///
/// The loop itself never faults — a fault there would break change
/// observation for every subsequent event — so only task plumbing errors
/// appear here.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// The observer task panicked or was cancelled out from under us.
    #[error("observer task join failure: {0}")]
    Join(String),
}
