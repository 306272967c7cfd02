//! # hordebond-engine
//!
//! Delta calculator, digest-gated modifier writer, and the sync
//! orchestrator that arbitrates direction, guards re-entrancy, and runs the
//! batch sweeps.
//!
//! Construct one [`Orchestrator`] per process against the host substrate
//! and drive it directly (`link_horde`, `sync_all`) or through the change
//! observer in `hordebond-observer`.

pub mod delta;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod writer;

pub use error::EngineError;
pub use guard::{SyncGuard, SyncPermit};
pub use orchestrator::Orchestrator;
pub use writer::WriteOutcome;
