//! In-memory host substrate for driving the sync engine in tests.
//!
//! [`MemoryHost`] implements the consumed host interfaces;
//! [`RecordingNotifier`] captures user-facing messages for assertions.

pub mod host;
pub mod notify;

pub use host::{EntityBuilder, MemoryHost};
pub use notify::{Level, RecordingNotifier};
