//! Observer configuration — the two values read from the host's settings
//! registry, with static defaults and hard bounds.

use std::time::Duration;

pub const DEFAULT_DEBOUNCE_MS: u64 = 250;
pub const MIN_DEBOUNCE_MS: u64 = 50;
pub const MAX_DEBOUNCE_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverConfig {
    /// Trailing-edge debounce delay in milliseconds.
    pub debounce_ms: u64,
    /// Whether the observer installs its tracing subscriber at info level.
    pub logging: bool,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            logging: true,
        }
    }
}

impl ObserverConfig {
    /// Copy with the debounce delay forced into its bounds. Host settings
    /// are user input; out-of-range values clamp instead of failing.
    pub fn clamped(self) -> Self {
        Self {
            debounce_ms: self.debounce_ms.clamp(MIN_DEBOUNCE_MS, MAX_DEBOUNCE_MS),
            ..self
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
