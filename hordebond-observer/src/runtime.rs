//! Observer runtime: event intake and the shared debounce timer.
//!
//! One select loop owns the whole schedule: a qualifying event replaces the
//! pending sync and restarts the single trailing-edge timer; the timer
//! firing runs whatever is pending at that moment (last writer wins). The
//! loop ends on the shutdown broadcast or when the event feed closes —
//! teardown is structural, there is no hook bookkeeping to undo.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use hordebond_core::UpdateEvent;
use hordebond_engine::Orchestrator;

use crate::classify::{classify, PendingSync};
use crate::config::ObserverConfig;
use crate::error::ObserverError;

/// Handle to a spawned observer. Dropping it leaves the task running;
/// [`ObserverHandle::shutdown`] stops it and waits for the loop to exit.
pub struct ObserverHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl ObserverHandle {
    /// Signal the loop and wait for it to finish. Cancels any pending
    /// debounced sync that has not fired yet.
    pub async fn shutdown(self) -> Result<(), ObserverError> {
        let _ = self.shutdown_tx.send(());
        self.task
            .await
            .map_err(|err| ObserverError::Join(err.to_string()))
    }
}

/// Spawn the observer loop onto the current tokio runtime.
pub fn spawn(
    orchestrator: Arc<Orchestrator>,
    events: mpsc::UnboundedReceiver<UpdateEvent>,
    config: ObserverConfig,
) -> ObserverHandle {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(run(orchestrator, events, config, shutdown_rx));
    ObserverHandle { shutdown_tx, task }
}

/// Run the observer loop until shutdown or a closed event feed.
pub async fn run(
    orchestrator: Arc<Orchestrator>,
    mut events: mpsc::UnboundedReceiver<UpdateEvent>,
    config: ObserverConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let config = config.clamped();
    let debounce = config.debounce();

    let mut pending: Option<PendingSync> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        // Copy the deadline out so the timer future holds no borrow on it;
        // both handlers below reassign it. A dormant timer parks forever.
        let armed_at = deadline;
        let timer = async move {
            match armed_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::debug!("observer shutdown, pending sync discarded");
                break;
            }
            maybe = events.recv() => {
                let Some(event) = maybe else {
                    tracing::debug!("event feed closed, observer exiting");
                    break;
                };
                let Some(next) = classify(
                    orchestrator.store().as_ref(),
                    orchestrator.local_user(),
                    &event,
                ) else {
                    continue;
                };
                if let Some(previous) = pending.replace(next) {
                    tracing::debug!(?previous, "superseding pending sync");
                }
                deadline = Some(Instant::now() + debounce);
            }
            _ = timer => {
                deadline = None;
                if let Some(target) = pending.take() {
                    fire(&orchestrator, target);
                }
            }
        }
    }
}

/// Run one debounced sync. A target that is mid-sync when the timer fires
/// is skipped, never queued — the orchestrator's guard refuses it.
fn fire(orchestrator: &Orchestrator, target: PendingSync) {
    match target {
        PendingSync::Fanout { summoner } => {
            let hordes = orchestrator.find_linked_hordes(&summoner);
            let total = hordes.len();
            let mut synced = 0;
            for horde in &hordes {
                if orchestrator.sync_summoner_to_horde(&summoner, horde) {
                    synced += 1;
                }
            }
            tracing::debug!(summoner = %summoner, synced, total, "debounced fan-out complete");
        }
        PendingSync::HordeHp { horde } => {
            let Some(summoner) = orchestrator.find_linked_summoner(&horde) else {
                tracing::debug!(horde = %horde, "bond vanished before the timer fired");
                return;
            };
            if !orchestrator.sync_horde_to_summoner(&horde, &summoner) {
                tracing::debug!(horde = %horde, "debounced hp sync skipped");
            }
        }
    }
}

/// Install the tracing subscriber the way the host expects: `RUST_LOG`
/// wins, otherwise info when logging is enabled, warnings only when not.
pub fn init_tracing(config: &ObserverConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if config.logging { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
