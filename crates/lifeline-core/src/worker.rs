//! Periodic regeneration in the background.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::habit::{sweep_owner, SweepReport};
use crate::identity::Identity;
use crate::store::HabitStore;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Sweeps the signed-in user's habits every `period` until stopped.
///
/// Sweeps run on the blocking pool; a failed sweep is logged and the next
/// tick tries again. Nothing happens while nobody is signed in.
pub struct RegenerationWorker {
    shutdown: watch::Sender<bool>,
    reports: watch::Receiver<Option<SweepReport>>,
    handle: JoinHandle<()>,
}

impl RegenerationWorker {
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        store: Arc<dyn HabitStore>,
        identity: Identity,
        clock: Arc<dyn Clock>,
        period: Duration,
    ) -> Self {
        let (shutdown, mut stop) = watch::channel(false);
        let (report_tx, reports) = watch::channel(None);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period.max(MIN_PERIOD));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                let Some(user_id) = identity.current() else {
                    debug!("no user signed in, skipping sweep");
                    continue;
                };
                let store = store.clone();
                let now = clock.now_ms();
                let owner = user_id.clone();
                let outcome =
                    tokio::task::spawn_blocking(move || sweep_owner(&*store, &owner, now)).await;
                match outcome {
                    Ok(Ok(report)) => {
                        if !report.regenerated.is_empty() || !report.failed.is_empty() {
                            info!(
                                user_id = %user_id,
                                regenerated = report.regenerated.len(),
                                failed = report.failed.len(),
                                "regeneration sweep finished"
                            );
                        }
                        report_tx.send_replace(Some(report));
                    }
                    Ok(Err(e)) => warn!(user_id = %user_id, error = %e, "regeneration sweep failed"),
                    Err(e) => warn!(user_id = %user_id, error = %e, "regeneration sweep task aborted"),
                }
            }
            debug!("regeneration worker stopped");
        });

        Self {
            shutdown,
            reports,
            handle,
        }
    }

    /// The latest completed sweep, `None` until the first one finishes.
    pub fn subscribe_reports(&self) -> watch::Receiver<Option<SweepReport>> {
        self.reports.clone()
    }

    /// Signal shutdown and wait for the current sweep, if any, to finish.
    pub async fn stop(self) {
        self.shutdown.send_replace(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "regeneration worker ended abnormally");
        }
    }
}
