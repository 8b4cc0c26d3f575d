//! Reconciliation: bring the scheduler in line with the stored medicines.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{ReminderError, Result};
use crate::reminder::{ReminderContext, ReminderJob};
use crate::scheduler::runner::{Binding, JobScheduler};
use crate::scheduler::trigger::derive;

/// Outcome of one reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Triggers installed after the pass. Zero while the scheduler is stopped.
    pub installed: usize,
    /// Time entries skipped because they could not be parsed.
    pub warnings: Vec<ReminderError>,
}

/// Derives triggers from the store and installs them.
#[derive(Debug, Clone)]
pub struct Reconciler {
    ctx: Arc<ReminderContext>,
    scheduler: JobScheduler,
    /// Held for a whole load-derive-install pass.
    pass: Arc<Mutex<()>>,
}

impl Reconciler {
    pub fn new(ctx: Arc<ReminderContext>, scheduler: JobScheduler) -> Self {
        Self {
            ctx,
            scheduler,
            pass: Arc::new(Mutex::new(())),
        }
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    pub fn context(&self) -> &Arc<ReminderContext> {
        &self.ctx
    }

    /// Load, derive and atomically install the full trigger set.
    ///
    /// Passes are serialized, so a pass that finishes later always installs
    /// a store snapshot no older than any earlier pass. Nothing is installed
    /// while the scheduler is stopped. Blocks on store I/O; async callers
    /// run it on the blocking pool.
    ///
    /// # Errors
    ///
    /// Store load failures and scheduler installation failures. Malformed
    /// time entries are reported in [`ReconcileReport::warnings`] instead.
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        let _pass = self.pass.lock().unwrap_or_else(PoisonError::into_inner);

        let data = self.ctx.store.load()?;
        let derivation = derive(&data.medicines);

        if !self.scheduler.is_running() {
            debug!(
                medicines = data.medicines.len(),
                "scheduler stopped, nothing installed"
            );
            return Ok(ReconcileReport {
                installed: 0,
                warnings: derivation.warnings,
            });
        }

        let bindings: Vec<Binding> = derivation
            .triggers
            .into_values()
            .map(|trigger| {
                let job = ReminderJob::new(trigger.medicine.clone(), Arc::clone(&self.ctx));
                Binding {
                    trigger,
                    job: Arc::new(job),
                }
            })
            .collect();
        let installed = self.scheduler.replace_all(bindings)?;

        debug!(
            medicines = data.medicines.len(),
            installed,
            skipped = derivation.warnings.len(),
            "reconciled"
        );
        Ok(ReconcileReport {
            installed,
            warnings: derivation.warnings,
        })
    }

    /// Reconcile every `interval` until `cancel` fires.
    ///
    /// Each sweep runs on the blocking pool; errors and panics are logged and
    /// the loop carries on with the next interval.
    pub fn spawn_periodic(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("periodic reconciliation every {interval:?}");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let reconciler = Arc::clone(&self);
                        let sweep = tokio::task::spawn_blocking(move || reconciler.reconcile());
                        match sweep.await {
                            Ok(Ok(report)) => {
                                debug!(installed = report.installed, "periodic reconcile done");
                            }
                            Ok(Err(e)) => warn!("periodic reconcile failed: {e}"),
                            Err(e) if e.is_panic() => error!("periodic reconcile panicked"),
                            Err(e) => warn!("periodic reconcile cancelled: {e}"),
                        }
                    }
                }
            }
            info!("periodic reconciliation stopped");
        })
    }
}
