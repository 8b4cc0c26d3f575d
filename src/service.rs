//! Reminder service: the one object a front end talks to.
//!
//! Owns the store, the scheduler and the periodic reconciliation task.
//! Once started, every mutation is followed by a reconciliation so the
//! scheduler reflects the store by the time the call returns.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ReminderConfig, SchedulerConfig};
use crate::error::{ReminderError, Result};
use crate::reminder::{ReminderContext, ReminderJob};
use crate::scheduler::{InstalledTrigger, JobScheduler, ReconcileReport, Reconciler};
use crate::store::{self, HistoryEntry, Medicine, MedicineStore, NewMedicine};
use crate::tts::build_speaker;

struct Periodic {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Medicine reminder service.
pub struct ReminderService {
    reconciler: Arc<Reconciler>,
    reconcile_interval: Duration,
    periodic: Mutex<Option<Periodic>>,
}

impl std::fmt::Debug for ReminderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderService")
            .field("reconciler", &self.reconciler)
            .field("reconcile_interval", &self.reconcile_interval)
            .finish_non_exhaustive()
    }
}

impl ReminderService {
    /// Build the service from configuration. Nothing is scheduled until
    /// [`start`](Self::start); mutations before that only touch the store.
    pub fn new(config: &ReminderConfig) -> Self {
        let ctx = ReminderContext {
            store: Arc::new(MedicineStore::new(config.store.path.clone())),
            speaker: build_speaker(&config.tts),
            audio_dir: config.tts.audio_dir.clone(),
            speak_timeout: config.tts.timeout(),
            respect_date_range: config.scheduler.respect_date_range,
        };
        Self::with_context(ctx, &config.scheduler)
    }

    /// Build from an explicit job context, e.g. with a custom speaker.
    pub fn with_context(ctx: ReminderContext, scheduler: &SchedulerConfig) -> Self {
        let reconciler = Reconciler::new(Arc::new(ctx), JobScheduler::from_config(scheduler));
        Self {
            reconciler: Arc::new(reconciler),
            reconcile_interval: scheduler.reconcile_interval(),
            periodic: Mutex::new(None),
        }
    }

    fn store(&self) -> Arc<MedicineStore> {
        Arc::clone(&self.reconciler.context().store)
    }

    /// The underlying scheduler.
    pub fn scheduler(&self) -> &JobScheduler {
        self.reconciler.scheduler()
    }

    /// Start the timing loop, install the current trigger set and start
    /// periodic reconciliation.
    ///
    /// Calling it again only reconciles.
    ///
    /// # Errors
    ///
    /// Errors from the initial reconciliation.
    pub async fn start(&self) -> Result<ReconcileReport> {
        self.scheduler().start();
        let report = self.reconcile().await?;

        let mut periodic = self.periodic.lock().unwrap_or_else(PoisonError::into_inner);
        if periodic.is_none() {
            let cancel = CancellationToken::new();
            let handle = Arc::clone(&self.reconciler)
                .spawn_periodic(self.reconcile_interval, cancel.clone());
            *periodic = Some(Periodic { cancel, handle });
            info!(triggers = report.installed, "reminder service started");
        }
        Ok(report)
    }

    /// Stop periodic reconciliation and the timing loop.
    ///
    /// Jobs already dispatched run to completion on their own tasks.
    pub async fn shutdown(&self) {
        let periodic = self
            .periodic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Periodic { cancel, handle }) = periodic {
            cancel.cancel();
            if let Err(e) = handle.await {
                warn!("periodic reconciliation ended abnormally: {e}");
            }
        }
        self.scheduler().stop();
        info!("reminder service stopped");
    }

    /// Reconcile now and log every skipped time entry.
    ///
    /// Installs nothing until [`start`](Self::start) has been called.
    ///
    /// # Errors
    ///
    /// Store and scheduler failures.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let reconciler = Arc::clone(&self.reconciler);
        let report = store::blocking(move || reconciler.reconcile()).await?;
        for warning in &report.warnings {
            warn!("{warning}");
        }
        Ok(report)
    }

    /// Validate and store a new medicine, then reconcile.
    ///
    /// # Errors
    ///
    /// [`ReminderError::Validation`] for bad input, otherwise store and
    /// reconciliation failures.
    pub async fn add_medicine(&self, new: NewMedicine) -> Result<Uuid> {
        let medicine = new.into_medicine()?;
        if medicine.start_date > medicine.end_date {
            warn!(
                "medicine '{}' starts {} after it ends {}",
                medicine.name, medicine.start_date, medicine.end_date
            );
        }

        let id = medicine.id;
        let name = medicine.name.clone();
        let data_store = self.store();
        store::blocking(move || {
            data_store.update(|data| {
                data.medicines.push(medicine);
                Ok(())
            })
        })
        .await?;
        info!(%id, "added medicine '{name}'");

        self.reconcile().await?;
        Ok(id)
    }

    /// Remove a medicine and its triggers. History is untouched.
    ///
    /// # Errors
    ///
    /// [`ReminderError::NotFound`] for an unknown id, otherwise store and
    /// reconciliation failures.
    pub async fn delete_medicine(&self, id: Uuid) -> Result<Medicine> {
        let data_store = self.store();
        let removed = store::blocking(move || {
            data_store.update(|data| {
                data.remove_medicine(id)
                    .ok_or_else(|| ReminderError::NotFound(id.to_string()))
            })
        })
        .await?;
        info!(%id, "deleted medicine '{}'", removed.name);

        self.reconcile().await?;
        Ok(removed)
    }

    /// Fire a reminder immediately, ignoring its schedule and date window.
    ///
    /// With no id the first stored medicine is used.
    ///
    /// # Errors
    ///
    /// [`ReminderError::NotFound`] when there is no such medicine, otherwise
    /// store failures.
    pub async fn trigger_now(&self, id: Option<Uuid>) -> Result<HistoryEntry> {
        let data_store = self.store();
        let data = store::blocking(move || data_store.load()).await?;
        let medicine = match id {
            Some(id) => data.medicine(id).cloned(),
            None => data.medicines.first().cloned(),
        }
        .ok_or_else(|| {
            ReminderError::NotFound(
                id.map_or_else(|| "no medicines stored".to_owned(), |id| id.to_string()),
            )
        })?;

        info!(medicine = %medicine.name, "manual trigger");
        ReminderJob::new(medicine, Arc::clone(self.reconciler.context()))
            .fire()
            .await
    }

    /// All stored medicines in insertion order.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn list_medicines(&self) -> Result<Vec<Medicine>> {
        let data_store = self.store();
        Ok(store::blocking(move || data_store.load()).await?.medicines)
    }

    /// Up to `limit` history entries, newest first.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn recent_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let data_store = self.store();
        Ok(store::blocking(move || data_store.load())
            .await?
            .recent_history(limit))
    }

    /// Installed triggers and their next due time.
    pub fn bindings(&self) -> Vec<InstalledTrigger> {
        self.scheduler().bindings()
    }
}
