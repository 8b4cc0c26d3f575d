//! Job scheduler background loop.
//!
//! Holds the live set of trigger bindings and spawns a tokio task that
//! periodically checks for due occurrences and fires their jobs. Each job
//! runs on its own task so a slow or failing job never stalls the loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{ReminderError, Result};
use crate::scheduler::trigger::{Trigger, TriggerKey};

/// Unit of work bound to a trigger.
#[async_trait]
pub trait TriggerJob: Send + Sync {
    /// Execute the occurrence that was due at `due` (local time).
    async fn run(&self, due: NaiveDateTime) -> Result<()>;
}

/// A trigger together with the job it fires.
#[derive(Clone)]
pub struct Binding {
    pub trigger: Trigger,
    pub job: Arc<dyn TriggerJob>,
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.trigger.key)
            .finish_non_exhaustive()
    }
}

/// A job handed to its own task during a tick.
#[derive(Debug)]
pub struct Dispatched {
    pub key: TriggerKey,
    /// Completes once the job and its error reporting are done.
    pub handle: JoinHandle<()>,
}

/// Snapshot of one installed trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledTrigger {
    pub key: TriggerKey,
    pub medicine_name: String,
    /// Next pending occurrence (local time).
    pub next_due: NaiveDateTime,
}

struct Installed {
    binding: Binding,
    next_due: NaiveDateTime,
}

#[derive(Default)]
struct SchedulerState {
    bindings: HashMap<TriggerKey, Installed>,
    /// Present while the timing loop runs.
    loop_cancel: Option<CancellationToken>,
}

struct Inner {
    state: Mutex<SchedulerState>,
    tick_interval: Duration,
    misfire_grace: chrono::Duration,
}

/// Daily-trigger job scheduler.
///
/// Cheap to clone; all clones share the same trigger set.
#[derive(Clone)]
pub struct JobScheduler {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobScheduler")
            .field("running", &self.is_running())
            .field("triggers", &self.len())
            .finish()
    }
}

impl JobScheduler {
    /// Create a stopped scheduler.
    ///
    /// `tick_interval` is how often the loop looks for due triggers;
    /// `misfire_grace` is how late an occurrence may be seen and still fire.
    pub fn new(tick_interval: Duration, misfire_grace: Duration) -> Self {
        let misfire_grace =
            chrono::Duration::from_std(misfire_grace).unwrap_or(chrono::Duration::zero());
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SchedulerState::default()),
                tick_interval,
                misfire_grace,
            }),
        }
    }

    /// Build from the `[scheduler]` config section.
    pub fn from_config(config: &crate::config::SchedulerConfig) -> Self {
        Self::new(config.tick_interval(), config.misfire_grace())
    }

    /// Start the timing loop. Returns `false` if it was already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let cancel = {
            let mut state = self.lock();
            if state.loop_cancel.is_some() {
                return false;
            }
            let cancel = CancellationToken::new();
            state.loop_cancel = Some(cancel.clone());
            cancel
        };

        let scheduler = self.clone();
        let tick_interval = self.inner.tick_interval;
        tokio::spawn(async move {
            info!("job scheduler started (tick every {tick_interval:?})");
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        scheduler.tick_at(Local::now().naive_local());
                    }
                }
            }
            info!("job scheduler stopped");
        });
        true
    }

    /// Stop the timing loop. Installed bindings are kept.
    pub fn stop(&self) {
        if let Some(cancel) = self.lock().loop_cancel.take() {
            cancel.cancel();
        }
    }

    /// Returns `true` while the timing loop is running.
    pub fn is_running(&self) -> bool {
        self.lock().loop_cancel.is_some()
    }

    /// Atomically replace every installed binding.
    ///
    /// Returns the number of installed triggers.
    ///
    /// # Errors
    ///
    /// [`ReminderError::Scheduler`] if the scheduler is not running.
    pub fn replace_all(&self, bindings: Vec<Binding>) -> Result<usize> {
        self.replace_all_at(bindings, Local::now().naive_local())
    }

    /// [`replace_all`](Self::replace_all) evaluated at an explicit local time.
    ///
    /// Keys already installed keep their pending occurrence, so replacing
    /// with an identical set changes nothing. New keys are armed for their
    /// first occurrence no older than the misfire grace. A key listed twice
    /// keeps the last binding.
    ///
    /// # Errors
    ///
    /// [`ReminderError::Scheduler`] if the scheduler is not running.
    pub fn replace_all_at(&self, bindings: Vec<Binding>, now: NaiveDateTime) -> Result<usize> {
        let mut state = self.lock();
        if state.loop_cancel.is_none() {
            return Err(ReminderError::Scheduler(
                "cannot install triggers while stopped".into(),
            ));
        }

        let earliest = now - self.inner.misfire_grace;
        let mut next: HashMap<TriggerKey, Installed> = HashMap::with_capacity(bindings.len());
        for binding in bindings {
            let key = binding.trigger.key;
            let next_due = match next.get(&key).or_else(|| state.bindings.get(&key)) {
                Some(existing) => existing.next_due,
                None => key.time.next_occurrence(earliest),
            };
            next.insert(key, Installed { binding, next_due });
        }

        let removed = state
            .bindings
            .keys()
            .filter(|k| !next.contains_key(k))
            .count();
        let added = next
            .keys()
            .filter(|k| !state.bindings.contains_key(k))
            .count();
        state.bindings = next;

        debug!(
            installed = state.bindings.len(),
            added, removed, "replaced trigger set"
        );
        Ok(state.bindings.len())
    }

    /// Evaluate due triggers at `now` and dispatch their jobs.
    ///
    /// Each occurrence is dispatched at most once. Occurrences later than
    /// the misfire grace are skipped. Must be called within a tokio runtime.
    pub fn tick_at(&self, now: NaiveDateTime) -> Vec<Dispatched> {
        let due: Vec<(TriggerKey, Arc<dyn TriggerJob>, NaiveDateTime)> = {
            let mut state = self.lock();
            let mut due = Vec::new();
            for (key, installed) in state.bindings.iter_mut() {
                if installed.next_due > now {
                    continue;
                }
                let lateness = now - installed.next_due;
                if lateness > self.inner.misfire_grace {
                    warn!(
                        "{key} missed its {} occurrence by {}s, skipping",
                        installed.next_due,
                        lateness.num_seconds()
                    );
                } else {
                    due.push((*key, Arc::clone(&installed.binding.job), installed.next_due));
                }
                installed.next_due = key.time.next_occurrence(now + chrono::Duration::seconds(1));
            }
            due
        };

        due.into_iter()
            .map(|(key, job, due)| {
                info!("firing {key} due {due}");
                Dispatched {
                    key,
                    handle: spawn_job(key, job, due),
                }
            })
            .collect()
    }

    /// Snapshot of installed triggers ordered by key.
    pub fn bindings(&self) -> Vec<InstalledTrigger> {
        let state = self.lock();
        let mut out: Vec<InstalledTrigger> = state
            .bindings
            .iter()
            .map(|(key, installed)| InstalledTrigger {
                key: *key,
                medicine_name: installed.binding.trigger.medicine.name.clone(),
                next_due: installed.next_due,
            })
            .collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }

    /// Number of installed triggers.
    pub fn len(&self) -> usize {
        self.lock().bindings.len()
    }

    /// Returns `true` when no trigger is installed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run `job` on its own task and report its outcome.
fn spawn_job(key: TriggerKey, job: Arc<dyn TriggerJob>, due: NaiveDateTime) -> JoinHandle<()> {
    tokio::spawn(async move {
        let run = tokio::spawn(async move { job.run(due).await });
        match run.await {
            Ok(Ok(())) => debug!("{key} finished"),
            Ok(Err(e)) => warn!("{key} failed: {e}"),
            Err(e) if e.is_panic() => error!("{key} panicked"),
            Err(e) => warn!("{key} was cancelled: {e}"),
        }
    })
}
