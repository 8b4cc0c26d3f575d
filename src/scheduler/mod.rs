//! Daily reminder scheduling.
//!
//! [`derive`] turns stored medicines into triggers, [`JobScheduler`] fires
//! them at their time of day, and [`Reconciler`] keeps the two in sync.

pub mod reconcile;
pub mod runner;
pub mod trigger;

pub use reconcile::{ReconcileReport, Reconciler};
pub use runner::{Binding, Dispatched, InstalledTrigger, JobScheduler, TriggerJob};
pub use trigger::{Derivation, TimeOfDay, Trigger, TriggerKey, derive};
