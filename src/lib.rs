//! medremind: a personal medication reminder scheduler.
//!
//! Medicines are stored with their daily dosing times in one JSON file. A
//! background scheduler fires each (medicine, time) trigger once a day,
//! records the firing in the history log and asks a text-to-speech backend
//! for a spoken announcement.
//!
//! # Architecture
//!
//! - **Store** ([`store`]): medicines and history in a single JSON document
//! - **Deriver** ([`scheduler::derive`]): medicines → daily triggers
//! - **Scheduler** ([`scheduler::JobScheduler`]): fires triggers on time
//! - **Reminder job** ([`reminder`]): message, speech, history entry
//! - **Reconciler** ([`scheduler::Reconciler`]): keeps the scheduler in sync
//!   with the store, on every mutation and periodically
//! - **Service** ([`service::ReminderService`]): facade used by the CLI

pub mod app_dirs;
pub mod config;
pub mod error;
pub mod reminder;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod tts;

pub use config::ReminderConfig;
pub use error::{ReminderError, Result};
pub use service::ReminderService;
pub use store::{HistoryEntry, Medicine, NewMedicine};
