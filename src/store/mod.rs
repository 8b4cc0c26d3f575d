//! Durable medicine and reminder-history storage.
//!
//! The whole store is a single JSON document holding two sequences,
//! `medicines` and `history`. Every read-modify-write goes through
//! [`MedicineStore::update`], which serializes access with one lock.

pub mod file_store;
pub mod types;

pub use file_store::MedicineStore;
pub use types::{HistoryEntry, Medicine, NewMedicine, StoreData, parse_times_list};

use crate::error::{ReminderError, Result};

/// Run blocking store work on tokio's blocking pool.
///
/// # Errors
///
/// The closure's own error, or [`ReminderError::Scheduler`] if the task
/// panicked or was cancelled.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ReminderError::Scheduler(format!("blocking store task failed: {e}")))?
}
