//! Error types for the reminder scheduler.

use uuid::Uuid;

/// Top-level error type for medicine storage, scheduling and reminders.
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    /// Store file or audio artifact could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted data is not valid JSON or does not match the expected shape.
    #[error("format error: {0}")]
    Format(String),

    /// A medicine's time-of-day entry could not be turned into a trigger.
    #[error("schedule error for medicine '{medicine_name}' ({medicine_id}): {value:?} {reason}")]
    Schedule {
        /// Offending medicine.
        medicine_id: Uuid,
        /// Display name of the offending medicine.
        medicine_name: String,
        /// The raw time-of-day string.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Text-to-speech synthesis failed.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Job scheduler error (not running, task join failure).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Caller supplied an invalid medicine definition.
    #[error("invalid medicine: {0}")]
    Validation(String),

    /// No medicine with the requested id.
    #[error("medicine not found: {0}")]
    NotFound(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ReminderError>;
