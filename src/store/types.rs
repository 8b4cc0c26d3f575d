//! Persisted medicine and history records.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ReminderError, Result};
use crate::scheduler::trigger::TimeOfDay;

/// A medicine with its daily dosing times.
///
/// Medicines are only ever appended or removed, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    /// Assigned at creation, immutable.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Free-text dose or instructions.
    #[serde(default)]
    pub dose: String,
    /// Daily times as `HH:MM` strings, kept verbatim.
    #[serde(default)]
    pub times: Vec<String>,
    /// First day of the course.
    pub start_date: NaiveDate,
    /// Last day of the course. Not required to be after `start_date`.
    pub end_date: NaiveDate,
}

impl Medicine {
    /// Returns `true` if `date` lies inside `[start_date, end_date]`.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Caller input for adding a medicine.
#[derive(Debug, Clone)]
pub struct NewMedicine {
    pub name: String,
    pub dose: String,
    pub times: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl NewMedicine {
    /// Validate the input and assign a fresh id.
    ///
    /// Time entries are trimmed but otherwise stored as typed.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::Validation`] for an empty name, no times,
    /// or a malformed time-of-day.
    pub fn into_medicine(self) -> Result<Medicine> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(ReminderError::Validation("name must not be empty".into()));
        }

        let times: Vec<String> = self
            .times
            .iter()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect();
        if times.is_empty() {
            return Err(ReminderError::Validation(format!(
                "medicine '{name}' needs at least one time"
            )));
        }
        for raw in &times {
            TimeOfDay::parse(raw)
                .map_err(|reason| ReminderError::Validation(format!("time {raw:?}: {reason}")))?;
        }

        Ok(Medicine {
            id: Uuid::new_v4(),
            name,
            dose: self.dose.trim().to_owned(),
            times,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

/// Split a comma-separated list of times, dropping empty items.
pub fn parse_times_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

/// One reminder firing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique per firing.
    pub id: Uuid,
    /// Medicine that fired.
    pub med_id: Uuid,
    /// Medicine name at fire time.
    pub med_name: String,
    /// Local wall-clock firing time.
    pub time: NaiveDateTime,
    /// Human-readable reminder text.
    pub message: String,
    /// Path of the produced audio file, `None` when synthesis failed.
    pub audio: Option<String>,
    /// Why no audio was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The full persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub medicines: Vec<Medicine>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl StoreData {
    /// Look up a medicine by id.
    pub fn medicine(&self, id: Uuid) -> Option<&Medicine> {
        self.medicines.iter().find(|m| m.id == id)
    }

    /// Remove a medicine by id. Returns the removed record.
    ///
    /// History entries referencing it are left untouched.
    pub fn remove_medicine(&mut self, id: Uuid) -> Option<Medicine> {
        let index = self.medicines.iter().position(|m| m.id == id)?;
        Some(self.medicines.remove(index))
    }

    /// History entries, newest first, at most `limit`.
    pub fn recent_history(&self, limit: usize) -> Vec<HistoryEntry> {
        let mut entries = self.history.clone();
        entries.sort_by(|a, b| b.time.cmp(&a.time));
        entries.truncate(limit);
        entries
    }
}
