//! Trigger definitions and derivation from stored medicines.
//!
//! [`derive`] is a pure function: one trigger per medicine and distinct
//! time-of-day. Malformed times are reported as warnings without affecting
//! any other trigger.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::warn;
use uuid::Uuid;

use crate::error::ReminderError;
use crate::store::Medicine;

/// A wall-clock time of day with minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    /// Hour of day (0-23, local time).
    pub hour: u8,
    /// Minute of hour (0-59).
    pub min: u8,
}

impl TimeOfDay {
    /// Parse `H:MM` or `HH:MM`. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns a short reason when the value is not a valid clock time.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let value = raw.trim();
        let (hour, min) = value
            .split_once(':')
            .ok_or_else(|| "expected HH:MM".to_owned())?;

        let hour = parse_component(hour, "hour")?;
        let min = parse_component(min, "minute")?;
        if hour > 23 {
            return Err(format!("hour {hour} out of range 0-23"));
        }
        if min > 59 {
            return Err(format!("minute {min} out of range 0-59"));
        }
        Ok(Self { hour, min })
    }

    /// The time as a [`NaiveTime`].
    pub fn as_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.min), 0)
            .unwrap_or(NaiveTime::MIN)
    }

    /// This time on `date`.
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.as_naive_time())
    }

    /// First occurrence of this time at or after `earliest`.
    pub fn next_occurrence(self, earliest: NaiveDateTime) -> NaiveDateTime {
        let candidate = self.on(earliest.date());
        if candidate >= earliest {
            candidate
        } else {
            candidate + Duration::days(1)
        }
    }
}

fn parse_component(part: &str, what: &str) -> Result<u8, String> {
    if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid {what} {part:?}"));
    }
    part.parse::<u8>()
        .map_err(|e| format!("invalid {what} {part:?}: {e}"))
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.min)
    }
}

/// Identity of a trigger: one medicine at one time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriggerKey {
    pub medicine_id: Uuid,
    pub time: TimeOfDay,
}

impl std::fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "reminder-{}-{}", self.medicine_id, self.time)
    }
}

/// A daily recurring trigger with the medicine snapshot it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub key: TriggerKey,
    /// Copy of the medicine at derivation time.
    pub medicine: Medicine,
}

/// Result of deriving triggers from a set of medicines.
#[derive(Debug, Default)]
pub struct Derivation {
    /// Target trigger set.
    pub triggers: BTreeMap<TriggerKey, Trigger>,
    /// One [`ReminderError::Schedule`] per skipped time entry.
    pub warnings: Vec<ReminderError>,
}

/// Compute the target trigger set for `medicines`.
///
/// Duplicate `(medicine, time)` pairs collapse to one trigger; `9:00` and
/// `09:00` are the same time.
pub fn derive(medicines: &[Medicine]) -> Derivation {
    let mut derivation = Derivation::default();

    for medicine in medicines {
        for raw in &medicine.times {
            match TimeOfDay::parse(raw) {
                Ok(time) => {
                    let key = TriggerKey {
                        medicine_id: medicine.id,
                        time,
                    };
                    derivation.triggers.insert(
                        key,
                        Trigger {
                            key,
                            medicine: medicine.clone(),
                        },
                    );
                }
                Err(reason) => {
                    let err = ReminderError::Schedule {
                        medicine_id: medicine.id,
                        medicine_name: medicine.name.clone(),
                        value: raw.clone(),
                        reason,
                    };
                    warn!("skipping trigger: {err}");
                    derivation.warnings.push(err);
                }
            }
        }
    }

    derivation
}
