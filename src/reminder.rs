//! Reminder job: announce a medicine and record the firing.
//!
//! A firing always appends exactly one [`HistoryEntry`]. Speech failures
//! are recorded on the entry and never fail the firing itself.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ReminderError, Result};
use crate::scheduler::runner::TriggerJob;
use crate::store::{self, HistoryEntry, Medicine, MedicineStore};
use crate::tts::Speaker;

/// Text stored on the history entry.
pub fn reminder_message(medicine: &Medicine) -> String {
    format!(
        "Reminder: time to take your medicine {}. Dose: {}",
        medicine.name, medicine.dose
    )
}

/// Text handed to the speaker.
pub fn spoken_text(medicine: &Medicine) -> String {
    format!(
        "Hello. This is your medicine reminder. It's time to take {}. {}. \
         Take it now and you will feel better.",
        medicine.name, medicine.dose
    )
}

/// Collaborators shared by every reminder job.
pub struct ReminderContext {
    pub store: Arc<MedicineStore>,
    pub speaker: Arc<dyn Speaker>,
    /// Where audio files are written.
    pub audio_dir: PathBuf,
    /// Upper bound on one synthesis call.
    pub speak_timeout: Duration,
    /// Skip scheduled firings outside the medicine's date window.
    pub respect_date_range: bool,
}

impl std::fmt::Debug for ReminderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderContext")
            .field("store", &self.store.path())
            .field("speaker", &self.speaker.name())
            .field("audio_dir", &self.audio_dir)
            .field("speak_timeout", &self.speak_timeout)
            .field("respect_date_range", &self.respect_date_range)
            .finish()
    }
}

/// One medicine's reminder, bound to a snapshot of that medicine.
#[derive(Debug, Clone)]
pub struct ReminderJob {
    medicine: Medicine,
    ctx: Arc<ReminderContext>,
}

impl ReminderJob {
    pub fn new(medicine: Medicine, ctx: Arc<ReminderContext>) -> Self {
        Self { medicine, ctx }
    }

    /// The medicine snapshot this job announces.
    pub fn medicine(&self) -> &Medicine {
        &self.medicine
    }

    /// Fire now, regardless of the date window.
    ///
    /// # Errors
    ///
    /// Only store failures are returned; speech failures end up on the entry.
    pub async fn fire(&self) -> Result<HistoryEntry> {
        self.fire_at(Local::now().naive_local()).await
    }

    /// Fire with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Only store failures are returned; speech failures end up on the entry.
    pub async fn fire_at(&self, time: NaiveDateTime) -> Result<HistoryEntry> {
        let id = Uuid::new_v4();
        let (audio, error) = match self.synthesize(id).await {
            Ok(path) => (Some(path), None),
            Err(e) => {
                warn!(medicine = %self.medicine.name, "no reminder audio: {e}");
                (None, Some(e.to_string()))
            }
        };

        let entry = HistoryEntry {
            id,
            med_id: self.medicine.id,
            med_name: self.medicine.name.clone(),
            time,
            message: reminder_message(&self.medicine),
            audio,
            error,
        };

        let history = Arc::clone(&self.ctx.store);
        let record = entry.clone();
        store::blocking(move || {
            history.update(|data| {
                data.history.push(record);
                Ok(())
            })
        })
        .await?;

        info!(medicine = %entry.med_name, entry = %entry.id, "reminder recorded");
        Ok(entry)
    }

    /// Speak the reminder and write the audio file. Returns the file path.
    async fn synthesize(&self, entry_id: Uuid) -> Result<String> {
        let text = spoken_text(&self.medicine);
        let timeout = self.ctx.speak_timeout;

        let audio = tokio::time::timeout(timeout, self.ctx.speaker.speak(&text))
            .await
            .map_err(|_| {
                ReminderError::Synthesis(format!(
                    "{} timed out after {}s",
                    self.ctx.speaker.name(),
                    timeout.as_secs_f32()
                ))
            })??;

        tokio::fs::create_dir_all(&self.ctx.audio_dir).await?;
        let path = self
            .ctx
            .audio_dir
            .join(format!("reminder-{entry_id}.{}", audio.extension));
        tokio::fs::write(&path, &audio.bytes).await?;
        debug!("wrote {} bytes of audio to {}", audio.bytes.len(), path.display());

        Ok(path.display().to_string())
    }
}

#[async_trait]
impl TriggerJob for ReminderJob {
    async fn run(&self, due: NaiveDateTime) -> Result<()> {
        // The window applies to the occurrence, not to when it got dispatched.
        if self.ctx.respect_date_range && !self.medicine.is_active_on(due.date()) {
            info!(
                medicine = %self.medicine.name,
                "{due} is outside {}..={}, skipping reminder",
                self.medicine.start_date,
                self.medicine.end_date
            );
            return Ok(());
        }
        self.fire().await.map(|_| ())
    }
}
