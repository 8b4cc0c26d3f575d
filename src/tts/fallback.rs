//! Ordered fallback chain of speech backends.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Speaker, SpokenAudio};
use crate::error::{ReminderError, Result};

/// Tries each speaker in order and returns the first success.
///
/// Each backend gets exactly one attempt per request; there are no retries.
pub struct FallbackSpeaker {
    speakers: Vec<Arc<dyn Speaker>>,
}

impl FallbackSpeaker {
    /// Create a chain; the first speaker is tried first.
    pub fn new(speakers: Vec<Arc<dyn Speaker>>) -> Self {
        Self { speakers }
    }

    /// Number of speakers in the chain.
    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    /// Returns `true` if the chain has no speakers.
    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }
}

#[async_trait]
impl Speaker for FallbackSpeaker {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn speak(&self, text: &str) -> Result<SpokenAudio> {
        let mut failures = Vec::with_capacity(self.speakers.len());

        for (idx, speaker) in self.speakers.iter().enumerate() {
            match speaker.speak(text).await {
                Ok(audio) => {
                    if idx > 0 {
                        info!(speaker = speaker.name(), "fallback speaker succeeded");
                    }
                    return Ok(audio);
                }
                Err(e) => {
                    warn!(speaker = speaker.name(), error = %e, "speaker failed, trying next");
                    failures.push(format!("{}: {e}", speaker.name()));
                }
            }
        }

        if failures.is_empty() {
            return Err(ReminderError::Synthesis("no speakers configured".into()));
        }
        Err(ReminderError::Synthesis(format!(
            "all speakers failed ({})",
            failures.join("; ")
        )))
    }
}
