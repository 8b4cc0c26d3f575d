//! Text-to-speech capability used by reminder jobs.
//!
//! A [`Speaker`] turns text into encoded audio bytes and may fail; callers
//! treat failure as non-fatal. Backends:
//! - [`GttsSpeaker`]: Google Translate TTS over HTTPS (MP3)
//! - [`FallbackSpeaker`]: tries several speakers in order
//! - [`DisabledSpeaker`]: always fails

mod fallback;
mod gtts;

pub use fallback::FallbackSpeaker;
pub use gtts::GttsSpeaker;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::{TtsBackend, TtsConfig};
use crate::error::{ReminderError, Result};

/// Encoded audio produced by a [`Speaker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpokenAudio {
    /// Encoded audio file contents.
    pub bytes: Bytes,
    /// File extension for the encoding, without the dot (e.g. `mp3`).
    pub extension: &'static str,
}

/// Pluggable speech synthesis.
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Synthesize `text`.
    ///
    /// # Errors
    ///
    /// Returns [`ReminderError::Synthesis`] on any backend failure.
    async fn speak(&self, text: &str) -> Result<SpokenAudio>;
}

/// Speaker used when synthesis is turned off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSpeaker;

#[async_trait]
impl Speaker for DisabledSpeaker {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn speak(&self, _text: &str) -> Result<SpokenAudio> {
        Err(ReminderError::Synthesis("speech synthesis disabled".into()))
    }
}

fn backend_speaker(backend: TtsBackend, config: &TtsConfig) -> Arc<dyn Speaker> {
    match backend {
        TtsBackend::Gtts => Arc::new(GttsSpeaker::from_config(&config.gtts)),
        TtsBackend::Disabled => Arc::new(DisabledSpeaker),
    }
}

/// Build the configured speaker, wrapped in a fallback chain when
/// `fallbacks` is non-empty.
pub fn build_speaker(config: &TtsConfig) -> Arc<dyn Speaker> {
    let primary = backend_speaker(config.backend, config);
    if config.fallbacks.is_empty() {
        return primary;
    }

    let mut chain = vec![primary];
    chain.extend(
        config
            .fallbacks
            .iter()
            .map(|backend| backend_speaker(*backend, config)),
    );
    Arc::new(FallbackSpeaker::new(chain))
}
