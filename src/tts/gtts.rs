//! Google Translate text-to-speech backend.
//!
//! Text is split into chunks of at most [`MAX_CHUNK_CHARS`] characters at
//! word boundaries; each chunk is fetched as MP3 and the chunks are
//! concatenated in order, which MP3 players accept as one stream.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tracing::debug;

use super::{Speaker, SpokenAudio};
use crate::config::GttsConfig;
use crate::error::{ReminderError, Result};

/// Longest text the endpoint accepts per request.
pub const MAX_CHUNK_CHARS: usize = 100;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) medremind";

/// Speaker backed by the Google Translate TTS endpoint.
pub struct GttsSpeaker {
    base_url: String,
    lang: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GttsSpeaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GttsSpeaker")
            .field("base_url", &self.base_url)
            .field("lang", &self.lang)
            .finish()
    }
}

impl GttsSpeaker {
    /// Create a speaker for `base_url` (no trailing slash) and language.
    pub fn new(base_url: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            lang: lang.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from the `[tts.gtts]` config section.
    pub fn from_config(config: &GttsConfig) -> Self {
        Self::new(config.effective_base_url(), config.lang.clone())
    }

    fn chunk_url(&self, chunk: &str, idx: usize, total: usize) -> String {
        format!(
            "{}/translate_tts?ie=UTF-8&client=tw-ob&tl={}&q={}&total={total}&idx={idx}&textlen={}",
            self.base_url,
            urlencoding::encode(&self.lang),
            urlencoding::encode(chunk),
            chunk.chars().count()
        )
    }

    async fn fetch_chunk(&self, chunk: &str, idx: usize, total: usize) -> Result<Bytes> {
        let url = self.chunk_url(chunk, idx, total);
        let response = self
            .client
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| ReminderError::Synthesis(format!("gtts request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReminderError::Synthesis(format!(
                "gtts HTTP {} for chunk {}/{total}",
                status.as_u16(),
                idx + 1
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ReminderError::Synthesis(format!("gtts body read failed: {e}")))?;
        if body.is_empty() {
            return Err(ReminderError::Synthesis(format!(
                "gtts returned no audio for chunk {}/{total}",
                idx + 1
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl Speaker for GttsSpeaker {
    fn name(&self) -> &str {
        "gtts"
    }

    async fn speak(&self, text: &str) -> Result<SpokenAudio> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(ReminderError::Synthesis("nothing to speak".into()));
        }

        let total = chunks.len();
        let mut audio = BytesMut::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let part = self.fetch_chunk(chunk, idx, total).await?;
            debug!("gtts chunk {}/{total}: {} bytes", idx + 1, part.len());
            audio.extend_from_slice(&part);
        }

        Ok(SpokenAudio {
            bytes: audio.freeze(),
            extension: "mp3",
        })
    }
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Breaks at whitespace; a single word longer than `max_chars` is split
/// mid-word. Whitespace runs collapse to one space.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
