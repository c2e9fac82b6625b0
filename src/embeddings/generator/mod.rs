#[cfg(test)]
mod tests;

use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::embeddings::{Embedder, Embedding, EmbeddingSource, fallback};
use crate::groq::{ChatMessage, GroqClient};

const EMBED_SYSTEM_PROMPT: &str = "Convert the following text into a numerical representation. \
    Return only numbers separated by commas, exactly 768 values.";
const EMBED_MAX_TOKENS: u32 = 1000;
const EMBED_TEMPERATURE: f32 = 0.1;

/// Maps text to fixed-length vectors, degrading silently from the remote
/// path to the deterministic hash embedding. Never returns an error to the
/// caller; retrieval must not be blocked by an unreachable provider.
#[derive(Debug, Clone)]
pub struct EmbeddingGenerator {
    dimension: usize,
    batch_delay: Duration,
    remote: Option<GroqClient>,
}

impl EmbeddingGenerator {
    #[inline]
    pub fn new(config: &Config) -> Self {
        let remote = Config::groq_api_key().map(|key| GroqClient::new(config, key));
        if remote.is_none() {
            warn!("GROQ_API_KEY not found, embeddings will use the local fallback path");
        }

        Self {
            dimension: config.embedding.dimension,
            batch_delay: Duration::from_millis(config.embedding.batch_delay_ms),
            remote,
        }
    }

    /// Generator pinned to the deterministic local path, regardless of
    /// environment. Used by tests and offline operation.
    #[inline]
    pub fn fallback_only(dimension: usize) -> Self {
        Self {
            dimension,
            batch_delay: Duration::ZERO,
            remote: None,
        }
    }

    #[inline]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Groq exposes completions only, not embeddings; a successful round
    /// trip selects the richer feature vector for this text.
    fn remote_embed(&self, text: &str) -> Option<Vec<f32>> {
        let client = self.remote.as_ref()?;

        let messages = [
            ChatMessage::system(EMBED_SYSTEM_PROMPT),
            ChatMessage::user(text),
        ];

        match client.chat(&messages, EMBED_MAX_TOKENS, EMBED_TEMPERATURE) {
            Ok(_) => Some(fallback::feature_embedding(text, self.dimension)),
            Err(error) => {
                warn!("Remote embedding failed, degrading to fallback: {:#}", error);
                None
            }
        }
    }
}

impl Embedder for EmbeddingGenerator {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn embed(&self, text: &str) -> Embedding {
        if let Some(vector) = self.remote_embed(text) {
            return Embedding {
                vector,
                source: EmbeddingSource::Remote,
            };
        }

        Embedding {
            vector: fallback::hash_embedding(text, self.dimension),
            source: EmbeddingSource::Fallback,
        }
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Vec<Embedding> {
        debug!("Generating embeddings for {} texts", texts.len());

        let mut embeddings = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            // Courtesy delay between consecutive remote calls only.
            if i > 0 && self.remote.is_some() && !self.batch_delay.is_zero() {
                std::thread::sleep(self.batch_delay);
            }
            embeddings.push(self.embed(text));
        }

        embeddings
    }
}
