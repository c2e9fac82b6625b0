// Embeddings module
// Deterministic local embedding plus an optional remote-backed path

pub mod fallback;
pub mod generator;

pub use fallback::{feature_embedding, hash_embedding};
pub use generator::EmbeddingGenerator;

/// Which path produced a vector. Surfaced so callers and tests can pin
/// down the degraded path instead of relying on network failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingSource {
    Remote,
    Fallback,
}

/// A fixed-length vector for one text, tagged with its producing path.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub source: EmbeddingSource,
}

/// Maps text to fixed-length vectors. Implementations must be infallible;
/// degraded output is acceptable, an error is not.
pub trait Embedder {
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Embedding;

    /// Order-preserving, one vector per input.
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Vec<Embedding> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}
