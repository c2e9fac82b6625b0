#[cfg(test)]
mod tests;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::answer::AnswerSynthesizer;
use crate::embeddings::Embedder;
use crate::store::{ChunkMetadata, StoreStats, VectorStore};
use crate::{DocqaError, Result};

/// Chunks retrieved per query before any document filtering.
pub const TOP_K_RETRIEVE: usize = 5;
/// Chunks whose text is concatenated into the synthesis context, and the
/// maximum number of cited sources.
pub const CONTEXT_CHUNKS: usize = 3;
/// Preview length cap, in characters, stored in chunk metadata.
pub const PREVIEW_MAX_CHARS: usize = 200;

pub const NO_RESULTS_ANSWER: &str = "I couldn't find relevant information to answer your \
    question. Please try rephrasing or upload more documents.";
pub const NOT_IN_DOCUMENT_ANSWER: &str =
    "No relevant information found in the specified document.";

/// Citation for one retrieved chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRef {
    /// Filename when the caller supplied one, document id otherwise.
    pub document: String,
    pub chunk_id: String,
    /// Similarity score rounded to 3 decimals.
    pub relevance_score: f32,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Orchestrates retrieval-augmented answering over an owned vector store.
///
/// The store is the only shared mutable state: searches take the read lock
/// and may run concurrently, `add_document` takes the write lock so the
/// normalize+append+persist sequence is never interleaved. The engine keeps
/// no per-query state. The synthesizer call happens outside any lock.
#[derive(Debug)]
pub struct QueryEngine<E, S> {
    embedder: E,
    synthesizer: S,
    store: RwLock<VectorStore>,
}

impl<E: Embedder, S: AnswerSynthesizer> QueryEngine<E, S> {
    /// The embedder and store must agree on the vector dimension.
    #[inline]
    pub fn new(embedder: E, store: VectorStore, synthesizer: S) -> Result<Self> {
        if embedder.dimension() != store.dimension() {
            return Err(DocqaError::DimensionMismatch {
                expected: store.dimension(),
                actual: embedder.dimension(),
            });
        }

        Ok(Self {
            embedder,
            synthesizer,
            store: RwLock::new(store),
        })
    }

    /// Embed `chunks` and append them to the store as one batch, injecting
    /// per-chunk identity metadata alongside the caller-supplied fields.
    #[inline]
    pub fn add_document(
        &self,
        document_id: &str,
        chunks: Vec<String>,
        base_metadata: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        if chunks.is_empty() {
            debug!("Document {} has no chunks, nothing to add", document_id);
            return Ok(());
        }

        let vectors: Vec<Vec<f32>> = self
            .embedder
            .embed_batch(&chunks)
            .into_iter()
            .map(|embedding| embedding.vector)
            .collect();

        let metadata: Vec<ChunkMetadata> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| ChunkMetadata {
                document_id: document_id.to_string(),
                chunk_id: format!("{document_id}_{i}"),
                chunk_index: i as u32,
                preview: truncate_preview(chunk),
                extra: base_metadata.clone(),
            })
            .collect();

        let chunk_count = chunks.len();
        let mut store = self.write_store();
        store.add(vectors, chunks, metadata)?;
        info!("Added document {} with {} chunks", document_id, chunk_count);
        Ok(())
    }

    /// Answer `question` against the indexed corpus. `document_id` of
    /// `None` searches all documents; `Some(id)` filters the retrieved
    /// chunks to that document and short-circuits (no scope broadening)
    /// when nothing survives the filter.
    #[inline]
    pub fn process_query(
        &self,
        question: &str,
        document_id: Option<&str>,
    ) -> Result<QueryResponse> {
        let query = self.embedder.embed(question);

        let store = self.read_store();
        let hits = store.search(&query.vector, TOP_K_RETRIEVE)?;
        drop(store);

        if hits.is_empty() {
            return Ok(QueryResponse {
                answer: NO_RESULTS_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let hits = match document_id {
            Some(id) => {
                let filtered: Vec<_> = hits
                    .into_iter()
                    .filter(|hit| hit.metadata.document_id == id)
                    .collect();
                if filtered.is_empty() {
                    return Ok(QueryResponse {
                        answer: NOT_IN_DOCUMENT_ANSWER.to_string(),
                        sources: Vec::new(),
                    });
                }
                filtered
            }
            None => hits,
        };

        let context = hits
            .iter()
            .take(CONTEXT_CHUNKS)
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let answer = self.synthesizer.generate_answer(question, &context);

        let sources = hits
            .iter()
            .take(CONTEXT_CHUNKS)
            .map(|hit| SourceRef {
                document: hit.metadata.display_name().to_string(),
                chunk_id: hit.metadata.chunk_id.clone(),
                relevance_score: round3(hit.score),
                preview: hit.metadata.preview.clone(),
            })
            .collect();

        Ok(QueryResponse {
            answer: answer.text,
            sources,
        })
    }

    #[inline]
    pub fn stats(&self) -> StoreStats {
        self.read_store().stats()
    }

    /// Force a snapshot write, for an explicit flush at shutdown.
    #[inline]
    pub fn flush(&self) -> Result<()> {
        self.write_store().persist()
    }

    fn read_store(&self) -> RwLockReadGuard<'_, VectorStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, VectorStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn truncate_preview(text: &str) -> String {
    let mut chars = text.chars();
    let preview: String = chars.by_ref().take(PREVIEW_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}

fn round3(score: f32) -> f32 {
    (score * 1000.0).round() / 1000.0
}
