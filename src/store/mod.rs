
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{DocqaError, Result};

/// Metadata stored alongside each chunk. Caller-supplied fields (filename,
/// subject, upload time, ...) ride along in the flattened map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub document_id: String,
    pub chunk_id: String,
    pub chunk_index: u32,
    /// Truncated preview of the chunk text, for citations.
    pub preview: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChunkMetadata {
    /// Human-facing name for the owning document: the caller-supplied
    /// filename when present, the document id otherwise.
    #[inline]
    pub fn display_name(&self) -> &str {
        self.extra
            .get("filename")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(&self.document_id)
    }
}

/// One ranked result from a similarity search.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    pub total_vectors: usize,
    pub dimension: usize,
    pub total_documents: usize,
}

/// On-disk artifact holding the raw vector matrix.
#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    dimension: u64,
    vectors: Vec<f32>,
}

/// On-disk artifact holding the parallel metadata and text sequences.
#[derive(Serialize, Deserialize)]
struct MetaBundle {
    metadata: Vec<ChunkMetadata>,
    chunk_texts: Vec<String>,
}

/// Append-only flat vector index with exact inner-product search.
///
/// Three parallel sequences (row-major vector matrix, chunk texts, chunk
/// metadata) are indexed by the same position; every public mutation keeps
/// them in lock-step. All stored vectors are L2-normalized, so inner
/// product equals cosine similarity.
#[derive(Debug)]
pub struct VectorStore {
    dimension: usize,
    index_path: PathBuf,
    vectors: Vec<f32>,
    texts: Vec<String>,
    metadata: Vec<ChunkMetadata>,
}

impl VectorStore {
    /// Open a store backed by the snapshot artifacts at `index_path`.
    ///
    /// A missing snapshot is not an error; the store starts empty. An
    /// unreadable or inconsistent snapshot is logged and likewise yields
    /// an empty store, so a bad file can never take down the host.
    #[inline]
    pub fn open(dimension: usize, index_path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            dimension,
            index_path: index_path.into(),
            vectors: Vec::new(),
            texts: Vec::new(),
            metadata: Vec::new(),
        };

        match store.load() {
            Ok(true) => info!("Loaded index with {} vectors", store.len()),
            Ok(false) => debug!(
                "No persisted index at {}, starting empty",
                store.index_path.display()
            ),
            Err(error) => {
                warn!("Failed to load persisted index, starting empty: {}", error);
            }
        }

        store
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Append a batch of chunks. The three inputs must agree in length and
    /// every vector must match the store dimension; violations are rejected
    /// before any state is touched, since a partial append would corrupt
    /// the parallel-sequence invariant for the lifetime of the store.
    ///
    /// Vectors are L2-normalized on the way in. The snapshot is rewritten
    /// after every append; a persistence failure is logged and does not
    /// fail the call (the in-memory store keeps serving).
    #[inline]
    pub fn add(
        &mut self,
        vectors: Vec<Vec<f32>>,
        texts: Vec<String>,
        metadata: Vec<ChunkMetadata>,
    ) -> Result<()> {
        if vectors.len() != texts.len() || vectors.len() != metadata.len() {
            return Err(DocqaError::LengthMismatch {
                vectors: vectors.len(),
                texts: texts.len(),
                metadata: metadata.len(),
            });
        }

        if let Some(row) = vectors.iter().find(|row| row.len() != self.dimension) {
            return Err(DocqaError::DimensionMismatch {
                expected: self.dimension,
                actual: row.len(),
            });
        }

        let added = vectors.len();
        for mut row in vectors {
            normalize(&mut row);
            self.vectors.extend_from_slice(&row);
        }
        self.texts.extend(texts);
        self.metadata.extend(metadata);

        if let Err(error) = self.persist() {
            warn!(
                "Failed to persist index to {} (in-memory data is retained but will be lost on restart): {}",
                self.index_path.display(),
                error
            );
        }

        info!("Added {} vectors to index", added);
        Ok(())
    }

    /// Exact nearest-neighbor search. Returns up to `top_k` hits in
    /// descending score order; ties break by insertion order. An empty
    /// store yields an empty result, never an error.
    #[inline]
    pub fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if query_vector.len() != self.dimension {
            return Err(DocqaError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }

        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let mut query = query_vector.to_vec();
        normalize(&mut query);

        let scores: Vec<f32> = (0..self.len())
            .map(|i| dot(self.row(i), &query))
            .collect();

        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
        order.truncate(top_k);

        let hits = order
            .into_iter()
            .map(|i| SearchHit {
                text: self.texts[i].clone(),
                metadata: self.metadata[i].clone(),
                score: scores[i],
            })
            .collect();

        Ok(hits)
    }

    /// Write both snapshot artifacts. Each is written to a temp file and
    /// renamed into place so a restart never observes a torn file.
    #[inline]
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.index_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let snapshot = IndexSnapshot {
            dimension: self.dimension as u64,
            vectors: self.vectors.clone(),
        };
        let index_bytes = bincode::serialize(&snapshot)
            .map_err(|e| DocqaError::Store(format!("Failed to encode index snapshot: {e}")))?;
        write_atomic(&self.index_file(), &index_bytes)?;

        let bundle = MetaBundle {
            metadata: self.metadata.clone(),
            chunk_texts: self.texts.clone(),
        };
        let meta_bytes = serde_json::to_vec(&bundle)
            .map_err(|e| DocqaError::Store(format!("Failed to encode metadata bundle: {e}")))?;
        write_atomic(&self.meta_file(), &meta_bytes)?;

        debug!(
            "Persisted {} vectors to {}",
            self.len(),
            self.index_path.display()
        );
        Ok(())
    }

    /// Reload from the snapshot artifacts. Returns `Ok(false)` when the
    /// pair is missing or incomplete (treated as "no persisted store");
    /// errors only on an unreadable or internally inconsistent pair.
    /// In-memory state is replaced only after the whole pair validates.
    #[inline]
    pub fn load(&mut self) -> Result<bool> {
        let index_file = self.index_file();
        let meta_file = self.meta_file();

        // One artifact without the other is an invalid snapshot, not a
        // partial load.
        if !index_file.exists() || !meta_file.exists() {
            return Ok(false);
        }

        let index_bytes = fs::read(&index_file)?;
        let snapshot: IndexSnapshot = bincode::deserialize(&index_bytes)
            .map_err(|e| DocqaError::Store(format!("Failed to decode index snapshot: {e}")))?;

        if snapshot.dimension as usize != self.dimension {
            return Err(DocqaError::DimensionMismatch {
                expected: self.dimension,
                actual: snapshot.dimension as usize,
            });
        }
        if snapshot.vectors.len() % self.dimension != 0 {
            return Err(DocqaError::Store(
                "Index snapshot length is not a multiple of the dimension".to_string(),
            ));
        }

        let meta_bytes = fs::read(&meta_file)?;
        let bundle: MetaBundle = serde_json::from_slice(&meta_bytes)
            .map_err(|e| DocqaError::Store(format!("Failed to decode metadata bundle: {e}")))?;

        let count = snapshot.vectors.len() / self.dimension;
        if bundle.metadata.len() != count || bundle.chunk_texts.len() != count {
            return Err(DocqaError::Store(format!(
                "Snapshot desynchronized: {} vectors, {} texts, {} metadata records",
                count,
                bundle.chunk_texts.len(),
                bundle.metadata.len()
            )));
        }

        self.vectors = snapshot.vectors;
        self.texts = bundle.chunk_texts;
        self.metadata = bundle.metadata;
        Ok(true)
    }

    #[inline]
    pub fn stats(&self) -> StoreStats {
        let documents: HashSet<&str> = self
            .metadata
            .iter()
            .map(|meta| meta.document_id.as_str())
            .collect();

        StoreStats {
            total_vectors: self.len(),
            dimension: self.dimension,
            total_documents: documents.len(),
        }
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dimension..(i + 1) * self.dimension]
    }

    fn index_file(&self) -> PathBuf {
        append_extension(&self.index_path, "index")
    }

    fn meta_file(&self) -> PathBuf {
        append_extension(&self.index_path, "meta.json")
    }
}

/// Scale to unit L2 norm in place. All-zero vectors are left untouched;
/// re-normalizing an already-normalized vector is a no-op up to float
/// tolerance.
pub(crate) fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
