use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tempfile::TempDir;

use docqa::embeddings::hash_embedding;
use docqa::store::{ChunkMetadata, VectorStore};

const DIMENSION: usize = 768;
const CORPUS_SIZE: usize = 2000;

fn populated_store(temp_dir: &TempDir) -> VectorStore {
    let mut store = VectorStore::open(DIMENSION, temp_dir.path().join("bench_index"));

    let texts: Vec<String> = (0..CORPUS_SIZE)
        .map(|i| format!("synthetic chunk number {i} with some filler words"))
        .collect();
    let vectors: Vec<Vec<f32>> = texts
        .iter()
        .map(|text| hash_embedding(text, DIMENSION))
        .collect();
    let metadata: Vec<ChunkMetadata> = (0..CORPUS_SIZE)
        .map(|i| ChunkMetadata {
            document_id: format!("doc{}", i % 10),
            chunk_id: format!("doc{}_{i}", i % 10),
            chunk_index: i as u32,
            preview: String::new(),
            extra: serde_json::Map::new(),
        })
        .collect();

    store
        .add(vectors, texts, metadata)
        .expect("can populate store");
    store
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let store = populated_store(&temp_dir);
    let query = hash_embedding("what is in the synthetic corpus", DIMENSION);

    c.bench_function("search_top5", |b| {
        b.iter(|| store.search(black_box(&query), black_box(5)))
    });

    c.bench_function("embed_fallback", |b| {
        b.iter(|| hash_embedding(black_box("a representative chunk of text"), DIMENSION))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
