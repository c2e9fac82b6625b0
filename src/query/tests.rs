use super::*;
use tempfile::TempDir;

use crate::answer::{AnswerSource, GroqAnswerer, SynthesizedAnswer};
use crate::embeddings::{Embedder, Embedding, EmbeddingGenerator, EmbeddingSource};

const DIM: usize = 32;

/// Bag-of-words embedder over hashed word slots. Texts sharing words get
/// similar vectors, which makes ranking assertions meaningful.
struct WordEmbedder;

impl Embedder for WordEmbedder {
    fn dimension(&self) -> usize {
        DIM
    }

    fn embed(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; DIM];
        for word in text.to_lowercase().split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            if word.is_empty() {
                continue;
            }
            let slot = word.bytes().map(usize::from).sum::<usize>() % DIM;
            vector[slot] += 1.0;
        }
        Embedding {
            vector,
            source: EmbeddingSource::Fallback,
        }
    }
}

struct StaticSynthesizer;

impl AnswerSynthesizer for StaticSynthesizer {
    fn generate_answer(&self, _question: &str, context: &str) -> SynthesizedAnswer {
        SynthesizedAnswer {
            text: format!("synthesized from: {context}"),
            source: AnswerSource::Remote,
        }
    }
}

type TestEngine<S> = QueryEngine<WordEmbedder, S>;

fn word_engine<S: AnswerSynthesizer>(synthesizer: S) -> (TestEngine<S>, TempDir) {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let store = VectorStore::open(DIM, temp_dir.path().join("index"));
    let engine = QueryEngine::new(WordEmbedder, store, synthesizer).expect("dimensions agree");
    (engine, temp_dir)
}

fn no_extra() -> serde_json::Map<String, serde_json::Value> {
    serde_json::Map::new()
}

#[test]
fn construction_rejects_dimension_mismatch() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let store = VectorStore::open(DIM + 1, temp_dir.path().join("index"));

    let result = QueryEngine::new(WordEmbedder, store, StaticSynthesizer);
    assert!(matches!(
        result,
        Err(crate::DocqaError::DimensionMismatch { .. })
    ));
}

#[test]
fn empty_store_yields_no_results_answer() {
    let (engine, _guard) = word_engine(StaticSynthesizer);
    let response = engine
        .process_query("anything at all", None)
        .expect("query succeeds");

    assert_eq!(response.answer, NO_RESULTS_ANSWER);
    assert!(response.sources.is_empty());
}

#[test]
fn capital_question_ranks_capital_chunk_first() {
    let (engine, _guard) = word_engine(GroqAnswerer::fallback_only());
    engine
        .add_document(
            "doc1",
            vec![
                "Paris is the capital of France.".to_string(),
                "The Eiffel Tower is in Paris.".to_string(),
            ],
            &no_extra(),
        )
        .expect("add succeeds");

    let response = engine
        .process_query("What is the capital of France?", None)
        .expect("query succeeds");

    assert_eq!(response.sources[0].document, "doc1");
    assert_eq!(response.sources[0].chunk_id, "doc1_0");
    assert!(response.sources[0].relevance_score > response.sources[1].relevance_score);
    assert!(response.answer.contains("Paris is the capital of France"));
}

#[test]
fn document_filter_never_leaks_other_documents() {
    let (engine, _guard) = word_engine(StaticSynthesizer);
    engine
        .add_document(
            "doc1",
            vec!["Paris is the capital of France.".to_string()],
            &no_extra(),
        )
        .expect("add succeeds");
    engine
        .add_document(
            "doc2",
            vec!["The capital of Spain is Madrid.".to_string()],
            &no_extra(),
        )
        .expect("add succeeds");

    let response = engine
        .process_query("What is the capital of France?", Some("doc2"))
        .expect("query succeeds");

    assert!(!response.sources.is_empty());
    for source in &response.sources {
        assert!(source.chunk_id.starts_with("doc2_"));
    }
}

#[test]
fn emptied_filter_short_circuits_without_sources() {
    let (engine, _guard) = word_engine(StaticSynthesizer);
    engine
        .add_document(
            "doc1",
            vec!["Paris is the capital of France.".to_string()],
            &no_extra(),
        )
        .expect("add succeeds");

    let response = engine
        .process_query("What is the capital of France?", Some("absent"))
        .expect("query succeeds");

    assert_eq!(response.answer, NOT_IN_DOCUMENT_ANSWER);
    assert!(response.sources.is_empty());
}

#[test]
fn sources_are_capped_at_three() {
    let (engine, _guard) = word_engine(StaticSynthesizer);
    let chunks: Vec<String> = (0..6)
        .map(|i| format!("France exports wine, batch number {i}."))
        .collect();
    engine
        .add_document("doc1", chunks, &no_extra())
        .expect("add succeeds");

    let response = engine
        .process_query("Does France export wine?", None)
        .expect("query succeeds");

    assert_eq!(response.sources.len(), CONTEXT_CHUNKS);
}

#[test]
fn context_concatenates_top_chunks_with_blank_lines() {
    let (engine, _guard) = word_engine(StaticSynthesizer);
    engine
        .add_document(
            "doc1",
            vec![
                "France exports wine.".to_string(),
                "France exports cheese.".to_string(),
            ],
            &no_extra(),
        )
        .expect("add succeeds");

    let response = engine
        .process_query("What does France export?", None)
        .expect("query succeeds");

    assert!(response.answer.starts_with("synthesized from: "));
    assert!(response.answer.contains("\n\n"));
    assert!(response.answer.contains("France exports wine."));
    assert!(response.answer.contains("France exports cheese."));
}

#[test]
fn long_chunks_get_truncated_previews() {
    let (engine, _guard) = word_engine(StaticSynthesizer);
    let long_chunk = "France ".repeat(60);
    assert!(long_chunk.chars().count() > PREVIEW_MAX_CHARS);

    engine
        .add_document("doc1", vec![long_chunk], &no_extra())
        .expect("add succeeds");

    let response = engine
        .process_query("France?", None)
        .expect("query succeeds");

    let preview = &response.sources[0].preview;
    assert!(preview.ends_with("..."));
    assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS + 3);
}

#[test]
fn short_chunks_keep_full_preview() {
    let (engine, _guard) = word_engine(StaticSynthesizer);
    engine
        .add_document(
            "doc1",
            vec!["Short chunk.".to_string()],
            &no_extra(),
        )
        .expect("add succeeds");

    let response = engine
        .process_query("Short chunk?", None)
        .expect("query succeeds");

    assert_eq!(response.sources[0].preview, "Short chunk.");
}

#[test]
fn relevance_scores_are_rounded_to_three_decimals() {
    let (engine, _guard) = word_engine(StaticSynthesizer);
    engine
        .add_document(
            "doc1",
            vec![
                "Paris is the capital of France.".to_string(),
                "The Eiffel Tower is in Paris.".to_string(),
            ],
            &no_extra(),
        )
        .expect("add succeeds");

    let response = engine
        .process_query("What is the capital of France?", None)
        .expect("query succeeds");

    for source in &response.sources {
        let scaled = source.relevance_score * 1000.0;
        assert!((scaled - scaled.round()).abs() < 1e-3);
    }
}

#[test]
fn caller_metadata_flows_into_sources() {
    let (engine, _guard) = word_engine(StaticSynthesizer);
    let mut extra = serde_json::Map::new();
    extra.insert(
        "filename".to_string(),
        serde_json::Value::String("lecture.pdf".to_string()),
    );
    engine
        .add_document(
            "doc1",
            vec!["Paris is the capital of France.".to_string()],
            &extra,
        )
        .expect("add succeeds");

    let response = engine
        .process_query("What is the capital of France?", None)
        .expect("query succeeds");

    assert_eq!(response.sources[0].document, "lecture.pdf");
}

#[test]
fn adding_no_chunks_is_a_no_op() {
    let (engine, _guard) = word_engine(StaticSynthesizer);
    engine
        .add_document("doc1", Vec::new(), &no_extra())
        .expect("add succeeds");

    assert_eq!(engine.stats().total_vectors, 0);
}

#[test]
fn stats_reflect_added_documents() {
    let (engine, _guard) = word_engine(StaticSynthesizer);
    engine
        .add_document(
            "doc1",
            vec!["one".to_string(), "two".to_string()],
            &no_extra(),
        )
        .expect("add succeeds");
    engine
        .add_document("doc2", vec!["three".to_string()], &no_extra())
        .expect("add succeeds");

    let stats = engine.stats();
    assert_eq!(stats.total_vectors, 3);
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.dimension, DIM);
}

#[test]
fn engine_works_with_the_real_fallback_generator() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let store = VectorStore::open(768, temp_dir.path().join("index"));
    let engine = QueryEngine::new(
        EmbeddingGenerator::fallback_only(768),
        store,
        GroqAnswerer::fallback_only(),
    )
    .expect("dimensions agree");

    engine
        .add_document(
            "doc1",
            vec!["Paris is the capital of France.".to_string()],
            &no_extra(),
        )
        .expect("add succeeds");

    let response = engine
        .process_query("Paris is the capital of France.", None)
        .expect("query succeeds");

    // Exact text self-match through the deterministic path.
    assert_eq!(response.sources[0].chunk_id, "doc1_0");
    assert!((response.sources[0].relevance_score - 1.0).abs() < 1e-3);
}
