use super::*;

#[test]
fn fallback_only_reports_no_remote() {
    let generator = EmbeddingGenerator::fallback_only(768);
    assert!(!generator.has_remote());
    assert_eq!(generator.dimension(), 768);
}

#[test]
fn fallback_embedding_is_tagged_and_sized() {
    let generator = EmbeddingGenerator::fallback_only(768);
    let embedding = generator.embed("some chunk text");

    assert_eq!(embedding.source, EmbeddingSource::Fallback);
    assert_eq!(embedding.vector.len(), 768);
}

#[test]
fn repeated_embeds_are_identical() {
    let generator = EmbeddingGenerator::fallback_only(768);

    let first = generator.embed("deterministic input");
    let second = generator.embed("deterministic input");

    assert_eq!(first, second);
}

#[test]
fn batch_preserves_order_and_count() {
    let generator = EmbeddingGenerator::fallback_only(128);
    let texts = vec![
        "first chunk".to_string(),
        "second chunk".to_string(),
        "third chunk".to_string(),
    ];

    let embeddings = generator.embed_batch(&texts);

    assert_eq!(embeddings.len(), 3);
    for (embedding, text) in embeddings.iter().zip(&texts) {
        assert_eq!(embedding.vector, generator.embed(text).vector);
    }
}

#[test]
fn empty_batch_yields_empty_output() {
    let generator = EmbeddingGenerator::fallback_only(768);
    assert!(generator.embed_batch(&[]).is_empty());
}

#[test]
fn generator_respects_configured_dimension() {
    let generator = EmbeddingGenerator::fallback_only(384);
    assert_eq!(generator.embed("text").vector.len(), 384);
}
