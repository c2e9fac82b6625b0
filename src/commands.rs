use anyhow::{Context, Result};
use console::style;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::answer::GroqAnswerer;
use crate::config::Config;
use crate::embeddings::EmbeddingGenerator;
use crate::query::QueryEngine;
use crate::store::VectorStore;

type Engine = QueryEngine<EmbeddingGenerator, GroqAnswerer>;

/// Index a plain-text document file. The file is split into chunks on
/// blank lines here, on the caller side; the engine never re-chunks.
#[inline]
pub fn add_document(
    base_dir: Option<PathBuf>,
    file: &Path,
    id: Option<String>,
    filename: Option<String>,
    subject: Option<String>,
) -> Result<()> {
    let config = load_config(base_dir)?;
    let engine = build_engine(&config)?;

    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read document file: {}", file.display()))?;
    let chunks = split_paragraphs(&text);
    if chunks.is_empty() {
        println!("{} is empty, nothing to index", file.display());
        return Ok(());
    }

    let document_id = id.unwrap_or_else(|| {
        file.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    });

    let display_name = filename.or_else(|| {
        file.file_name()
            .map(|name| name.to_string_lossy().into_owned())
    });

    let mut metadata = serde_json::Map::new();
    if let Some(name) = display_name {
        metadata.insert("filename".to_string(), serde_json::Value::String(name));
    }
    if let Some(subject) = subject {
        metadata.insert("subject".to_string(), serde_json::Value::String(subject));
    }
    metadata.insert(
        "uploaded_at".to_string(),
        serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
    );

    info!("Indexing document {} from {}", document_id, file.display());
    let chunk_count = chunks.len();
    engine.add_document(&document_id, chunks, &metadata)?;

    println!(
        "Indexed {} as {} ({} chunks)",
        file.display(),
        style(&document_id).bold(),
        chunk_count
    );
    Ok(())
}

/// Answer a question against the indexed corpus, optionally scoped to one
/// document.
#[inline]
pub fn ask(base_dir: Option<PathBuf>, question: &str, document: Option<&str>) -> Result<()> {
    let config = load_config(base_dir)?;
    let engine = build_engine(&config)?;

    let response = engine.process_query(question, document)?;

    println!("{}", style("Answer").bold().underlined());
    println!("{}", response.answer);

    if !response.sources.is_empty() {
        println!();
        println!("{}", style("Sources").bold().underlined());
        for (i, source) in response.sources.iter().enumerate() {
            println!(
                "{}. {} ({}, score {:.3})",
                i + 1,
                style(&source.document).bold(),
                source.chunk_id,
                source.relevance_score
            );
            println!("   {}", source.preview);
        }
    }

    Ok(())
}

/// Print store statistics as JSON.
#[inline]
pub fn show_stats(base_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config(base_dir)?;
    let engine = build_engine(&config)?;

    let stats = engine.stats();
    let json = serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?;
    println!("{json}");
    Ok(())
}

/// Print the resolved configuration.
#[inline]
pub fn show_config(base_dir: Option<PathBuf>) -> Result<()> {
    let config = load_config(base_dir)?;

    println!("Base directory: {}", config.base_dir.display());
    println!("Index path: {}", config.index_path().display());
    println!(
        "Embedding: dimension {}, batch delay {}ms",
        config.embedding.dimension, config.embedding.batch_delay_ms
    );
    println!(
        "Groq: model {}, max answer tokens {}, temperature {}, timeout {}s",
        config.groq.model,
        config.groq.max_answer_tokens,
        config.groq.temperature,
        config.groq.timeout_seconds
    );
    println!(
        "API key: {}",
        if Config::groq_api_key().is_some() {
            "configured"
        } else {
            "not set (fallback paths active)"
        }
    );
    Ok(())
}

fn load_config(base_dir: Option<PathBuf>) -> Result<Config> {
    let dir = match base_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .context("Failed to determine the user data directory")?
            .join("docqa"),
    };
    Config::load(dir)
}

fn build_engine(config: &Config) -> Result<Engine> {
    let store = VectorStore::open(config.embedding.dimension, config.index_path());
    let engine = QueryEngine::new(
        EmbeddingGenerator::new(config),
        store,
        GroqAnswerer::new(config),
    )?;
    Ok(engine)
}

fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(ToString::to_string)
        .collect()
}
