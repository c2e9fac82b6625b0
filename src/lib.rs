use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocqaError>;

#[derive(Error, Debug)]
pub enum DocqaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "Parallel input length mismatch: {vectors} vectors, {texts} texts, {metadata} metadata records"
    )]
    LengthMismatch {
        vectors: usize,
        texts: usize,
        metadata: usize,
    },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod answer;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod groq;
pub mod query;
pub mod store;
