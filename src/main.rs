use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docqa::commands::{add_document, ask, show_config, show_stats};

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Retrieval-augmented question answering over chunked documents")]
#[command(version)]
struct Cli {
    /// Override the base directory holding config and index files
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a plain-text document (chunks are split on blank lines)
    Add {
        /// Path to the document file
        file: PathBuf,
        /// Document id (defaults to the file stem)
        #[arg(long)]
        id: Option<String>,
        /// Display name stored with every chunk (defaults to the file name)
        #[arg(long)]
        filename: Option<String>,
        /// Subject tag stored with every chunk
        #[arg(long)]
        subject: Option<String>,
    },
    /// Ask a question against the indexed corpus
    Ask {
        /// The question to answer
        question: String,
        /// Restrict retrieval to one document id
        #[arg(long)]
        document: Option<String>,
    },
    /// Show store statistics as JSON
    Stats,
    /// Show the resolved configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Add {
            file,
            id,
            filename,
            subject,
        } => {
            add_document(cli.base_dir, &file, id, filename, subject)?;
        }
        Commands::Ask { question, document } => {
            ask(cli.base_dir, &question, document.as_deref())?;
        }
        Commands::Stats => {
            show_stats(cli.base_dir)?;
        }
        Commands::Config => {
            show_config(cli.base_dir)?;
        }
    }

    Ok(())
}
