use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lectern_core::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CHUNKS};
use lectern_core::{ChunkingConfig, DocumentSummary, RetrievalConfig};
use lectern_generation::GeneratorStack;
use lectern_observability::{init_tracing, AppMetrics};
use lectern_pipeline::extract::is_supported;
use lectern_pipeline::{summarize, DocumentPipeline, DocumentSource, FileExtractor, TextExtractor};
use lectern_retrieval::{chunk_text, find_relevant_chunks};
use lectern_storage::Store;
use walkdir::WalkDir;

#[derive(Debug, Parser)]
#[command(name = "lectern")]
#[command(about = "Chunk, store and query study documents")]
struct Cli {
    /// Words per chunk.
    #[arg(long, env = "LECTERN_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Words repeated between consecutive chunks.
    #[arg(long, env = "LECTERN_CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    overlap: usize,

    /// SQLite URL, e.g. `sqlite://lectern.db?mode=rwc`. In-memory when unset.
    #[arg(long, env = "LECTERN_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the chunks of a file without storing anything.
    Chunk { file: PathBuf },
    /// Chunk a file and rank its chunks against a query.
    Search {
        file: PathBuf,
        query: String,
        #[arg(long, default_value_t = DEFAULT_MAX_CHUNKS as i64, allow_negative_numbers = true)]
        limit: i64,
    },
    /// Ingest a file, or every supported file under a directory.
    Ingest {
        path: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    Documents,
    Ask {
        document_id: String,
        question: String,
    },
    Explain {
        document_id: String,
        concept: String,
    },
    History {
        document_id: String,
    },
    Rename {
        document_id: String,
        title: String,
    },
    Summary {
        document_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("lectern_cli");
    let cli = Cli::parse();

    let chunking = ChunkingConfig::new(cli.chunk_size, cli.overlap)
        .context("invalid --chunk-size/--overlap")?;

    match cli.command {
        Command::Chunk { file } => {
            let text = FileExtractor.extract(&file)?;
            let chunks = chunk_text(&text, &chunking);
            println!("{}", serde_json::to_string_pretty(&chunks)?);
        }
        Command::Search { file, query, limit } => {
            let text = FileExtractor.extract(&file)?;
            let chunks = chunk_text(&text, &chunking);
            let ranked = find_relevant_chunks(&chunks, &query, limit.max(0) as usize);
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        }
        Command::Ingest { path, title } => {
            let pipeline = build_pipeline(cli.database_url.as_deref(), chunking).await?;
            let summaries = ingest_path(&pipeline, &path, title.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Command::Documents => {
            let pipeline = build_pipeline(cli.database_url.as_deref(), chunking).await?;
            let documents = pipeline.list_documents().await?;
            println!("{}", serde_json::to_string_pretty(&documents)?);
        }
        Command::Ask {
            document_id,
            question,
        } => {
            let pipeline = build_pipeline(cli.database_url.as_deref(), chunking).await?;
            let answer = pipeline.chat(&document_id, &question).await?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Command::Explain {
            document_id,
            concept,
        } => {
            let pipeline = build_pipeline(cli.database_url.as_deref(), chunking).await?;
            let explanation = pipeline.explain_concept(&document_id, &concept).await?;
            println!("{}", serde_json::to_string_pretty(&explanation)?);
        }
        Command::History { document_id } => {
            let pipeline = build_pipeline(cli.database_url.as_deref(), chunking).await?;
            let history = pipeline.chat_history(&document_id).await?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Command::Rename { document_id, title } => {
            let pipeline = build_pipeline(cli.database_url.as_deref(), chunking).await?;
            let document = pipeline.rename(&document_id, &title).await?;
            println!("{}", serde_json::to_string_pretty(&summarize(&document))?);
        }
        Command::Summary { document_id } => {
            let pipeline = build_pipeline(cli.database_url.as_deref(), chunking).await?;
            let summary = pipeline.summary(&document_id).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

async fn build_pipeline(
    database_url: Option<&str>,
    chunking: ChunkingConfig,
) -> Result<DocumentPipeline<Store>> {
    let store = Store::from_database_url(database_url)
        .await
        .context("failed to open document store")?;

    Ok(DocumentPipeline::new(
        Arc::new(store),
        GeneratorStack::load_default(),
        AppMetrics::shared(),
        chunking,
        RetrievalConfig::default(),
    ))
}

async fn ingest_path(
    pipeline: &DocumentPipeline<Store>,
    path: &Path,
    title: Option<&str>,
) -> Result<Vec<DocumentSummary>> {
    let files = if path.is_dir() {
        WalkDir::new(path)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|file| is_supported(file))
            .collect::<Vec<_>>()
    } else if is_supported(path) {
        vec![path.to_path_buf()]
    } else {
        bail!("unsupported file type: {}", path.display());
    };

    let mut summaries = Vec::with_capacity(files.len());
    for file in files {
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document")
            .to_string();
        let document_title = match title {
            Some(title) if path.is_file() => title.to_string(),
            _ => title_from_path(&file),
        };

        let document = pipeline
            .ingest(&document_title, &file_name, DocumentSource::File(file.clone()))
            .await
            .with_context(|| format!("failed ingesting {}", file.display()))?;

        summaries.push(summarize(&document));
    }

    Ok(summaries)
}

fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("untitled")
        .replace(['-', '_'], " ")
}
