use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::RagError;
use crate::config::{Config, get_config_dir};
use crate::database::{Database, SearchHit};
use crate::rag::RagPipeline;

/// Load the configuration from the default directory
#[inline]
pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    Config::load(&config_dir).context("Failed to load configuration")
}

async fn open_pipeline(config: &Config) -> Result<RagPipeline> {
    RagPipeline::from_config(config)
        .await
        .context("Failed to initialize pipeline")
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn print_hits(hits: &[SearchHit]) {
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{}. {} #{} (distance {:.4})",
            rank + 1,
            hit.doc_id,
            hit.chunk_index,
            hit.distance
        );
        println!("   {}", hit.content.replace('\n', "\n   "));
    }
}

/// Extract, chunk, embed and store a PDF
#[inline]
pub async fn ingest_document(path: Option<&Path>, doc_id: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let pipeline = open_pipeline(&config).await?;

    let bar = spinner(match path {
        Some(path) => format!("Ingesting {}", path.display()),
        None => "Ingesting configured document".to_string(),
    });
    let result = pipeline.ingest_pdf(path, doc_id).await;
    bar.finish_and_clear();

    let report = result.context("Ingestion failed")?;
    println!(
        "Ingested '{}': {} chunks ({} dimensions)",
        report.document_id, report.chunks, report.dimension
    );
    if report.replaced > 0 {
        println!("  Replaced {} chunks from a previous ingestion", report.replaced);
    }
    Ok(())
}

/// Print the chunks nearest to `query`
#[inline]
pub async fn search_chunks(query: &str, k: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let pipeline = open_pipeline(&config).await?;

    match pipeline.retrieve(query, k).await {
        Ok(hits) => print_hits(&hits),
        Err(RagError::NoContext) => println!("No chunks stored yet. Run 'pdf-rag ingest' first."),
        Err(e) => return Err(e).context("Search failed"),
    }
    Ok(())
}

/// Answer a single question from the stored chunks
#[inline]
pub async fn ask_question(question: &str, k: Option<usize>, show_context: bool) -> Result<()> {
    let config = load_config()?;
    let pipeline = open_pipeline(&config).await?;

    let bar = spinner("Thinking".to_string());
    let result = pipeline.answer(question, k).await;
    bar.finish_and_clear();

    let answer = result.context("Failed to answer question")?;
    println!("{}", answer.text);
    if show_context {
        println!();
        println!("Context:");
        print_hits(&answer.context);
    }
    Ok(())
}

/// Read questions from stdin until end of input, answering each one
#[inline]
pub async fn chat_loop() -> Result<()> {
    let config = load_config()?;
    let pipeline = open_pipeline(&config).await?;
    info!("Starting interactive session");

    println!("Ask a question about your documents (Ctrl-D to exit).");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        match pipeline.answer(question, None).await {
            Ok(answer) => println!("{}\n", answer.text),
            Err(RagError::NoContext) => {
                println!("No context found. Run 'pdf-rag ingest' first.\n");
            }
            Err(e) => {
                error!("Failed to answer question: {}", e);
                println!("Error: {}\n", e);
            }
        }
    }

    Ok(())
}

/// Show the vector index and the stored documents
#[inline]
pub async fn show_status() -> Result<()> {
    let config = load_config()?;
    let database = Database::initialize_from_config(&config)
        .await
        .context("Failed to open vector store")?;

    println!("PDF RAG Status");
    println!("==============");
    println!("Database: {}", config.database_path().display());
    println!("Provider: {}", config.provider.kind);

    match database.vector_index().await? {
        Some(index) => {
            println!(
                "Vector index: {} on {}.{} ({} dimensions, {})",
                index.name, index.table_name, index.column_name, index.dimension, index.metric
            );
            println!("  Created: {}", index.created_at.format("%Y-%m-%d %H:%M:%S"));
        }
        None => {
            println!("Vector index: not created yet");
            return Ok(());
        }
    }

    let documents = database.list_documents().await?;
    println!();
    if documents.is_empty() {
        println!("No documents ingested.");
        return Ok(());
    }

    println!("Documents ({}):", documents.len());
    for document in &documents {
        println!(
            "  {} - {} chunks (ingested {})",
            document.doc_id,
            document.chunk_count,
            document.ingested_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    println!("Total chunks: {}", database.count_chunks(None).await?);

    Ok(())
}

/// List the stored chunks of `doc_id` with their vector sizes
#[inline]
pub async fn show_chunks(doc_id: &str) -> Result<()> {
    let config = load_config()?;
    let database = Database::initialize_from_config(&config)
        .await
        .context("Failed to open vector store")?;

    let chunks = database
        .document_chunks(doc_id)
        .await
        .with_context(|| format!("Failed to read chunks of '{doc_id}'"))?;
    if chunks.is_empty() {
        println!("No chunks stored for '{}'", doc_id);
        return Ok(());
    }

    println!("Chunks of '{}' ({}):", doc_id, chunks.len());
    for chunk in &chunks {
        let dimension = chunk.vector().map_or(0, |v| v.len());
        let preview: String = chunk.content.chars().take(60).collect();
        println!(
            "  #{} [{} chars, {} dims] {}",
            chunk.chunk_index,
            chunk.content.chars().count(),
            dimension,
            preview.replace('\n', " ")
        );
    }
    Ok(())
}

/// Remove every stored chunk of `doc_id`
#[inline]
pub async fn clear_document(doc_id: &str) -> Result<()> {
    let config = load_config()?;
    let database = Database::initialize_from_config(&config)
        .await
        .context("Failed to open vector store")?;

    let removed = database
        .clear_document(doc_id)
        .await
        .with_context(|| format!("Failed to clear document '{doc_id}'"))?;
    if removed == 0 {
        println!("No chunks stored for '{}'", doc_id);
    } else {
        println!("Removed {} chunks of '{}'", removed, doc_id);
    }
    Ok(())
}
