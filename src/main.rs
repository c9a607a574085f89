use anyhow::Result;
use clap::{Parser, Subcommand};
use pdf_rag::commands::{
    ask_question, chat_loop, clear_document, ingest_document, load_config, search_chunks,
    show_chunks, show_status,
};
use pdf_rag::config::{get_config_dir, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdf-rag")]
#[command(about = "Ask questions about PDF documents using retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the provider, chunking and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Extract, chunk and embed a PDF into the vector store
    Ingest {
        /// PDF to ingest. Defaults to the configured document path
        path: Option<PathBuf>,
        /// Identifier to store the chunks under. Defaults to the file name
        #[arg(long)]
        doc_id: Option<String>,
    },
    /// Show the stored chunks nearest to a query
    Search {
        query: String,
        /// Number of chunks to return
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Answer a single question from the ingested documents
    Ask {
        question: String,
        /// Number of context chunks to retrieve
        #[arg(short, long)]
        k: Option<usize>,
        /// Also print the retrieved chunks
        #[arg(long)]
        show_context: bool,
    },
    /// Answer questions read from stdin until end of input
    Chat,
    /// Show the vector index and stored documents
    Status,
    /// List the stored chunks of a document
    Chunks {
        /// Document identifier
        doc_id: String,
    },
    /// Remove all chunks stored for a document
    Clear {
        /// Document identifier
        doc_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&load_config()?)?;
            } else {
                run_interactive_config(&get_config_dir()?)?;
            }
        }
        Commands::Ingest { path, doc_id } => {
            ingest_document(path.as_deref(), doc_id.as_deref()).await?;
        }
        Commands::Search { query, k } => {
            search_chunks(&query, k).await?;
        }
        Commands::Ask {
            question,
            k,
            show_context,
        } => {
            ask_question(&question, k, show_context).await?;
        }
        Commands::Chat => {
            chat_loop().await?;
        }
        Commands::Status => {
            show_status().await?;
        }
        Commands::Chunks { doc_id } => {
            show_chunks(&doc_id).await?;
        }
        Commands::Clear { doc_id } => {
            clear_document(&doc_id).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["pdf-rag", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Status));
        }
    }

    #[test]
    fn ingest_without_path_uses_config() {
        let cli = Cli::try_parse_from(["pdf-rag", "ingest"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { path, doc_id } = parsed.command {
                assert_eq!(path, None);
                assert_eq!(doc_id, None);
            }
        }
    }

    #[test]
    fn ingest_with_path_and_id() {
        let cli = Cli::try_parse_from([
            "pdf-rag",
            "ingest",
            "manual.pdf",
            "--doc-id",
            "manual-v2",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { path, doc_id } = parsed.command {
                assert_eq!(path, Some(PathBuf::from("manual.pdf")));
                assert_eq!(doc_id, Some("manual-v2".to_string()));
            }
        }
    }

    #[test]
    fn ask_with_k() {
        let cli = Cli::try_parse_from(["pdf-rag", "ask", "What is covered?", "-k", "5"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask {
                question,
                k,
                show_context,
            } = parsed.command
            {
                assert_eq!(question, "What is covered?");
                assert_eq!(k, Some(5));
                assert!(!show_context);
            }
        }
    }

    #[test]
    fn search_requires_query() {
        let cli = Cli::try_parse_from(["pdf-rag", "search"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn chunks_takes_a_document_id() {
        let cli = Cli::try_parse_from(["pdf-rag", "chunks", "manual.pdf"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Chunks { doc_id } = parsed.command {
                assert_eq!(doc_id, "manual.pdf");
            }
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["pdf-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["pdf-rag", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["pdf-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
