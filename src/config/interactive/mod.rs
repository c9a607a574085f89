
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};
use std::path::Path;

use super::{Config, ConfigError, OllamaConfig, ProviderKind};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 PDF RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Provider").bold().yellow());
    eprintln!("Choose the service used for embeddings and chat completions.");
    eprintln!();

    configure_provider(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Chunking & Retrieval").bold().yellow());
    configure_chunking(&mut config)?;

    if config.provider.kind == ProviderKind::Ollama {
        eprintln!();
        eprintln!("{}", style("Testing configuration...").yellow());

        if test_ollama_connection(&config.provider.ollama) {
            eprintln!("{}", style("✓ Ollama connection successful!").green());
        } else {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not connect to Ollama").yellow()
            );
            eprintln!("You can continue, but make sure Ollama is running before ingesting.");
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    let provider = &config.provider;
    eprintln!("{}", style("Provider Settings:").bold().yellow());
    eprintln!("  Provider: {}", style(provider.kind).cyan());
    match provider.kind {
        ProviderKind::OpenAi => {
            eprintln!("  Base URL: {}", style(&provider.openai.base_url).cyan());
            eprintln!(
                "  Embedding Model: {}",
                style(&provider.openai.embedding_model).cyan()
            );
            eprintln!("  Chat Model: {}", style(&provider.openai.chat_model).cyan());
            eprintln!(
                "  API Key: {}",
                style(mask_secret(provider.openai.api_key.as_deref())).cyan()
            );
        }
        ProviderKind::Gemini => {
            eprintln!("  Base URL: {}", style(&provider.gemini.base_url).cyan());
            eprintln!(
                "  Embedding Model: {}",
                style(&provider.gemini.embedding_model).cyan()
            );
            eprintln!("  Chat Model: {}", style(&provider.gemini.chat_model).cyan());
            eprintln!(
                "  API Key: {}",
                style(mask_secret(provider.gemini.api_key.as_deref())).cyan()
            );
        }
        ProviderKind::Ollama => {
            match provider.ollama.ollama_url() {
                Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
                Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
            }
            eprintln!(
                "  Embedding Model: {}",
                style(&provider.ollama.embedding_model).cyan()
            );
            eprintln!("  Chat Model: {}", style(&provider.ollama.chat_model).cyan());
        }
    }
    eprintln!("  Batch Size: {}", style(provider.batch_size).cyan());
    eprintln!(
        "  Request Timeout: {}s",
        style(provider.timeout_seconds).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Chunking & Retrieval:").bold().yellow());
    eprintln!("  Chunk Size: {}", style(config.chunking.chunk_size).cyan());
    eprintln!(
        "  Chunk Overlap: {}",
        style(config.chunking.chunk_overlap).cyan()
    );
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());

    eprintln!();
    eprintln!("{}", style("Store:").bold().yellow());
    eprintln!(
        "  Database: {}",
        style(config.database_path().display()).cyan()
    );
    match config.store.embedding_dimension {
        Some(dimension) => eprintln!("  Embedding Dimension: {}", style(dimension).cyan()),
        None => eprintln!("  Embedding Dimension: {}", style("inferred").dim()),
    }
    if let Some(path) = &config.document.path {
        eprintln!("  Document: {}", style(path.display()).cyan());
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            }
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

/// Show only the last four characters of a secret
fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        None => "(not set)".to_string(),
        Some(secret) => {
            let count = secret.chars().count();
            if count <= 4 {
                "*".repeat(count)
            } else {
                let tail = secret.chars().skip(count - 4).collect::<String>();
                format!("{}{}", "*".repeat(8), tail)
            }
        }
    }
}

fn non_empty(input: &String) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("Value cannot be empty")
    } else {
        Ok(())
    }
}

fn configure_provider(config: &mut Config) -> Result<()> {
    let kinds = ProviderKind::ALL.map(ProviderKind::as_str);
    let default_index = ProviderKind::ALL
        .iter()
        .position(|&k| k == config.provider.kind)
        .unwrap_or(0);

    let kind_index = Select::new()
        .with_prompt("AI provider")
        .default(default_index)
        .items(&kinds)
        .interact()?;
    config.provider.kind = ProviderKind::ALL[kind_index];

    match config.provider.kind {
        ProviderKind::OpenAi => {
            let openai = &mut config.provider.openai;
            openai.embedding_model = Input::new()
                .with_prompt("Embedding model")
                .default(openai.embedding_model.clone())
                .validate_with(non_empty)
                .interact_text()?;
            openai.chat_model = Input::new()
                .with_prompt("Chat model")
                .default(openai.chat_model.clone())
                .validate_with(non_empty)
                .interact_text()?;
            openai.api_key = prompt_api_key(openai.api_key.take())?;
        }
        ProviderKind::Gemini => {
            let gemini = &mut config.provider.gemini;
            gemini.embedding_model = Input::new()
                .with_prompt("Embedding model")
                .default(gemini.embedding_model.clone())
                .validate_with(non_empty)
                .interact_text()?;
            gemini.chat_model = Input::new()
                .with_prompt("Chat model")
                .default(gemini.chat_model.clone())
                .validate_with(non_empty)
                .interact_text()?;
            gemini.api_key = prompt_api_key(gemini.api_key.take())?;
        }
        ProviderKind::Ollama => configure_ollama(&mut config.provider.ollama)?,
    }

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(config.provider.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    config.provider.set_batch_size(batch_size)?;

    Ok(())
}

fn prompt_api_key(current: Option<String>) -> Result<Option<String>> {
    let prompt = if current.is_some() {
        "API key (leave empty to keep the current key)"
    } else {
        "API key (leave empty to read it from the environment)"
    };

    let key = Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()?;

    Ok(if key.trim().is_empty() {
        current
    } else {
        Some(key.trim().to_string())
    })
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.embedding_model = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.embedding_model.clone())
        .validate_with(non_empty)
        .interact_text()?;

    ollama.chat_model = Input::new()
        .with_prompt("Chat model")
        .default(ollama.chat_model.clone())
        .validate_with(non_empty)
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;

    Ok(())
}

fn configure_chunking(config: &mut Config) -> Result<()> {
    let chunk_size: usize = Input::new()
        .with_prompt("Chunk size (characters)")
        .default(config.chunking.chunk_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Chunk size must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let chunk_overlap: usize = Input::new()
        .with_prompt("Chunk overlap (characters)")
        .default(config.chunking.chunk_overlap.min(chunk_size - 1))
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input >= chunk_size {
                Err("Overlap must be smaller than the chunk size")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let top_k: usize = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(config.retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Must retrieve at least one chunk")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.chunking.chunk_size = chunk_size;
    config.chunking.chunk_overlap = chunk_overlap;
    config.retrieval.top_k = top_k;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
