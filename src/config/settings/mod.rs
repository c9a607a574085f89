#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::chunking::{ChunkingConfig, ChunkingError};

pub const DEFAULT_TOP_K: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Gemini,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::OpenAi, Self::Gemini, Self::Ollama];

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::InvalidProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub batch_size: u32,
    pub timeout_seconds: u64,
    pub openai: OpenAiConfig,
    pub gemini: GeminiConfig,
    pub ollama: OllamaConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            batch_size: 64,
            timeout_seconds: 60,
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-5-nano".to_string(),
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            embedding_model: "models/embedding-001".to_string(),
            chat_model: "gemini-2.5-flash-lite".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub embedding_model: String,
    pub chat_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            embedding_model: "nomic-embed-text:latest".to_string(),
            chat_model: "llama3.2:latest".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file; defaults to `rag.db` in the config directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    pub max_connections: u32,
    pub busy_timeout_seconds: u64,
    /// When set, every embedding must have exactly this many dimensions.
    /// Otherwise the dimension is taken from the first embedding of an ingestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_dimension: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            max_connections: 5,
            busy_timeout_seconds: 30,
            embedding_dimension: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DocumentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid request timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid model name for {0} (cannot be empty)")]
    InvalidModel(&'static str),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Unknown AI provider: {0} (expected 'openai', 'gemini' or 'ollama')")]
    InvalidProvider(String),
    #[error("Invalid top_k: {0} (must be at least 1)")]
    InvalidTopK(usize),
    #[error("Invalid max connections: {0} (must be between 1 and 64)")]
    InvalidMaxConnections(u32),
    #[error("Invalid embedding dimension: {0} (must be greater than 0)")]
    InvalidEmbeddingDimension(usize),
    #[error("Invalid chunking settings: {0}")]
    Chunking(#[from] ChunkingError),
    #[error("Missing API key for {provider}: set {variable} or provider.{provider}.api_key")]
    MissingApiKey {
        provider: ProviderKind,
        variable: &'static str,
    },
    #[error("No document path provided: pass a path or set PDF_PATH")]
    MissingDocumentPath,
    #[error("Invalid value for {variable}: {value:?}")]
    InvalidEnvValue {
        variable: &'static str,
        value: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load `config.toml` from `config_dir`, apply environment overrides and validate
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        Self::load_with_env(config_dir, |name| std::env::var(name).ok())
    }

    /// Like [`Config::load`], reading overrides through `lookup` instead of the
    /// process environment
    #[inline]
    pub fn load_with_env<P, F>(config_dir: P, lookup: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_file(config_dir)?;
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` without applying overrides or validating
    #[inline]
    pub fn load_file<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_path = config_dir.as_ref().join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            Self::default()
        };
        config.base_dir = config_dir.as_ref().to_path_buf();

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<(), ConfigError> {
        self.validate()?;

        fs::create_dir_all(self.get_base_dir())?;

        let content = toml::to_string_pretty(self)?;
        fs::write(self.config_file_path(), content)?;

        Ok(())
    }

    /// Default configuration directory (`~/.pdf-rag`)
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".pdf-rag"))
            .or_else(|| dirs::data_dir().map(|data| data.join("pdf-rag")))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Path of the SQLite vector store
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.store
            .database_path
            .clone()
            .unwrap_or_else(|| self.get_base_dir().join("rag.db"))
    }

    /// Apply recognised environment variables on top of the current values
    #[inline]
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(kind) = get("AI_PROVIDER") {
            self.provider.kind = kind.parse()?;
        }

        let openai = &mut self.provider.openai;
        if let Some(key) = get("OPENAI_API_KEY") {
            openai.api_key = Some(key);
        }
        if let Some(model) = get("OPENAI_EMBEDDING_MODEL") {
            openai.embedding_model = model;
        }
        if let Some(model) = get("OPENAI_CHAT_MODEL") {
            openai.chat_model = model;
        }

        let gemini = &mut self.provider.gemini;
        if let Some(key) = get("GEMINI_API_KEY") {
            gemini.api_key = Some(key);
        }
        if let Some(model) = get("GEMINI_EMBEDDING_MODEL") {
            gemini.embedding_model = model;
        }
        if let Some(model) = get("GEMINI_CHAT_MODEL") {
            gemini.chat_model = model;
        }

        let ollama = &mut self.provider.ollama;
        if let Some(host) = get("OLLAMA_HOST") {
            ollama.host = host;
        }
        if let Some(port) = get("OLLAMA_PORT") {
            ollama.port = parse_env("OLLAMA_PORT", &port)?;
        }
        if let Some(model) = get("OLLAMA_EMBEDDING_MODEL") {
            ollama.embedding_model = model;
        }
        if let Some(model) = get("OLLAMA_CHAT_MODEL") {
            ollama.chat_model = model;
        }

        if let Some(path) = get("PDF_PATH") {
            self.document.path = Some(PathBuf::from(path));
        }
        if let Some(size) = get("CHUNK_SIZE") {
            self.chunking.chunk_size = parse_env("CHUNK_SIZE", &size)?;
        }
        if let Some(overlap) = get("CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_env("CHUNK_OVERLAP", &overlap)?;
        }
        if let Some(top_k) = get("TOP_K") {
            self.retrieval.top_k = parse_env("TOP_K", &top_k)?;
        }
        if let Some(path) = get("RAG_DATABASE_PATH") {
            self.store.database_path = Some(PathBuf::from(path));
        }
        if let Some(dimension) = get("EMBEDDING_DIMENSION") {
            self.store.embedding_dimension = Some(parse_env("EMBEDDING_DIMENSION", &dimension)?);
        }

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.validate()?;
        self.chunking.validate()?;

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::InvalidTopK(self.retrieval.top_k));
        }

        if !(1..=64).contains(&self.store.max_connections) {
            return Err(ConfigError::InvalidMaxConnections(
                self.store.max_connections,
            ));
        }

        if self.store.embedding_dimension == Some(0) {
            return Err(ConfigError::InvalidEmbeddingDimension(0));
        }

        Ok(())
    }

    /// API key of the selected provider, failing before any request is made
    #[inline]
    pub fn require_api_key(&self) -> Result<Option<&str>, ConfigError> {
        let (key, variable) = match self.provider.kind {
            ProviderKind::OpenAi => (self.provider.openai.api_key.as_deref(), "OPENAI_API_KEY"),
            ProviderKind::Gemini => (self.provider.gemini.api_key.as_deref(), "GEMINI_API_KEY"),
            ProviderKind::Ollama => return Ok(None),
        };

        match key.map(str::trim) {
            Some(key) if !key.is_empty() => Ok(Some(key)),
            _ => Err(ConfigError::MissingApiKey {
                provider: self.provider.kind,
                variable,
            }),
        }
    }
}

fn parse_env<T: std::str::FromStr>(variable: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvValue {
            variable,
            value: value.to_string(),
        })
}

fn validate_base_url(url: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidProtocol(parsed.scheme().to_string()));
    }
    Ok(parsed)
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        self.openai.validate()?;
        self.gemini.validate()?;
        self.ollama.validate()?;
        Ok(())
    }

    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }
}

impl OpenAiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.base_url)?;
        if self.embedding_model.trim().is_empty() || self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel("openai"));
        }
        Ok(())
    }
}

impl GeminiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.base_url)?;
        if self.embedding_model.trim().is_empty() || self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel("gemini"));
        }
        Ok(())
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        self.ollama_url()?;

        if self.embedding_model.trim().is_empty() || self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel("ollama"));
        }

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        if protocol != "http" && protocol != "https" {
            return Err(ConfigError::InvalidProtocol(protocol));
        }
        self.protocol = protocol;
        Ok(())
    }

    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let temp_config = OllamaConfig {
            host: host.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.host = host;
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }
}
