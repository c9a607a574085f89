use super::*;
use std::collections::HashMap;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect::<HashMap<_, _>>();
    move |name| map.get(name).cloned()
}

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.provider.kind, ProviderKind::OpenAi);
    assert_eq!(config.provider.openai.embedding_model, "text-embedding-3-small");
    assert_eq!(config.provider.gemini.chat_model, "gemini-2.5-flash-lite");
    assert_eq!(config.provider.ollama.port, 11434);
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.chunking.chunk_overlap, 150);
    assert_eq!(config.retrieval.top_k, 10);
    assert_eq!(config.store.embedding_dimension, None);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid = config.clone();
    invalid.provider.batch_size = 0;
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidBatchSize(0))
    ));

    let mut invalid = config.clone();
    invalid.provider.ollama.protocol = "ftp".to_string();
    assert!(invalid.validate().is_err());

    let mut invalid = config.clone();
    invalid.provider.openai.chat_model = "  ".to_string();
    assert!(matches!(
        invalid.validate(),
        Err(ConfigError::InvalidModel("openai"))
    ));

    let mut invalid = config.clone();
    invalid.chunking.chunk_overlap = invalid.chunking.chunk_size;
    assert!(matches!(invalid.validate(), Err(ConfigError::Chunking(_))));

    let mut invalid = config.clone();
    invalid.retrieval.top_k = 0;
    assert!(matches!(invalid.validate(), Err(ConfigError::InvalidTopK(0))));

    let mut invalid = config;
    invalid.store.embedding_dimension = Some(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn environment_overrides() {
    let mut config = Config::default();
    config
        .apply_env(env(&[
            ("AI_PROVIDER", "Gemini"),
            ("GEMINI_API_KEY", "gm-test"),
            ("GEMINI_CHAT_MODEL", "custom-chat-model"),
            ("PDF_PATH", "/tmp/manual.pdf"),
            ("CHUNK_SIZE", "500"),
            ("CHUNK_OVERLAP", "50"),
            ("TOP_K", "4"),
            ("EMBEDDING_DIMENSION", "768"),
            ("OLLAMA_PORT", "9999"),
        ]))
        .expect("overrides should apply");

    assert_eq!(config.provider.kind, ProviderKind::Gemini);
    assert_eq!(config.provider.gemini.api_key.as_deref(), Some("gm-test"));
    assert_eq!(config.provider.gemini.chat_model, "custom-chat-model");
    assert_eq!(
        config.document.path.as_deref(),
        Some(Path::new("/tmp/manual.pdf"))
    );
    assert_eq!(config.chunking.chunk_size, 500);
    assert_eq!(config.chunking.chunk_overlap, 50);
    assert_eq!(config.retrieval.top_k, 4);
    assert_eq!(config.store.embedding_dimension, Some(768));
    assert_eq!(config.provider.ollama.port, 9999);
}

#[test]
fn blank_environment_values_are_ignored() {
    let mut config = Config::default();
    config
        .apply_env(env(&[("OPENAI_CHAT_MODEL", "   "), ("PDF_PATH", "")]))
        .expect("overrides should apply");

    assert_eq!(config.provider.openai.chat_model, "gpt-5-nano");
    assert_eq!(config.document.path, None);
}

#[test]
fn invalid_environment_values_are_reported() {
    let mut config = Config::default();
    let err = config
        .apply_env(env(&[("CHUNK_SIZE", "lots")]))
        .expect_err("non-numeric chunk size should fail");
    assert!(matches!(
        err,
        ConfigError::InvalidEnvValue {
            variable: "CHUNK_SIZE",
            ..
        }
    ));

    let err = config
        .apply_env(env(&[("AI_PROVIDER", "anthropic")]))
        .expect_err("unknown provider should fail");
    assert!(matches!(err, ConfigError::InvalidProvider(p) if p == "anthropic"));
}

#[test]
fn missing_api_key_is_a_config_error() {
    let config = Config::default();
    let err = config
        .require_api_key()
        .expect_err("openai requires a key");
    assert!(matches!(
        err,
        ConfigError::MissingApiKey {
            provider: ProviderKind::OpenAi,
            variable: "OPENAI_API_KEY"
        }
    ));
    assert!(err.to_string().contains("OPENAI_API_KEY"));

    let mut config = Config::default();
    config.provider.kind = ProviderKind::Ollama;
    assert_eq!(config.require_api_key().expect("ollama needs no key"), None);

    config.provider.kind = ProviderKind::Gemini;
    config.provider.gemini.api_key = Some("gm-test".to_string());
    assert_eq!(
        config.require_api_key().expect("key is set"),
        Some("gm-test")
    );
}

#[test]
fn toml_serialization() {
    let mut config = Config::default();
    config.provider.openai.api_key = Some("sk-test".to_string());
    config.store.embedding_dimension = Some(1536);

    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed);
}

#[test]
fn partial_toml_uses_defaults() {
    let parsed: Config = toml::from_str(
        r#"
        [provider]
        kind = "ollama"

        [chunking]
        chunk_size = 400
        "#,
    )
    .expect("should parse partial toml");

    assert_eq!(parsed.provider.kind, ProviderKind::Ollama);
    assert_eq!(parsed.provider.batch_size, 64);
    assert_eq!(parsed.chunking.chunk_size, 400);
    assert_eq!(parsed.chunking.chunk_overlap, 150);
    assert_eq!(parsed.retrieval.top_k, 10);
}

#[test]
fn load_save_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let mut config = Config::load_with_env(temp_dir.path(), env(&[])).expect("defaults load");
    assert_eq!(config.base_dir, temp_dir.path());
    assert_eq!(config.database_path(), temp_dir.path().join("rag.db"));

    config.provider.kind = ProviderKind::Ollama;
    config.retrieval.top_k = 3;
    config.save().expect("config should save");
    assert!(temp_dir.path().join("config.toml").exists());

    let loaded = Config::load_with_env(temp_dir.path(), env(&[("TOP_K", "7")]))
        .expect("saved config should load");
    assert_eq!(loaded.provider.kind, ProviderKind::Ollama);
    assert_eq!(loaded.retrieval.top_k, 7);
}

#[test]
fn load_rejects_invalid_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[retrieval]\ntop_k = 0\n",
    )
    .expect("should write config");

    let result = Config::load_with_env(temp_dir.path(), env(&[]));
    assert!(matches!(result, Err(ConfigError::InvalidTopK(0))));

    fs::write(temp_dir.path().join("config.toml"), "[provider\nkind = 1")
        .expect("should write config");
    let result = Config::load_with_env(temp_dir.path(), env(&[]));
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn ollama_setters() {
    let mut ollama = OllamaConfig::default();
    assert!(ollama.set_protocol("https".to_string()).is_ok());
    assert!(ollama.set_host("example.com".to_string()).is_ok());
    assert!(ollama.set_port(8080).is_ok());

    assert!(ollama.set_protocol("ftp".to_string()).is_err());
    assert!(ollama.set_port(0).is_err());
    assert_eq!(
        ollama.ollama_url().expect("url is valid").as_str(),
        "https://example.com:8080/"
    );
}

#[test]
fn database_path_override() {
    let config = Config {
        store: StoreConfig {
            database_path: Some(PathBuf::from("/var/lib/rag/store.db")),
            ..StoreConfig::default()
        },
        ..Config::default()
    };
    assert_eq!(
        config.database_path(),
        PathBuf::from("/var/lib/rag/store.db")
    );
}
