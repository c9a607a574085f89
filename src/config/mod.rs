// Configuration management module
// TOML file in the config directory, overridden by environment variables

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, DocumentConfig, GeminiConfig, OllamaConfig, OpenAiConfig,
    ProviderConfig, ProviderKind, RetrievalConfig, StoreConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
