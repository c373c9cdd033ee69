use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Errors encountered while loading configuration from environment
/// variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration assembled at process start.
///
/// Loaded once by the host application and handed to
/// [`crate::pipeline::DocumentService::from_config`]; pipeline components
/// never read the environment themselves.
#[derive(Debug, Clone)]
pub struct Config {
    /// Embedding backend used to produce vectors.
    pub embedding_provider: EmbeddingProvider,
    /// Model identifier passed to remote embedding providers.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// API key for the OpenAI provider.
    pub openai_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible endpoint.
    pub openai_base_url: String,
    /// API key for the Hugging Face provider.
    pub huggingface_api_key: Option<String>,
    /// Base URL of the Hugging Face inference API.
    pub huggingface_base_url: String,
    /// Document store backend.
    pub store_backend: StoreBackend,
    /// Root directory of the disk store.
    pub data_dir: PathBuf,
    /// Maximum number of files extracted concurrently.
    pub extraction_limit: usize,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Local deterministic hashing backend; needs no credentials.
    Hashing,
    /// Hosted OpenAI-compatible embeddings API.
    OpenAi,
    /// Hugging Face inference API.
    HuggingFace,
}

/// Supported document store backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    /// Volatile in-memory store.
    Memory,
    /// Durable one-file-per-record store.
    Disk,
}

impl Config {
    /// Load configuration from environment variables, reading a `.env`
    /// file first when one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self {
            embedding_provider: parse_or_default(
                "EMBEDDING_PROVIDER",
                EmbeddingProvider::Hashing,
            )?,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| "all-MiniLM-L6-v2".to_string()),
            embedding_dimension: parse_or_default("EMBEDDING_DIMENSION", 384)?,
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            huggingface_api_key: load_env_optional("HUGGINGFACE_API_KEY"),
            huggingface_base_url: load_env_optional("HUGGINGFACE_BASE_URL")
                .unwrap_or_else(|| "https://api-inference.huggingface.co".to_string()),
            store_backend: parse_or_default("DOCSHELF_STORE", StoreBackend::Memory)?,
            data_dir: PathBuf::from(
                load_env_optional("DOCSHELF_DATA_DIR").unwrap_or_else(|| "./data".to_string()),
            ),
            extraction_limit: parse_or_default("DOCSHELF_EXTRACTION_LIMIT", 4)?,
        };
        tracing::debug!(
            provider = ?config.embedding_provider,
            model = %config.embedding_model,
            dimension = config.embedding_dimension,
            store = ?config.store_backend,
            "Loaded configuration"
        );
        Ok(config)
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or_default<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hashing" => Ok(Self::Hashing),
            "openai" => Ok(Self::OpenAi),
            "huggingface" => Ok(Self::HuggingFace),
            _ => Err(()),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "disk" => Ok(Self::Disk),
            _ => Err(()),
        }
    }
}
