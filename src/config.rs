//! Configuration loaded from environment variables at startup.
//!
//! Settings are read once into explicit structs and passed by reference into
//! every component constructor; no component reads the environment on its own.
//! `delete` needs only [`SearchSettings`]; `upload` needs the full
//! [`IngestSettings`].

use std::env;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Two settings are individually valid but mutually inconsistent.
    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

/// Settings required to reach the search index (upload and delete).
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Base URL of the search service.
    pub search_endpoint: String,
    /// Admin key sent with every index request.
    pub search_admin_key: String,
    /// Dimensionality of the stored content vectors.
    pub vector_dimension: usize,
    /// Number of records submitted per index batch.
    pub upload_batch_size: usize,
    /// Per-request HTTP timeout applied to every external call, in seconds.
    pub http_timeout_secs: u64,
}

/// Full settings for the upload operation.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Search index settings shared with the delete operation.
    pub search: SearchSettings,
    /// Blob store connection string (`BlobEndpoint=…;SharedAccessSignature=…`).
    pub blob_connection_string: String,
    /// Queue connection string (`QueueEndpoint=…;SharedAccessSignature=…`).
    pub queue_connection_string: String,
    /// Name of the queue receiving indexed-file notifications.
    pub queue_name: String,
    /// Base URL of the layout-analysis service.
    pub layout_endpoint: String,
    /// API key for the layout-analysis service.
    pub layout_api_key: String,
    /// Full URL of the vision-description endpoint.
    pub vision_endpoint: String,
    /// API key for the vision-description endpoint.
    pub vision_api_key: String,
    /// Base URL of the embedding service.
    pub embedding_endpoint: String,
    /// API key for the embedding service.
    pub embedding_api_key: String,
    /// Embedding model deployment name.
    pub embedding_deployment: String,
    /// API version sent to the embedding service.
    pub embedding_api_version: String,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Overlap between adjacent chunks in characters.
    pub chunk_overlap: usize,
}

impl SearchSettings {
    /// Load search settings from environment variables, validating as we go.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vector_dimension = load_env_parsed("VECTOR_DIMENSION", 1536)?;
        if vector_dimension == 0 {
            return Err(ConfigError::InvalidValue("VECTOR_DIMENSION".to_string()));
        }
        let upload_batch_size = load_env_parsed("UPLOAD_BATCH_SIZE", 50)?;
        if upload_batch_size == 0 {
            return Err(ConfigError::InvalidValue("UPLOAD_BATCH_SIZE".to_string()));
        }

        Ok(Self {
            search_endpoint: load_env("SEARCH_ENDPOINT")?,
            search_admin_key: load_env("SEARCH_ADMIN_KEY")?,
            vector_dimension,
            upload_batch_size,
            http_timeout_secs: load_env_parsed("HTTP_TIMEOUT_SECS", 60)?,
        })
    }
}

impl IngestSettings {
    /// Load the full upload configuration from environment variables.
    ///
    /// Fails fast on missing variables, unparseable numbers, and an overlap
    /// that is not strictly smaller than the chunk size.
    pub fn from_env() -> Result<Self, ConfigError> {
        let chunk_size: usize = load_env_parsed("CHUNK_SIZE", 1000)?;
        let chunk_overlap: usize = load_env_parsed("CHUNK_OVERLAP", 200)?;
        if chunk_size == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_SIZE".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::Inconsistent(
                "CHUNK_OVERLAP must be smaller than CHUNK_SIZE".to_string(),
            ));
        }

        Ok(Self {
            search: SearchSettings::from_env()?,
            blob_connection_string: load_env("BLOB_CONNECTION_STRING")?,
            queue_connection_string: load_env("QUEUE_CONNECTION_STRING")?,
            queue_name: load_env("QUEUE_NAME")?,
            layout_endpoint: load_env("LAYOUT_ENDPOINT")?,
            layout_api_key: load_env("LAYOUT_API_KEY")?,
            vision_endpoint: load_env("VISION_ENDPOINT")?,
            vision_api_key: load_env("VISION_API_KEY")?,
            embedding_endpoint: load_env("EMBEDDING_ENDPOINT")?,
            embedding_api_key: load_env("EMBEDDING_API_KEY")?,
            embedding_deployment: load_env("EMBEDDING_DEPLOYMENT")?,
            embedding_api_version: load_env_optional("EMBEDDING_API_VERSION")
                .unwrap_or_else(|| "2024-02-01".to_string()),
            chunk_size,
            chunk_overlap,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}
