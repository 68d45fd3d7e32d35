use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Transient holding area for uploaded files; cleared after each
    /// ingestion cycle.
    pub scratch_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// `"local"` (durable SQLite index) or `"remote"` (hosted HTTP index).
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Location of the local index database.
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub remote: Option<RemoteIndexConfig>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_index_path(),
            remote: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteIndexConfig {
    /// Base URL of the hosted index (e.g. `https://my-index.svc.pinecone.io`).
    pub base_url: String,
    /// Environment variable holding the index API key.
    #[serde(default = "default_remote_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks of one document.
    /// Must be strictly smaller than `chunk_size`.
    #[serde(default)]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Glob patterns selecting which scratch files are eligible for loading.
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Results per query, fixed per retriever at creation.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Candidate pool width for flashcard generation.
    #[serde(default = "default_candidate_k")]
    pub candidate_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            candidate_k: default_candidate_k(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Flashcards produced per generation run unless overridden.
    #[serde(default = "default_max_flashcards")]
    pub max_flashcards: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_flashcards: default_max_flashcards(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dims")]
    pub embedding_dims: usize,
    /// Texts per embeddings API call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            embedding_dims: default_embedding_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_backend() -> String {
    "local".to_string()
}
fn default_index_path() -> PathBuf {
    PathBuf::from("./data/index.sqlite")
}
fn default_remote_key_env() -> String {
    "PINECONE_API_KEY".to_string()
}
fn default_chunk_size() -> usize {
    1000
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.pdf".to_string()]
}
fn default_k() -> usize {
    7
}
fn default_candidate_k() -> usize {
    20
}
fn default_max_flashcards() -> usize {
    5
}
fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_embedding_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking — an overlap that reaches the chunk size would never
    // advance through the text, so it is rejected at startup.
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        );
    }

    // Validate retrieval
    if config.retrieval.k < 1 {
        anyhow::bail!("retrieval.k must be >= 1");
    }
    if config.retrieval.candidate_k < 1 {
        anyhow::bail!("retrieval.candidate_k must be >= 1");
    }

    // Validate provider settings
    if config.openai.embedding_dims == 0 {
        anyhow::bail!("openai.embedding_dims must be > 0");
    }

    // Validate index backend
    match config.index.backend.as_str() {
        "local" => {}
        "remote" => {
            if config.index.remote.is_none() {
                anyhow::bail!("index.backend = \"remote\" requires an [index.remote] section");
            }
        }
        other => anyhow::bail!(
            "Unknown index backend: '{}'. Must be local or remote.",
            other
        ),
    }

    Ok(config)
}
