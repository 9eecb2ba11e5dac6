use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub board: BoardConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BoardConfig {
    /// Bulletin list page; its first table row links the newest report.
    pub list_url: String,
    /// Base URL relative links on the board resolve against.
    pub base_url: String,
    #[serde(default = "default_board_timeout_secs")]
    pub timeout_secs: u64,
    /// Where the attachment is streamed before extraction. System temp
    /// directory when unset.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

fn default_board_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Canonical index directory. Rebuilds stage into a sibling directory
    /// and swap in by rename; see the index module.
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            separator: default_separator(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_overlap() -> usize {
    100
}
fn default_separator() -> String {
    "\n".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Endpoint override (Ollama host, for instance).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    pub provider: String,
    pub model: String,
    /// Base URL override (OpenAI-compatible router or Ollama host).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_generation_timeout_secs() -> u64 {
    60
}
fn default_max_tokens() -> u32 {
    512
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    pub webhook_url: String,
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_notify_timeout_secs() -> u64 {
    10
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate board
    url::Url::parse(&config.board.base_url)
        .with_context(|| format!("board.base_url is not a valid URL: {}", config.board.base_url))?;
    url::Url::parse(&config.board.list_url)
        .with_context(|| format!("board.list_url is not a valid URL: {}", config.board.list_url))?;

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be smaller than chunking.chunk_size");
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "local" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local, openai, or ollama.",
            other
        ),
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    if config.embedding.provider != "local" {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    // Validate generation
    match config.generation.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be openai or ollama.",
            other
        ),
    }

    // Validate notify
    if config.notify.webhook_url.trim().is_empty() {
        anyhow::bail!("notify.webhook_url must not be empty");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const VALID: &str = r#"
[board]
list_url = "https://board.example.go.kr/list.do?bbsId=B1"
base_url = "https://board.example.go.kr"

[index]
dir = "/var/lib/briefbot/index"

[generation]
provider = "openai"
model = "gpt-4o-mini"

[notify]
webhook_url = "https://hooks.example.com/services/T/B/x"
"#;

    #[test]
    fn valid_config_with_defaults() {
        let file = write_config(VALID);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.overlap, 100);
        assert_eq!(config.chunking.separator, "\n");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.embedding.provider, "local");
        assert_eq!(config.notify.timeout_secs, 10);
        assert_eq!(config.board.timeout_secs, 30);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let content = format!(
            "{}\n[chunking]\nchunk_size = 100\noverlap = 100\n",
            VALID
        );
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn remote_embedding_requires_model_and_dims() {
        let content = format!("{}\n[embedding]\nprovider = \"ollama\"\n", VALID);
        let file = write_config(&content);
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn unknown_generation_provider_rejected() {
        let content = VALID.replace("provider = \"openai\"", "provider = \"bedrock\"");
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("generation provider"));
    }

    #[test]
    fn invalid_base_url_rejected() {
        let content = VALID.replace("https://board.example.go.kr\"", "not a url\"");
        let file = write_config(&content);
        assert!(load_config(file.path()).is_err());
    }
}
