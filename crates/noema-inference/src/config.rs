//! Backend configuration resolved from the environment.

use noema_core::defaults;

/// Configuration shared by the Ollama-compatible backends.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `NOEMA_OLLAMA_URL` | `http://127.0.0.1:11434` | Base URL of the model server |
/// | `NOEMA_EXTRACT_MODEL` | `gpt-oss:20b` | Knowledge-extraction model |
/// | `NOEMA_VISION_MODEL` | `qwen3-vl:8b` | Vision description model |
/// | `NOEMA_EMBED_MODEL` | `nomic-embed-text` | Embedding model |
/// | `NOEMA_EMBED_DIM` | `768` | Embedding vector dimension |
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub base_url: String,
    pub extract_model: String,
    pub vision_model: String,
    pub embed_model: String,
    pub embed_dimension: usize,
    pub extract_timeout_secs: u64,
    pub vision_timeout_secs: u64,
    pub embed_timeout_secs: u64,
    pub image_fetch_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OLLAMA_URL.to_string(),
            extract_model: defaults::EXTRACT_MODEL.to_string(),
            vision_model: defaults::VISION_MODEL.to_string(),
            embed_model: defaults::EMBED_MODEL.to_string(),
            embed_dimension: defaults::EMBED_DIMENSION,
            extract_timeout_secs: defaults::EXTRACT_TIMEOUT_SECS,
            vision_timeout_secs: defaults::VISION_TIMEOUT_SECS,
            embed_timeout_secs: defaults::EMBED_TIMEOUT_SECS,
            image_fetch_timeout_secs: defaults::IMAGE_FETCH_TIMEOUT_SECS,
        }
    }
}

impl InferenceConfig {
    /// Create config from environment variables (with defaults).
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            base_url: std::env::var(defaults::ENV_OLLAMA_URL).unwrap_or(base.base_url),
            extract_model: std::env::var(defaults::ENV_EXTRACT_MODEL).unwrap_or(base.extract_model),
            vision_model: std::env::var(defaults::ENV_VISION_MODEL).unwrap_or(base.vision_model),
            embed_model: std::env::var(defaults::ENV_EMBED_MODEL).unwrap_or(base.embed_model),
            embed_dimension: std::env::var(defaults::ENV_EMBED_DIMENSION)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.embed_dimension),
            ..base
        }
    }

    /// Override the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the extraction model.
    pub fn with_extract_model(mut self, model: impl Into<String>) -> Self {
        self.extract_model = model.into();
        self
    }

    /// Override the vision model.
    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = model.into();
        self
    }

    /// Override the embedding model and dimension.
    pub fn with_embed_model(mut self, model: impl Into<String>, dimension: usize) -> Self {
        self.embed_model = model.into();
        self.embed_dimension = dimension;
        self
    }
}
