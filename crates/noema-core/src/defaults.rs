//! Centralized default constants for the noema pipeline.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. When adding new constants, place them in the appropriate section.

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default knowledge-extraction model name (Ollama).
pub const EXTRACT_MODEL: &str = "gpt-oss:20b";

/// Default vision model name (Ollama).
pub const VISION_MODEL: &str = "qwen3-vl:8b";

/// Default embedding model name (Ollama).
pub const EMBED_MODEL: &str = "nomic-embed-text";

/// Default embedding vector dimension for nomic-embed-text.
pub const EMBED_DIMENSION: usize = 768;

/// Timeout for knowledge-extraction requests in seconds.
pub const EXTRACT_TIMEOUT_SECS: u64 = 120;

/// Timeout for vision description requests in seconds.
pub const VISION_TIMEOUT_SECS: u64 = 120;

/// Timeout for embedding requests in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Timeout for fetching a referenced image over HTTP in seconds.
pub const IMAGE_FETCH_TIMEOUT_SECS: u64 = 20;

// =============================================================================
// INDEXING
// =============================================================================

/// Interest-score increment applied per topic touched by an authored note.
pub const INTEREST_INCREMENT: f32 = 0.1;

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

/// Override for the Ollama base URL.
pub const ENV_OLLAMA_URL: &str = "NOEMA_OLLAMA_URL";

/// Override for the extraction model.
pub const ENV_EXTRACT_MODEL: &str = "NOEMA_EXTRACT_MODEL";

/// Override for the vision model.
pub const ENV_VISION_MODEL: &str = "NOEMA_VISION_MODEL";

/// Override for the embedding model.
pub const ENV_EMBED_MODEL: &str = "NOEMA_EMBED_MODEL";

/// Override for the embedding dimension.
pub const ENV_EMBED_DIMENSION: &str = "NOEMA_EMBED_DIM";

/// Override for the interest increment.
pub const ENV_INTEREST_INCREMENT: &str = "NOEMA_INTEREST_INCREMENT";

/// Selects the extraction variant: `intentions` or `ask_mining`.
pub const ENV_EXTRACTION_VARIANT: &str = "NOEMA_EXTRACTION_VARIANT";
