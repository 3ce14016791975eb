//! # noema-inference
//!
//! Model backend abstraction for the noema pipeline.
//!
//! This crate provides:
//! - Ollama-compatible knowledge-extraction and embedding backend
//! - Ollama-compatible vision backend for image description
//! - Prompt and response-schema definitions for the extraction calls
//! - A deterministic mock backend for tests (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use noema_inference::OllamaBackend;
//! use noema_core::ExtractionBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OllamaBackend::from_env();
//!     let payload = backend.extract("Looking for a co-founder").await.unwrap();
//!     println!("{}", payload);
//! }
//! ```

pub mod config;
pub mod ollama;
pub mod prompts;
pub mod vision;

// Mock inference backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::InferenceConfig;
pub use ollama::OllamaBackend;
pub use vision::OllamaVisionBackend;
