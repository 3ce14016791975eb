//! Ollama inference backend for extraction and embedding.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, instrument, warn};

use noema_core::{EmbeddingBackend, Error, ExtractionBackend, Result, Vector};

use crate::config::InferenceConfig;
use crate::prompts;

/// Ollama backend implementing knowledge extraction and embedding.
pub struct OllamaBackend {
    client: Client,
    config: InferenceConfig,
}

impl OllamaBackend {
    /// Create a backend with the given configuration.
    pub fn new(config: InferenceConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self::new(InferenceConfig::from_env())
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Shared chat call with JSON format enforcement.
    ///
    /// Uses `/api/chat`, which separates thinking/reasoning from the final
    /// response content. Thinking is disabled for JSON calls so the content
    /// is exactly the structured payload.
    async fn chat_json(&self, system: &str, prompt: &str, format: JsonValue) -> Result<JsonValue> {
        let start = Instant::now();

        let request = ChatRequest {
            model: self.config.extract_model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: false,
            format: Some(format),
            think: Some(false),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.config.base_url))
            .timeout(Duration::from_secs(self.config.extract_timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Extraction(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Extraction(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Extraction(format!("Failed to parse response: {}", e)))?;

        let payload: JsonValue = serde_json::from_str(&result.message.content).map_err(|e| {
            Error::Extraction(format!("Model returned invalid JSON: {}", e))
        })?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            duration_ms = elapsed,
            prompt_len = prompt.len(),
            "Extraction call complete"
        );
        if elapsed > 30_000 {
            warn!(duration_ms = elapsed, slow = true, "Slow extraction call");
        }
        Ok(payload)
    }
}

/// Chat API message for `/api/chat`.
#[derive(Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Request payload for the Ollama `/api/chat` endpoint.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    /// Ollama format enforcement: a JSON schema the response must satisfy.
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<JsonValue>,
    /// Disable thinking/reasoning for models that support it.
    #[serde(skip_serializing_if = "Option::is_none")]
    think: Option<bool>,
}

/// Response from the Ollama `/api/chat` endpoint.
#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl ExtractionBackend for OllamaBackend {
    #[instrument(skip(self, compound_text), fields(subsystem = "inference", component = "ollama", op = "extract", model = %self.config.extract_model, prompt_len = compound_text.len()))]
    async fn extract(&self, compound_text: &str) -> Result<JsonValue> {
        self.chat_json(
            prompts::EXTRACT_SYSTEM,
            &prompts::format_extract_prompt(compound_text),
            prompts::extract_format(),
        )
        .await
    }

    #[instrument(skip(self, asks, known_topics), fields(subsystem = "inference", component = "ollama", op = "mine_ask_topics", model = %self.config.extract_model, result_count = asks.len()))]
    async fn mine_ask_topics(
        &self,
        asks: &[String],
        known_topics: &[String],
    ) -> Result<JsonValue> {
        self.chat_json(
            prompts::ASK_TOPICS_SYSTEM,
            &prompts::format_ask_topics_prompt(asks, known_topics),
            prompts::ask_topics_format(),
        )
        .await
    }

    fn model_name(&self) -> &str {
        &self.config.extract_model
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaBackend {
    #[instrument(skip(self, texts), fields(subsystem = "inference", component = "ollama", op = "embed_texts", model = %self.config.embed_model, result_count = texts.len()))]
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let request = EmbeddingRequest {
            model: self.config.embed_model.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.config.base_url))
            .timeout(Duration::from_secs(self.config.embed_timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse response: {}", e)))?;

        if result.embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                result.embeddings.len()
            )));
        }

        Ok(result.embeddings)
    }

    fn dimension(&self) -> usize {
        self.config.embed_dimension
    }

    fn model_name(&self) -> &str {
        &self.config.embed_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_model_names() {
        let backend = OllamaBackend::new(
            InferenceConfig::default()
                .with_extract_model("qwen3:8b")
                .with_embed_model("nomic-embed-text", 768),
        );
        assert_eq!(ExtractionBackend::model_name(&backend), "qwen3:8b");
        assert_eq!(EmbeddingBackend::model_name(&backend), "nomic-embed-text");
        assert_eq!(backend.dimension(), 768);
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "gpt-oss:20b".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }],
            stream: false,
            format: Some(prompts::extract_format()),
            think: Some(false),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-oss:20b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["think"], false);
        assert!(json["format"].is_object());
    }

    #[test]
    fn test_chat_request_omits_absent_fields() {
        let request = ChatRequest {
            model: "gpt-oss:20b".to_string(),
            messages: vec![],
            stream: false,
            format: None,
            think: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("format").is_none());
        assert!(json.get("think").is_none());
    }

    #[test]
    fn test_embedding_response_deserialization() {
        let json = r#"{"embeddings": [[0.1, 0.2], [0.3, 0.4]]}"#;
        let response: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.embeddings.len(), 2);
        assert_eq!(response.embeddings[0], vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn test_embed_texts_empty_input_short_circuits() {
        // No server needed: the empty input path returns before any request.
        let backend = OllamaBackend::new(InferenceConfig::default());
        let result = backend.embed_texts(&[]).await.unwrap();
        assert!(result.is_empty());
    }
}
