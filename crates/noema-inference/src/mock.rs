//! Mock inference backend for deterministic testing.
//!
//! Implements all three capability traits — extraction, vision, embedding —
//! with canned payloads, deterministic embeddings, scriptable failures, and
//! a call log for assertions.
//!
//! ## Usage
//!
//! ```rust
//! use noema_inference::mock::MockInferenceBackend;
//! use noema_core::ExtractionBackend;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let backend = MockInferenceBackend::new()
//!     .with_extraction_payload(json!({"summary": "A post", "topics": []}));
//!
//! let payload = backend.extract("some compound text").await.unwrap();
//! assert_eq!(payload["summary"], "A post");
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use noema_core::{
    EmbeddingBackend, Error, ExtractionBackend, Result, Vector, VisionBackend,
};

/// Mock inference backend for testing.
#[derive(Clone)]
pub struct MockInferenceBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    extraction_payload: JsonValue,
    extraction_overrides: HashMap<String, JsonValue>,
    ask_topics_payload: JsonValue,
    vision_description: String,
    vision_overrides: HashMap<String, String>,
    failing_vision_urls: HashSet<String>,
    fail_extraction: bool,
    fail_ask_topics: bool,
    fail_embedding: bool,
    failure_rate: f64,
}

/// One recorded backend invocation.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub input: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            extraction_payload: json!({}),
            extraction_overrides: HashMap::new(),
            ask_topics_payload: json!({ "topics": [] }),
            vision_description: "Mock image description".to_string(),
            vision_overrides: HashMap::new(),
            failing_vision_urls: HashSet::new(),
            fail_extraction: false,
            fail_ask_topics: false,
            fail_embedding: false,
            failure_rate: 0.0,
        }
    }
}

impl MockInferenceBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        Arc::make_mut(&mut self.config).dimension = dimension;
        self
    }

    /// Set the default extraction payload.
    pub fn with_extraction_payload(mut self, payload: JsonValue) -> Self {
        Arc::make_mut(&mut self.config).extraction_payload = payload;
        self
    }

    /// Set the extraction payload returned for a specific compound text.
    pub fn with_extraction_for(mut self, input: impl Into<String>, payload: JsonValue) -> Self {
        Arc::make_mut(&mut self.config)
            .extraction_overrides
            .insert(input.into(), payload);
        self
    }

    /// Set the payload returned by ask-topic mining.
    pub fn with_ask_topics_payload(mut self, payload: JsonValue) -> Self {
        Arc::make_mut(&mut self.config).ask_topics_payload = payload;
        self
    }

    /// Set the default vision description.
    pub fn with_vision_description(mut self, description: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).vision_description = description.into();
        self
    }

    /// Set the description returned for a specific image URL.
    pub fn with_vision_for(
        mut self,
        url: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .vision_overrides
            .insert(url.into(), description.into());
        self
    }

    /// Make vision calls for the given URL fail.
    pub fn with_failing_vision_url(mut self, url: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config)
            .failing_vision_urls
            .insert(url.into());
        self
    }

    /// Make every extraction call fail.
    pub fn with_failing_extraction(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_extraction = true;
        self
    }

    /// Make every ask-topic mining call fail.
    pub fn with_failing_ask_topics(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_ask_topics = true;
        self
    }

    /// Make every embedding call fail.
    pub fn with_failing_embedding(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_embedding = true;
        self
    }

    /// Set failure rate (0.0 - 1.0) for testing error handling.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.call_log.lock().unwrap().clear()
    }

    /// Number of calls for the given operation name.
    pub fn call_count(&self, operation: &str) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    fn log_call(&self, operation: &str, input: &str) {
        self.call_log.lock().unwrap().push(MockCall {
            operation: operation.to_string(),
            input: input.to_string(),
        });
    }

    fn should_fail(&self) -> bool {
        use rand::Rng;
        if self.config.failure_rate > 0.0 {
            rand::thread_rng().gen::<f64>() < self.config.failure_rate
        } else {
            false
        }
    }
}

impl Default for MockInferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtractionBackend for MockInferenceBackend {
    async fn extract(&self, compound_text: &str) -> Result<JsonValue> {
        self.log_call("extract", compound_text);

        if self.config.fail_extraction || self.should_fail() {
            return Err(Error::Extraction("Simulated extraction failure".into()));
        }

        if let Some(payload) = self.config.extraction_overrides.get(compound_text) {
            return Ok(payload.clone());
        }
        Ok(self.config.extraction_payload.clone())
    }

    async fn mine_ask_topics(
        &self,
        asks: &[String],
        _known_topics: &[String],
    ) -> Result<JsonValue> {
        self.log_call("mine_ask_topics", &asks.join("; "));

        if self.config.fail_ask_topics || self.should_fail() {
            return Err(Error::Extraction("Simulated mining failure".into()));
        }
        Ok(self.config.ask_topics_payload.clone())
    }

    fn model_name(&self) -> &str {
        "mock-extract"
    }
}

#[async_trait]
impl VisionBackend for MockInferenceBackend {
    async fn describe_image(&self, image_url: &str, _context: Option<&str>) -> Result<String> {
        self.log_call("describe_image", image_url);

        if self.config.failing_vision_urls.contains(image_url) || self.should_fail() {
            return Err(Error::Vision(format!(
                "Simulated vision failure for {}",
                image_url
            )));
        }

        if let Some(description) = self.config.vision_overrides.get(image_url) {
            return Ok(description.clone());
        }
        Ok(self.config.vision_description.clone())
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}

#[async_trait]
impl EmbeddingBackend for MockInferenceBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        for text in texts {
            self.log_call("embed", text);
        }

        if self.config.fail_embedding || self.should_fail() {
            return Err(Error::Embedding("Simulated embedding failure".into()));
        }

        Ok(texts
            .iter()
            .map(|t| deterministic_embedding(t, self.config.dimension))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

/// Generate a deterministic unit-length embedding from text.
///
/// Uses character-based hashing for reproducibility: the same text always
/// produces the same vector.
pub fn deterministic_embedding(text: &str, dimension: usize) -> Vector {
    let mut vec = vec![0.0f32; dimension];
    for (i, c) in text.chars().enumerate() {
        let idx = (c as usize + i) % dimension;
        vec[idx] += 0.1;
    }

    let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        vec.iter_mut().for_each(|x| *x /= magnitude);
    }
    vec
}
