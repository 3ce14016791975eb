//! Ollama vision backend for image description.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use noema_core::{Error, Result, VisionBackend};

use crate::config::InferenceConfig;
use crate::prompts;

/// Ollama-based vision backend (e.g., qwen3-vl, llava).
///
/// The vision capability takes an image URL: the backend fetches the bytes
/// itself (bounded timeout), base64-encodes them, and sends them to the
/// model with the note text folded into the prompt as a context hint.
pub struct OllamaVisionBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
    fetch_timeout_secs: u64,
}

impl OllamaVisionBackend {
    pub fn new(config: &InferenceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            model: config.vision_model.clone(),
            timeout_secs: config.vision_timeout_secs,
            fetch_timeout_secs: config.image_fetch_timeout_secs,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self::new(&InferenceConfig::from_env())
    }

    /// Fetch the raw image bytes from the URL.
    async fn fetch_image(&self, image_url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(image_url)
            .timeout(Duration::from_secs(self.fetch_timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Vision(format!("Failed to fetch image {}: {}", image_url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Vision(format!(
                "Image fetch returned {} for {}",
                response.status(),
                image_url
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Vision(format!("Failed to read image body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    images: Vec<String>, // base64 encoded
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl VisionBackend for OllamaVisionBackend {
    #[instrument(skip(self, context), fields(subsystem = "inference", component = "vision", op = "describe_image", model = %self.model))]
    async fn describe_image(&self, image_url: &str, context: Option<&str>) -> Result<String> {
        use base64::Engine;

        let image_data = self.fetch_image(image_url).await?;
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(&image_data);

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompts::format_vision_prompt(context),
            images: vec![image_b64],
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Vision(format!("Vision request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Vision(format!(
                "Vision API returned {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Vision(format!("Failed to parse vision response: {}", e)))?;

        debug!(
            response_len = result.response.len(),
            "Image description complete"
        );
        Ok(result.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_backend_new() {
        let config = InferenceConfig::default().with_vision_model("llava");
        let backend = OllamaVisionBackend::new(&config);
        assert_eq!(backend.model_name(), "llava");
        assert_eq!(backend.base_url, config.base_url);
    }

    #[test]
    fn test_generate_request_serialization() {
        let request = GenerateRequest {
            model: "llava".to_string(),
            prompt: "Describe this image".to_string(),
            images: vec!["base64data".to_string()],
            stream: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llava");
        assert_eq!(json["images"][0], "base64data");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_generate_response_deserialization() {
        let json = r#"{"response": "A dog sitting on grass"}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.response, "A dog sitting on grass");
    }

    #[tokio::test]
    async fn test_describe_image_unreachable_url_errors() {
        let backend = OllamaVisionBackend::new(&InferenceConfig::default());
        // Reserved TLD, resolves nowhere: the fetch fails before any model call.
        let result = backend
            .describe_image("http://unreachable.invalid/photo.png", None)
            .await;
        assert!(matches!(result, Err(Error::Vision(_))));
    }
}
