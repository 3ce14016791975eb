//! Extraction engine — one model call per note, validated on receipt.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use noema_core::{
    Error, ExtractionBackend, ExtractionOutcome, KnowledgeStatement, Result, TopicCandidate,
};

/// Which shape of extraction this deployment runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionVariant {
    /// The main payload carries intentions alongside topics.
    Intentions,
    /// No intentions; a secondary pass mines additional topics implied by
    /// the ask statements.
    #[default]
    AskMining,
}

impl std::str::FromStr for ExtractionVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "intentions" => Ok(Self::Intentions),
            "ask_mining" => Ok(Self::AskMining),
            _ => Err(format!("Invalid extraction variant: {}", s)),
        }
    }
}

/// Sends compound text to the extraction capability and turns the raw
/// payload into a known-good [`ExtractionOutcome`].
///
/// The model payload is validated immediately on receipt: missing or
/// malformed optional fields coerce to `None`/empty rather than failing.
/// Only the transport itself can fail the attempt.
pub struct ExtractionEngine {
    backend: Arc<dyn ExtractionBackend>,
    variant: ExtractionVariant,
}

impl ExtractionEngine {
    pub fn new(backend: Arc<dyn ExtractionBackend>, variant: ExtractionVariant) -> Self {
        Self { backend, variant }
    }

    pub fn variant(&self) -> ExtractionVariant {
        self.variant
    }

    /// Run the main extraction call for a note's compound text.
    #[instrument(skip(self, compound_text), fields(subsystem = "index", component = "extraction", op = "extract", model = self.backend.model_name(), prompt_len = compound_text.len()))]
    pub async fn extract(&self, compound_text: &str) -> Result<ExtractionOutcome> {
        if compound_text.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Cannot extract knowledge from empty compound text".to_string(),
            ));
        }

        let payload = self.backend.extract(compound_text).await?;
        let outcome = parse_extraction_payload(&payload, self.variant);
        debug!(
            result_count = outcome.knowledge.len(),
            topics = outcome.topics.len(),
            has_summary = outcome.summary.is_some(),
            "Extraction payload validated"
        );
        Ok(outcome)
    }

    /// Run the secondary call mining additional topics from ask statements.
    ///
    /// The already-known topic names are an explicit parameter, keeping the
    /// run composable and testable in isolation.
    #[instrument(skip(self, asks, known_topics), fields(subsystem = "index", component = "extraction", op = "mine_ask_topics", result_count = asks.len()))]
    pub async fn mine_ask_topics(
        &self,
        asks: &[String],
        known_topics: &[String],
    ) -> Result<Vec<TopicCandidate>> {
        let payload = self.backend.mine_ask_topics(asks, known_topics).await?;
        Ok(parse_topic_candidates(payload.get("topics")))
    }
}

/// Validate a raw extraction payload into an [`ExtractionOutcome`].
///
/// Never fails: unknown shapes coerce to empty fields, and malformed list
/// entries are dropped individually.
pub fn parse_extraction_payload(
    payload: &JsonValue,
    variant: ExtractionVariant,
) -> ExtractionOutcome {
    let summary = payload
        .get("summary")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let knowledge = payload
        .get("atomic_knowledge")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let text = item.get("text")?.as_str()?.trim();
                    if text.is_empty() {
                        return None;
                    }
                    Some(KnowledgeStatement {
                        text: text.to_string(),
                        is_ask: item.get("is_ask").and_then(|v| v.as_bool()).unwrap_or(false),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let topics = parse_topic_candidates(payload.get("topics"));
    let intentions = match variant {
        ExtractionVariant::Intentions => parse_topic_candidates(payload.get("intentions")),
        ExtractionVariant::AskMining => Vec::new(),
    };

    ExtractionOutcome {
        summary,
        knowledge,
        topics,
        intentions,
    }
}

/// Validate a list of `{name, description}` candidates, dropping entries
/// without a usable name.
pub fn parse_topic_candidates(value: Option<&JsonValue>) -> Vec<TopicCandidate> {
    value
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let name = item.get("name")?.as_str()?.trim();
                    if name.is_empty() {
                        return None;
                    }
                    Some(TopicCandidate {
                        name: name.to_string(),
                        description: item
                            .get("description")
                            .and_then(|v| v.as_str())
                            .map(str::trim)
                            .filter(|d| !d.is_empty())
                            .map(String::from),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct StubBackend {
        payload: JsonValue,
        fail: bool,
    }

    #[async_trait]
    impl ExtractionBackend for StubBackend {
        async fn extract(&self, _compound_text: &str) -> Result<JsonValue> {
            if self.fail {
                return Err(Error::Extraction("model down".into()));
            }
            Ok(self.payload.clone())
        }

        async fn mine_ask_topics(
            &self,
            _asks: &[String],
            _known_topics: &[String],
        ) -> Result<JsonValue> {
            if self.fail {
                return Err(Error::Extraction("model down".into()));
            }
            Ok(self.payload.clone())
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn engine(payload: JsonValue) -> ExtractionEngine {
        ExtractionEngine::new(
            Arc::new(StubBackend {
                payload,
                fail: false,
            }),
            ExtractionVariant::AskMining,
        )
    }

    #[test]
    fn test_parse_full_payload() {
        let payload = json!({
            "summary": "Seeking a co-founder",
            "atomic_knowledge": [
                {"text": "Is building a climate app", "is_ask": false},
                {"text": "Needs a co-founder", "is_ask": true}
            ],
            "topics": [{"name": "Climate Tech", "description": "Climate startups"}],
            "intentions": [{"name": "Find a co-founder"}]
        });

        let outcome = parse_extraction_payload(&payload, ExtractionVariant::Intentions);
        assert_eq!(outcome.summary.as_deref(), Some("Seeking a co-founder"));
        assert_eq!(outcome.knowledge.len(), 2);
        assert!(outcome.knowledge[1].is_ask);
        assert_eq!(outcome.topics[0].name, "Climate Tech");
        assert_eq!(outcome.intentions[0].name, "Find a co-founder");
    }

    #[test]
    fn test_parse_missing_fields_coerce_to_empty() {
        let outcome = parse_extraction_payload(&json!({}), ExtractionVariant::Intentions);
        assert!(outcome.summary.is_none());
        assert!(outcome.knowledge.is_empty());
        assert!(outcome.topics.is_empty());
        assert!(outcome.intentions.is_empty());
    }

    #[test]
    fn test_parse_malformed_entries_dropped_individually() {
        let payload = json!({
            "summary": "   ",
            "atomic_knowledge": [
                {"text": "valid", "is_ask": true},
                {"text": ""},
                {"is_ask": false},
                "not an object",
                {"text": "missing flag defaults to fact"}
            ],
            "topics": [
                {"name": "Valid"},
                {"description": "no name"},
                {"name": "  "},
                42
            ]
        });

        let outcome = parse_extraction_payload(&payload, ExtractionVariant::AskMining);
        assert!(outcome.summary.is_none(), "blank summary coerces to None");
        assert_eq!(outcome.knowledge.len(), 2);
        assert!(!outcome.knowledge[1].is_ask);
        assert_eq!(outcome.topics.len(), 1);
    }

    #[test]
    fn test_parse_wrong_types_coerce_to_empty() {
        let payload = json!({
            "summary": 42,
            "atomic_knowledge": "not a list",
            "topics": {"name": "not a list"}
        });

        let outcome = parse_extraction_payload(&payload, ExtractionVariant::AskMining);
        assert!(outcome.summary.is_none());
        assert!(outcome.knowledge.is_empty());
        assert!(outcome.topics.is_empty());
    }

    #[test]
    fn test_ask_mining_variant_ignores_intentions() {
        let payload = json!({
            "intentions": [{"name": "Find a co-founder"}]
        });
        let outcome = parse_extraction_payload(&payload, ExtractionVariant::AskMining);
        assert!(outcome.intentions.is_empty());
    }

    #[tokio::test]
    async fn test_extract_rejects_empty_compound_text() {
        let engine = engine(json!({}));
        let result = engine.extract("   ").await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_extract_propagates_backend_failure() {
        let engine = ExtractionEngine::new(
            Arc::new(StubBackend {
                payload: json!({}),
                fail: true,
            }),
            ExtractionVariant::AskMining,
        );
        let result = engine.extract("some text").await;
        assert!(matches!(result, Err(Error::Extraction(_))));
    }

    #[tokio::test]
    async fn test_mine_ask_topics_parses_candidates() {
        let engine = engine(json!({"topics": [{"name": "Hiring", "description": "Finding people"}]}));
        let candidates = engine
            .mine_ask_topics(&["Needs a designer".to_string()], &["Climate Tech".to_string()])
            .await
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Hiring");
        assert_eq!(candidates[0].description.as_deref(), Some("Finding people"));
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!(
            "intentions".parse::<ExtractionVariant>().unwrap(),
            ExtractionVariant::Intentions
        );
        assert_eq!(
            "ask_mining".parse::<ExtractionVariant>().unwrap(),
            ExtractionVariant::AskMining
        );
        assert!("other".parse::<ExtractionVariant>().is_err());
    }
}
