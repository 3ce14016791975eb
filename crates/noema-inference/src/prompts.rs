//! Prompts and response schemas for the extraction backends.
//!
//! The extraction calls run with Ollama format enforcement, so the schemas
//! here are the contract for what the model returns. The pipeline still
//! validates the payload on receipt; the schema just makes well-formed
//! output overwhelmingly likely.

use serde_json::{json, Value as JsonValue};

/// System prompt for the main knowledge-extraction call.
pub const EXTRACT_SYSTEM: &str = "\
You analyze a short user-authored post and derive structured knowledge from it. \
Respond with a JSON object containing: \
`summary` (one concise sentence capturing the post), \
`atomic_knowledge` (array of discrete statements the post supports, each \
{\"text\", \"is_ask\"}; set is_ask true when the statement is a request or \
need rather than a fact), \
`topics` (array of {\"name\", \"description\"} naming the subjects the post \
discusses), and \
`intentions` (array of {\"name\", \"description\"} naming what the author is \
trying to accomplish). \
Use short, reusable topic and intention names. Omit nothing you are sure of; \
leave arrays empty when the post supports nothing.";

/// System prompt for the secondary ask-topic mining call.
pub const ASK_TOPICS_SYSTEM: &str = "\
You are given request/need statements (\"asks\") extracted from a post, plus \
the topics already identified for it. Name additional topics that the asks \
imply but the existing list misses. Respond with a JSON object containing \
`topics` (array of {\"name\", \"description\"}). Return an empty array when \
the existing topics already cover the asks.";

/// Default prompt for vision description when the note has no text.
pub const VISION_PROMPT: &str =
    "Describe this image in detail. Include any text visible in the image.";

/// Format the user prompt for the main extraction call.
pub fn format_extract_prompt(compound_text: &str) -> String {
    format!("Post:\n{}", compound_text)
}

/// Format the user prompt for the ask-topic mining call.
pub fn format_ask_topics_prompt(asks: &[String], known_topics: &[String]) -> String {
    let asks_block = asks
        .iter()
        .map(|a| format!("- {}", a))
        .collect::<Vec<_>>()
        .join("\n");
    let known_block = if known_topics.is_empty() {
        "(none)".to_string()
    } else {
        known_topics.join(", ")
    };
    format!("Asks:\n{}\n\nKnown topics: {}", asks_block, known_block)
}

/// Format the vision prompt, folding in the note text as a context hint.
pub fn format_vision_prompt(context: Option<&str>) -> String {
    match context {
        Some(text) if !text.trim().is_empty() => format!(
            "{}\n\nThe image was posted alongside this text, use it as context: {}",
            VISION_PROMPT, text
        ),
        _ => VISION_PROMPT.to_string(),
    }
}

/// JSON schema enforced on the main extraction response.
pub fn extract_format() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string" },
            "atomic_knowledge": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" },
                        "is_ask": { "type": "boolean" }
                    },
                    "required": ["text", "is_ask"]
                }
            },
            "topics": { "$ref": "#/definitions/named_list" },
            "intentions": { "$ref": "#/definitions/named_list" }
        },
        "definitions": {
            "named_list": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["name"]
                }
            }
        }
    })
}

/// JSON schema enforced on the ask-topic mining response.
pub fn ask_topics_format() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "topics": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["name"]
                }
            }
        },
        "required": ["topics"]
    })
}
