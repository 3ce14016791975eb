//! Capability traits for the noema pipeline.
//!
//! The pipeline consumes two groups of external capabilities: a keyed,
//! queryable record store and three model backends (extraction, vision,
//! embedding). These traits are the documented contracts for both groups,
//! enabling pluggable backends and testability.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// STORAGE CAPABILITY
// =============================================================================

/// Store for notes and their pipeline-derived fields.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Fetch a note by id. A missing note is an error
    /// ([`crate::Error::NoteNotFound`]), not an empty result.
    async fn fetch(&self, id: Uuid) -> Result<Note>;

    /// Persist a new indexing status for the note.
    async fn set_indexing_status(&self, id: Uuid, status: IndexingStatus) -> Result<()>;

    /// Write the note's embedding vectors verbatim. `summary_vector` is
    /// `None` when the note has no summary.
    async fn write_vectors(
        &self,
        id: Uuid,
        summary_vector: Option<Vector>,
        compound_text_vector: Vector,
    ) -> Result<()>;

    /// Write the derived fields and flip the status to `completed` as one
    /// operation. This is the final write of a successful run.
    async fn complete_indexing(&self, id: Uuid, derived: DerivedFields) -> Result<()>;
}

/// Store for atomic knowledge records.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Delete every record for the given source. Returns the number removed.
    /// Re-indexing relies on this for its idempotent replace.
    async fn delete_by_source(&self, source: &KnowledgeSource) -> Result<u64>;

    /// Insert a fresh record.
    async fn insert(&self, record: NewAtomicKnowledge) -> Result<Uuid>;

    /// All records for a source, in insertion order.
    async fn list_by_source(&self, source: &KnowledgeSource) -> Result<Vec<AtomicKnowledge>>;
}

/// Store for topics, keyed by normalized name.
///
/// Implementations must make [`TopicStore::upsert`] atomic on the normalized
/// name (insert-if-absent, or a unique constraint with fetch-on-conflict), so
/// concurrent runs extracting the same name converge on one entity.
#[async_trait]
pub trait TopicStore: Send + Sync {
    /// Look up by the normalized form of `req.name`, creating the entity if
    /// absent. Either way the contributing source id is recorded, and a
    /// non-empty new description replaces the stored one. An existing
    /// description is never cleared.
    async fn upsert(&self, req: TopicUpsert) -> Result<Topic>;

    async fn get(&self, id: Uuid) -> Result<Option<Topic>>;

    async fn get_by_name(&self, normalized_name: &str) -> Result<Option<Topic>>;

    async fn list(&self) -> Result<Vec<Topic>>;
}

/// Store for intentions. Same contract as [`TopicStore`] over a disjoint
/// identity namespace.
#[async_trait]
pub trait IntentionStore: Send + Sync {
    async fn upsert(&self, req: TopicUpsert) -> Result<Intention>;

    async fn get(&self, id: Uuid) -> Result<Option<Intention>>;

    async fn get_by_name(&self, normalized_name: &str) -> Result<Option<Intention>>;

    async fn list(&self) -> Result<Vec<Intention>>;
}

/// Store for per-user, per-topic interest scores.
#[async_trait]
pub trait InterestStore: Send + Sync {
    /// Add `delta` to the (user, topic) score, creating the row at zero if
    /// absent. Returns the new weight.
    async fn add(&self, user_id: Uuid, topic_id: Uuid, delta: f32) -> Result<f32>;

    async fn get(&self, user_id: Uuid, topic_id: Uuid) -> Result<Option<InterestScore>>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<InterestScore>>;
}

// =============================================================================
// INFERENCE CAPABILITIES
// =============================================================================

/// Backend for LLM knowledge extraction.
///
/// Both calls return the model's raw structured payload; the extraction
/// engine validates the shape and coerces missing fields.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Extract summary, atomic knowledge, topics (and intentions, variant
    /// dependent) from compound text. One call per note.
    async fn extract(&self, compound_text: &str) -> Result<JsonValue>;

    /// Narrower secondary call: given ask statements and the topic names
    /// already known for the note, return additional topic candidates the
    /// asks imply.
    async fn mine_ask_topics(&self, asks: &[String], known_topics: &[String])
        -> Result<JsonValue>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Backend for describing images with a vision model.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Describe the image at `image_url`, with the note's text as an
    /// optional context hint. An inaccessible URL surfaces as an error;
    /// callers fall back to a raw-URL fragment.
    async fn describe_image(&self, image_url: &str, context: Option<&str>) -> Result<String>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}

/// Backend for generating text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts, one vector per input text.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
