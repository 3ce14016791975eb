//! Core data models for the noema pipeline.
//!
//! These types are shared across all noema crates and represent the core
//! domain entities: notes, the knowledge extracted from them, and the
//! per-user interest signals derived along the way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Embedding vector type.
pub type Vector = Vec<f32>;

// =============================================================================
// NOTE TYPES
// =============================================================================

/// Indexing lifecycle status of a note.
///
/// `Processing` is persisted before any extraction work starts, so a crash
/// mid-run is observable as a stuck `processing` note rather than a silent
/// `pending` one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexingStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for IndexingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for IndexingStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid indexing status: {}", s)),
        }
    }
}

/// A reference embedded in a note, in authored order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NoteReference {
    /// An embedded image.
    Image { url: String },
    /// A linked web page with whatever unfurled metadata was captured.
    Url {
        url: String,
        host_name: Option<String>,
        title: Option<String>,
        description: Option<String>,
        header_image: Option<String>,
    },
}

impl NoteReference {
    /// The underlying URL regardless of reference kind.
    pub fn url(&self) -> &str {
        match self {
            Self::Image { url } => url,
            Self::Url { url, .. } => url,
        }
    }
}

/// Which kind of portfolio a note is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortfolioKind {
    Human,
    Project,
}

/// A portfolio assignment on a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioRef {
    pub id: Uuid,
    pub kind: PortfolioKind,
}

/// A short user-authored post and the fields this pipeline derives from it.
///
/// Created by the authoring flow with `indexing_status = pending`; the
/// derived fields (`summary`, `compound_text`, `topic_ids`, `intention_ids`,
/// `indexing_status`) are mutated only by the indexing orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    /// Embedded images and linked URLs, in authored order.
    pub references: Vec<NoteReference>,
    /// Set when this note annotates another note.
    pub mentioned_note_id: Option<Uuid>,
    /// Portfolios (human and project) this note is assigned to.
    pub portfolios: Vec<PortfolioRef>,
    pub summary: Option<String>,
    pub compound_text: Option<String>,
    pub topic_ids: Vec<Uuid>,
    pub intention_ids: Vec<Uuid>,
    pub indexing_status: IndexingStatus,
    pub summary_vector: Option<Vector>,
    pub compound_text_vector: Option<Vector>,
    /// Soft-delete marker, owned by the authoring flow. Soft-deleted notes
    /// are excluded from re-indexing.
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Create a fresh note awaiting its first indexing pass.
    pub fn new(author_id: Uuid, text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            text: text.into(),
            references: Vec::new(),
            mentioned_note_id: None,
            portfolios: Vec::new(),
            summary: None,
            compound_text: None,
            topic_ids: Vec::new(),
            intention_ids: Vec::new(),
            indexing_status: IndexingStatus::Pending,
            summary_vector: None,
            compound_text_vector: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// IDs of the human portfolios this note is assigned to.
    pub fn human_portfolio_ids(&self) -> Vec<Uuid> {
        self.portfolios
            .iter()
            .filter(|p| p.kind == PortfolioKind::Human)
            .map(|p| p.id)
            .collect()
    }

    /// IDs of the project portfolios this note is assigned to.
    pub fn project_portfolio_ids(&self) -> Vec<Uuid> {
        self.portfolios
            .iter()
            .filter(|p| p.kind == PortfolioKind::Project)
            .map(|p| p.id)
            .collect()
    }
}

/// Derived fields written back onto the note when a run completes.
#[derive(Debug, Clone, Default)]
pub struct DerivedFields {
    pub summary: Option<String>,
    pub compound_text: String,
    pub topic_ids: Vec<Uuid>,
    pub intention_ids: Vec<Uuid>,
}

// =============================================================================
// KNOWLEDGE TYPES
// =============================================================================

/// Kind of entity a knowledge record was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Note,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Note => write!(f, "note"),
        }
    }
}

/// Descriptor of the entity a knowledge record was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnowledgeSource {
    pub kind: SourceKind,
    pub id: Uuid,
}

impl KnowledgeSource {
    pub fn note(id: Uuid) -> Self {
        Self {
            kind: SourceKind::Note,
            id,
        }
    }
}

/// One discrete statement extracted from a source.
///
/// Records are never mutated, only superseded: re-indexing a source deletes
/// its prior records before inserting the fresh set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomicKnowledge {
    pub id: Uuid,
    pub statement: String,
    /// True when the statement is a request/need rather than a fact.
    pub is_ask: bool,
    pub source: KnowledgeSource,
    pub human_portfolio_ids: Vec<Uuid>,
    pub project_portfolio_ids: Vec<Uuid>,
    pub topic_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Insert request for an atomic knowledge record.
#[derive(Debug, Clone)]
pub struct NewAtomicKnowledge {
    pub statement: String,
    pub is_ask: bool,
    pub source: KnowledgeSource,
    pub human_portfolio_ids: Vec<Uuid>,
    pub project_portfolio_ids: Vec<Uuid>,
    pub topic_ids: Vec<Uuid>,
}

// =============================================================================
// TOPIC / INTENTION TYPES
// =============================================================================

/// A named, deduplicated subject extracted from notes.
///
/// Identity key is the case/whitespace-normalized name — exact match only,
/// no fuzzy merge across synonyms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    pub normalized_name: String,
    pub description: Option<String>,
    /// Contributing source note ids, for provenance.
    pub source_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named purpose extracted from notes. Same shape and lifecycle as
/// [`Topic`], disjoint identity namespace.
pub type Intention = Topic;

/// Upsert request for a topic or intention.
#[derive(Debug, Clone)]
pub struct TopicUpsert {
    pub name: String,
    pub description: Option<String>,
    /// The note contributing this occurrence.
    pub source_id: Uuid,
}

/// Normalization applied to topic and intention names before identity
/// comparison: trim, collapse internal whitespace, lowercase.
pub fn normalize_topic_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// =============================================================================
// INTEREST TYPES
// =============================================================================

/// Accumulating per-user, per-topic interest weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestScore {
    pub user_id: Uuid,
    pub topic_id: Uuid,
    pub weight: f32,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// EXTRACTION TYPES
// =============================================================================

/// A topic or intention candidate named by the extraction model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCandidate {
    pub name: String,
    pub description: Option<String>,
}

/// One statement in the extraction payload, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeStatement {
    pub text: String,
    pub is_ask: bool,
}

/// Validated result of one extraction call.
///
/// Missing optional fields in the raw model payload coerce to `None`/empty
/// here; an `ExtractionOutcome` is always a known-good shape.
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    pub summary: Option<String>,
    pub knowledge: Vec<KnowledgeStatement>,
    pub topics: Vec<TopicCandidate>,
    pub intentions: Vec<TopicCandidate>,
}

impl ExtractionOutcome {
    /// Statements flagged as asks.
    pub fn asks(&self) -> Vec<&KnowledgeStatement> {
        self.knowledge.iter().filter(|k| k.is_ask).collect()
    }
}
