//! Indexing orchestrator — the state machine sequencing one note's run.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use noema_core::{
    defaults, DerivedFields, EmbeddingBackend, Error, ExtractionBackend, IndexingStatus,
    IntentionStore, InterestStore, KnowledgeSource, KnowledgeStore, Note, NoteStore, Result,
    TopicStore, VisionBackend,
};

use crate::compound::build_compound_text;
use crate::embedding::EmbeddingStage;
use crate::extraction::{ExtractionEngine, ExtractionVariant};
use crate::graph::KnowledgeGraphWriter;
use crate::interest::InterestTracker;
use crate::references::ReferenceResolver;

/// Configuration for the indexing orchestrator.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `NOEMA_INTEREST_INCREMENT` | `0.1` | Interest added per topic per authored note |
/// | `NOEMA_EXTRACTION_VARIANT` | `ask_mining` | `intentions` or `ask_mining` |
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub interest_increment: f32,
    pub variant: ExtractionVariant,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            interest_increment: defaults::INTEREST_INCREMENT,
            variant: ExtractionVariant::default(),
        }
    }
}

impl IndexerConfig {
    /// Create config from environment variables (with defaults).
    pub fn from_env() -> Self {
        let interest_increment = std::env::var(defaults::ENV_INTEREST_INCREMENT)
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(defaults::INTEREST_INCREMENT);

        let variant = std::env::var(defaults::ENV_EXTRACTION_VARIANT)
            .ok()
            .and_then(|v| v.parse::<ExtractionVariant>().ok())
            .unwrap_or_default();

        Self {
            interest_increment,
            variant,
        }
    }

    /// Set the interest increment.
    pub fn with_interest_increment(mut self, increment: f32) -> Self {
        self.interest_increment = increment;
        self
    }

    /// Set the extraction variant.
    pub fn with_variant(mut self, variant: ExtractionVariant) -> Self {
        self.variant = variant;
        self
    }
}

/// Sequences one note's indexing run: compound text → extraction →
/// {embedding ∥ graph + interest} → final field write.
///
/// Status machine: `pending → processing → {completed | failed}`.
/// `processing` is persisted before any extraction work, and each fresh
/// attempt starts by deleting the source's prior knowledge records, so
/// re-running on a `failed` or `completed` note is always safe.
pub struct NoteIndexer {
    notes: Arc<dyn NoteStore>,
    knowledge: Arc<dyn KnowledgeStore>,
    resolver: ReferenceResolver,
    engine: ExtractionEngine,
    embedding: EmbeddingStage,
    graph: KnowledgeGraphWriter,
    interest: InterestTracker,
}

impl NoteIndexer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        notes: Arc<dyn NoteStore>,
        knowledge: Arc<dyn KnowledgeStore>,
        topics: Arc<dyn TopicStore>,
        intentions: Arc<dyn IntentionStore>,
        interest: Arc<dyn InterestStore>,
        extraction: Arc<dyn ExtractionBackend>,
        vision: Arc<dyn VisionBackend>,
        embedding: Arc<dyn EmbeddingBackend>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            notes: notes.clone(),
            knowledge: knowledge.clone(),
            resolver: ReferenceResolver::new(vision),
            engine: ExtractionEngine::new(extraction, config.variant),
            embedding: EmbeddingStage::new(embedding, notes),
            graph: KnowledgeGraphWriter::new(topics, intentions, knowledge),
            interest: InterestTracker::new(interest, config.interest_increment),
        }
    }

    /// Run one full indexing attempt for the note.
    ///
    /// Always safe to call again for the same id: every attempt re-derives
    /// all fields from scratch.
    #[instrument(skip(self), fields(subsystem = "index", component = "indexer", op = "index_note", note_id = %note_id))]
    pub async fn index_note(&self, note_id: Uuid) -> Result<()> {
        let start = Instant::now();

        // Fetch failure is fatal; with no row to update there is no status
        // transition to make.
        let note = self.notes.fetch(note_id).await?;

        if note.is_deleted() {
            warn!("Note is soft-deleted, skipping indexing");
            return Ok(());
        }

        // Persist `processing` before any extraction work: a crash mid-run
        // shows up as stuck processing, not silently pending.
        self.notes
            .set_indexing_status(note_id, IndexingStatus::Processing)
            .await?;

        match self.run(&note).await {
            Ok(()) => {
                info!(
                    status = %IndexingStatus::Completed,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Note indexed"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    status = %IndexingStatus::Failed,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Indexing run failed"
                );
                // Partial writes from this attempt stay in place; the next
                // attempt's cleanup pass supersedes them.
                if let Err(status_err) = self
                    .notes
                    .set_indexing_status(note_id, IndexingStatus::Failed)
                    .await
                {
                    error!(error = %status_err, "Failed to persist failed status");
                }
                Err(e)
            }
        }
    }

    /// The fallible portion of a run, between `processing` and the final
    /// status transition.
    async fn run(&self, note: &Note) -> Result<()> {
        // Cleanup-before-write: drop anything a previous attempt left for
        // this source.
        let removed = self
            .knowledge
            .delete_by_source(&KnowledgeSource::note(note.id))
            .await?;
        if removed > 0 {
            debug!(result_count = removed, "Cleaned up prior knowledge records");
        }

        let annotated = self.mentioned_context(note).await;
        let fragments = self.resolver.resolve(&note.references, &note.text).await;
        let compound_text = build_compound_text(&note.text, annotated.as_deref(), &fragments);

        let outcome = self.engine.extract(&compound_text).await?;

        // Embedding and the graph/interest write both consume only
        // already-computed artifacts, so they run concurrently.
        let (embed_result, graph_result) = tokio::join!(
            self.embedding
                .embed_and_store(note.id, outcome.summary.as_deref(), &compound_text),
            async {
                let written = self.graph.write(note, &outcome, &self.engine).await?;
                self.interest
                    .record(note.author_id, &written.topic_ids)
                    .await;
                Ok::<_, Error>(written)
            }
        );
        embed_result?;
        let written = graph_result?;

        self.notes
            .complete_indexing(
                note.id,
                DerivedFields {
                    summary: outcome.summary,
                    compound_text,
                    topic_ids: written.topic_ids,
                    intention_ids: written.intention_ids,
                },
            )
            .await
    }

    /// Summary-or-text of the mentioned note, when one is set. A fetch
    /// failure degrades to indexing without the annotation context.
    async fn mentioned_context(&self, note: &Note) -> Option<String> {
        let mentioned_id = note.mentioned_note_id?;
        match self.notes.fetch(mentioned_id).await {
            Ok(mentioned) => Some(mentioned.summary.unwrap_or(mentioned.text)),
            Err(e) => {
                warn!(
                    note_id = %mentioned_id,
                    error = %e,
                    "Mentioned note unavailable, indexing without annotation context"
                );
                None
            }
        }
    }
}

/// Trigger interface: "index note by id", callable any number of times for
/// the same id.
#[derive(Clone)]
pub struct IndexService {
    indexer: Arc<NoteIndexer>,
}

impl IndexService {
    pub fn new(indexer: NoteIndexer) -> Self {
        Self {
            indexer: Arc::new(indexer),
        }
    }

    /// Fire-and-forget trigger. The caller gets back a join handle without
    /// blocking on the indexing outcome; run failures are logged and
    /// reflected in the note's `indexing_status`.
    ///
    /// A nil note id is rejected synchronously, before any state change.
    pub fn trigger(&self, note_id: Uuid) -> Result<JoinHandle<()>> {
        if note_id.is_nil() {
            return Err(Error::InvalidInput("Missing note id".to_string()));
        }

        let indexer = self.indexer.clone();
        Ok(tokio::spawn(async move {
            // index_note already logged the failure and flipped the status.
            let _ = indexer.index_note(note_id).await;
        }))
    }

    /// Run an indexing pass inline, for callers that want the outcome.
    pub async fn index_now(&self, note_id: Uuid) -> Result<()> {
        if note_id.is_nil() {
            return Err(Error::InvalidInput("Missing note id".to_string()));
        }
        self.indexer.index_note(note_id).await
    }
}
