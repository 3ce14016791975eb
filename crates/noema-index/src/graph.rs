//! Knowledge graph writer — topics, intentions, and atomic knowledge.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument, warn};
use uuid::Uuid;

use noema_core::{
    normalize_topic_name, ExtractionOutcome, IntentionStore, KnowledgeSource, KnowledgeStore,
    NewAtomicKnowledge, Note, Result, Topic, TopicCandidate, TopicStore, TopicUpsert,
};

use crate::extraction::{ExtractionEngine, ExtractionVariant};

/// Entity ids resolved by one graph write.
#[derive(Debug, Clone, Default)]
pub struct GraphWriteResult {
    pub topic_ids: Vec<Uuid>,
    pub intention_ids: Vec<Uuid>,
    pub knowledge_ids: Vec<Uuid>,
}

/// Upserts topics and intentions by normalized name, then replaces the
/// source's atomic knowledge records.
///
/// The per-candidate upsert loops degrade on failure: a failed topic is
/// logged and skipped, and the run continues with the ids that did succeed.
/// Knowledge-record persistence is not degradable; a failed insert fails
/// the run.
pub struct KnowledgeGraphWriter {
    topics: Arc<dyn TopicStore>,
    intentions: Arc<dyn IntentionStore>,
    knowledge: Arc<dyn KnowledgeStore>,
}

impl KnowledgeGraphWriter {
    pub fn new(
        topics: Arc<dyn TopicStore>,
        intentions: Arc<dyn IntentionStore>,
        knowledge: Arc<dyn KnowledgeStore>,
    ) -> Self {
        Self {
            topics,
            intentions,
            knowledge,
        }
    }

    /// Write everything the extraction outcome implies for one note.
    ///
    /// The engine is passed in explicitly for the secondary ask-topic pass,
    /// with the topics resolved so far as its context.
    #[instrument(skip_all, fields(subsystem = "index", component = "graph_writer", op = "write", note_id = %note.id))]
    pub async fn write(
        &self,
        note: &Note,
        outcome: &ExtractionOutcome,
        engine: &ExtractionEngine,
    ) -> Result<GraphWriteResult> {
        let mut resolved = self.resolve_topics(&outcome.topics, note.id).await;

        if engine.variant() == ExtractionVariant::AskMining {
            let mined = self.mine_ask_topics(outcome, &resolved, engine).await;
            let additional = self.resolve_topics(&mined, note.id).await;
            resolved.extend(additional);
        }

        let topic_ids = dedup_ids(resolved.iter().map(|t| t.id));

        let intention_ids = if engine.variant() == ExtractionVariant::Intentions {
            let resolved = self.resolve_intentions(&outcome.intentions, note.id).await;
            dedup_ids(resolved.iter().map(|i| i.id))
        } else {
            Vec::new()
        };

        let knowledge_ids = self
            .replace_knowledge(note, outcome, &topic_ids)
            .await?;

        debug!(
            result_count = knowledge_ids.len(),
            topics = topic_ids.len(),
            intentions = intention_ids.len(),
            "Knowledge graph write complete"
        );
        Ok(GraphWriteResult {
            topic_ids,
            intention_ids,
            knowledge_ids,
        })
    }

    /// Upsert each candidate, collecting the successes and logging the
    /// failures.
    async fn resolve_topics(&self, candidates: &[TopicCandidate], source_id: Uuid) -> Vec<Topic> {
        let mut resolved = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match self
                .topics
                .upsert(TopicUpsert {
                    name: candidate.name.clone(),
                    description: candidate.description.clone(),
                    source_id,
                })
                .await
            {
                Ok(topic) => resolved.push(topic),
                Err(e) => warn!(
                    topic = %candidate.name,
                    error = %e,
                    "Topic upsert failed, continuing with remaining topics"
                ),
            }
        }
        resolved
    }

    async fn resolve_intentions(
        &self,
        candidates: &[TopicCandidate],
        source_id: Uuid,
    ) -> Vec<Topic> {
        let mut resolved = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match self
                .intentions
                .upsert(TopicUpsert {
                    name: candidate.name.clone(),
                    description: candidate.description.clone(),
                    source_id,
                })
                .await
            {
                Ok(intention) => resolved.push(intention),
                Err(e) => warn!(
                    topic = %candidate.name,
                    error = %e,
                    "Intention upsert failed, continuing with remaining intentions"
                ),
            }
        }
        resolved
    }

    /// Run the secondary extraction over the ask statements, using the
    /// topics resolved so far as context. Failure degrades to no additional
    /// topics.
    async fn mine_ask_topics(
        &self,
        outcome: &ExtractionOutcome,
        resolved: &[Topic],
        engine: &ExtractionEngine,
    ) -> Vec<TopicCandidate> {
        let asks: Vec<String> = outcome.asks().iter().map(|a| a.text.clone()).collect();
        if asks.is_empty() {
            return Vec::new();
        }

        let known: Vec<String> = resolved.iter().map(|t| t.name.clone()).collect();
        match engine.mine_ask_topics(&asks, &known).await {
            Ok(candidates) => {
                let known_normalized: HashSet<String> = resolved
                    .iter()
                    .map(|t| t.normalized_name.clone())
                    .collect();
                candidates
                    .into_iter()
                    .filter(|c| !known_normalized.contains(&normalize_topic_name(&c.name)))
                    .collect()
            }
            Err(e) => {
                warn!(
                    error = %e,
                    result_count = asks.len(),
                    "Ask-topic mining failed, continuing without additional topics"
                );
                Vec::new()
            }
        }
    }

    /// Idempotent replace: delete all prior records for this source, then
    /// insert one record per extracted statement.
    async fn replace_knowledge(
        &self,
        note: &Note,
        outcome: &ExtractionOutcome,
        topic_ids: &[Uuid],
    ) -> Result<Vec<Uuid>> {
        let source = KnowledgeSource::note(note.id);
        let removed = self.knowledge.delete_by_source(&source).await?;
        if removed > 0 {
            debug!(result_count = removed, "Removed superseded knowledge records");
        }

        let human_portfolio_ids = note.human_portfolio_ids();
        let project_portfolio_ids = note.project_portfolio_ids();

        let mut ids = Vec::with_capacity(outcome.knowledge.len());
        for statement in &outcome.knowledge {
            let id = self
                .knowledge
                .insert(NewAtomicKnowledge {
                    statement: statement.text.clone(),
                    is_ask: statement.is_ask,
                    source,
                    human_portfolio_ids: human_portfolio_ids.clone(),
                    project_portfolio_ids: project_portfolio_ids.clone(),
                    topic_ids: topic_ids.to_vec(),
                })
                .await?;
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Preserve first-seen order while dropping duplicate ids.
fn dedup_ids(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}
