//! In-memory store implementing every noema storage contract.
//!
//! One shared [`State`] behind a `tokio::sync::RwLock` backs five
//! entity-scoped store handles. The topic and intention upserts hold the
//! write lock for the whole lookup-or-create, which makes them the atomic
//! insert-if-absent the [`noema_core::TopicStore`] contract requires.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use noema_core::{
    AtomicKnowledge, DerivedFields, Error, IndexingStatus, Intention, IntentionStore,
    InterestScore, InterestStore, KnowledgeSource, KnowledgeStore, NewAtomicKnowledge, Note,
    NoteStore, Result, Topic, TopicStore, TopicUpsert, Vector, normalize_topic_name,
};

#[derive(Default)]
struct State {
    notes: HashMap<Uuid, Note>,
    knowledge: Vec<AtomicKnowledge>,
    topics: HashMap<Uuid, Topic>,
    topic_names: HashMap<String, Uuid>,
    intentions: HashMap<Uuid, Intention>,
    intention_names: HashMap<String, Uuid>,
    interest: HashMap<(Uuid, Uuid), InterestScore>,
}

impl State {
    /// Shared lookup-or-create for the two named-entity namespaces.
    fn upsert_named(
        entities: &mut HashMap<Uuid, Topic>,
        names: &mut HashMap<String, Uuid>,
        req: TopicUpsert,
    ) -> Topic {
        let normalized = normalize_topic_name(&req.name);
        let now = Utc::now();

        if let Some(&id) = names.get(&normalized) {
            let topic = entities.get_mut(&id).expect("name index points at entity");
            if let Some(description) = req.description.filter(|d| !d.trim().is_empty()) {
                topic.description = Some(description);
            }
            if !topic.source_ids.contains(&req.source_id) {
                topic.source_ids.push(req.source_id);
            }
            topic.updated_at = now;
            return topic.clone();
        }

        let topic = Topic {
            id: Uuid::new_v4(),
            name: req.name,
            normalized_name: normalized.clone(),
            description: req.description.filter(|d| !d.trim().is_empty()),
            source_ids: vec![req.source_id],
            created_at: now,
            updated_at: now,
        };
        debug!(topic = %topic.normalized_name, "Created named entity");
        names.insert(normalized, topic.id);
        entities.insert(topic.id, topic.clone());
        topic
    }
}

/// In-memory record store bundling every entity-scoped handle.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle implementing [`NoteStore`].
    pub fn notes(&self) -> MemNoteStore {
        MemNoteStore {
            state: self.state.clone(),
        }
    }

    /// Handle implementing [`KnowledgeStore`].
    pub fn knowledge(&self) -> MemKnowledgeStore {
        MemKnowledgeStore {
            state: self.state.clone(),
        }
    }

    /// Handle implementing [`TopicStore`].
    pub fn topics(&self) -> MemTopicStore {
        MemTopicStore {
            state: self.state.clone(),
        }
    }

    /// Handle implementing [`IntentionStore`].
    pub fn intentions(&self) -> MemIntentionStore {
        MemIntentionStore {
            state: self.state.clone(),
        }
    }

    /// Handle implementing [`InterestStore`].
    pub fn interest(&self) -> MemInterestStore {
        MemInterestStore {
            state: self.state.clone(),
        }
    }

    /// Seed a note, replacing any existing note with the same id.
    pub async fn put_note(&self, note: Note) {
        self.state.write().await.notes.insert(note.id, note);
    }

    /// Total number of topic entities, for assertions on dedup behavior.
    pub async fn topic_count(&self) -> usize {
        self.state.read().await.topics.len()
    }

    /// Total number of atomic knowledge records across all sources.
    pub async fn knowledge_count(&self) -> usize {
        self.state.read().await.knowledge.len()
    }
}

/// Note handle over the shared in-memory state.
#[derive(Clone)]
pub struct MemNoteStore {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl NoteStore for MemNoteStore {
    async fn fetch(&self, id: Uuid) -> Result<Note> {
        self.state
            .read()
            .await
            .notes
            .get(&id)
            .cloned()
            .ok_or(Error::NoteNotFound(id))
    }

    async fn set_indexing_status(&self, id: Uuid, status: IndexingStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let note = state.notes.get_mut(&id).ok_or(Error::NoteNotFound(id))?;
        note.indexing_status = status;
        note.updated_at = Utc::now();
        Ok(())
    }

    async fn write_vectors(
        &self,
        id: Uuid,
        summary_vector: Option<Vector>,
        compound_text_vector: Vector,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let note = state.notes.get_mut(&id).ok_or(Error::NoteNotFound(id))?;
        note.summary_vector = summary_vector;
        note.compound_text_vector = Some(compound_text_vector);
        note.updated_at = Utc::now();
        Ok(())
    }

    async fn complete_indexing(&self, id: Uuid, derived: DerivedFields) -> Result<()> {
        let mut state = self.state.write().await;
        let note = state.notes.get_mut(&id).ok_or(Error::NoteNotFound(id))?;
        note.summary = derived.summary;
        note.compound_text = Some(derived.compound_text);
        note.topic_ids = derived.topic_ids;
        note.intention_ids = derived.intention_ids;
        note.indexing_status = IndexingStatus::Completed;
        note.updated_at = Utc::now();
        Ok(())
    }
}

/// Atomic knowledge handle over the shared in-memory state.
#[derive(Clone)]
pub struct MemKnowledgeStore {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl KnowledgeStore for MemKnowledgeStore {
    async fn delete_by_source(&self, source: &KnowledgeSource) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.knowledge.len();
        state.knowledge.retain(|k| k.source != *source);
        Ok((before - state.knowledge.len()) as u64)
    }

    async fn insert(&self, record: NewAtomicKnowledge) -> Result<Uuid> {
        let stored = AtomicKnowledge {
            id: Uuid::new_v4(),
            statement: record.statement,
            is_ask: record.is_ask,
            source: record.source,
            human_portfolio_ids: record.human_portfolio_ids,
            project_portfolio_ids: record.project_portfolio_ids,
            topic_ids: record.topic_ids,
            created_at: Utc::now(),
        };
        let id = stored.id;
        self.state.write().await.knowledge.push(stored);
        Ok(id)
    }

    async fn list_by_source(&self, source: &KnowledgeSource) -> Result<Vec<AtomicKnowledge>> {
        Ok(self
            .state
            .read()
            .await
            .knowledge
            .iter()
            .filter(|k| k.source == *source)
            .cloned()
            .collect())
    }
}

/// Topic handle over the shared in-memory state.
#[derive(Clone)]
pub struct MemTopicStore {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl TopicStore for MemTopicStore {
    async fn upsert(&self, req: TopicUpsert) -> Result<Topic> {
        let mut state = self.state.write().await;
        let State {
            topics,
            topic_names,
            ..
        } = &mut *state;
        Ok(State::upsert_named(topics, topic_names, req))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Topic>> {
        Ok(self.state.read().await.topics.get(&id).cloned())
    }

    async fn get_by_name(&self, normalized_name: &str) -> Result<Option<Topic>> {
        let state = self.state.read().await;
        Ok(state
            .topic_names
            .get(normalized_name)
            .and_then(|id| state.topics.get(id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Topic>> {
        Ok(self.state.read().await.topics.values().cloned().collect())
    }
}

/// Intention handle over the shared in-memory state.
#[derive(Clone)]
pub struct MemIntentionStore {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl IntentionStore for MemIntentionStore {
    async fn upsert(&self, req: TopicUpsert) -> Result<Intention> {
        let mut state = self.state.write().await;
        let State {
            intentions,
            intention_names,
            ..
        } = &mut *state;
        Ok(State::upsert_named(intentions, intention_names, req))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Intention>> {
        Ok(self.state.read().await.intentions.get(&id).cloned())
    }

    async fn get_by_name(&self, normalized_name: &str) -> Result<Option<Intention>> {
        let state = self.state.read().await;
        Ok(state
            .intention_names
            .get(normalized_name)
            .and_then(|id| state.intentions.get(id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Intention>> {
        Ok(self.state.read().await.intentions.values().cloned().collect())
    }
}

/// Interest-score handle over the shared in-memory state.
#[derive(Clone)]
pub struct MemInterestStore {
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl InterestStore for MemInterestStore {
    async fn add(&self, user_id: Uuid, topic_id: Uuid, delta: f32) -> Result<f32> {
        let mut state = self.state.write().await;
        let score = state
            .interest
            .entry((user_id, topic_id))
            .or_insert_with(|| InterestScore {
                user_id,
                topic_id,
                weight: 0.0,
                updated_at: Utc::now(),
            });
        score.weight += delta;
        score.updated_at = Utc::now();
        Ok(score.weight)
    }

    async fn get(&self, user_id: Uuid, topic_id: Uuid) -> Result<Option<InterestScore>> {
        Ok(self
            .state
            .read()
            .await
            .interest
            .get(&(user_id, topic_id))
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<InterestScore>> {
        Ok(self
            .state
            .read()
            .await
            .interest
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_missing_note_is_error() {
        let store = MemoryStore::new();
        let result = store.notes().fetch(Uuid::new_v4()).await;
        assert!(matches!(result, Err(Error::NoteNotFound(_))));
    }

    #[tokio::test]
    async fn test_note_status_roundtrip() {
        let store = MemoryStore::new();
        let note = Note::new(Uuid::new_v4(), "hello");
        let id = note.id;
        store.put_note(note).await;

        store
            .notes()
            .set_indexing_status(id, IndexingStatus::Processing)
            .await
            .unwrap();
        let fetched = store.notes().fetch(id).await.unwrap();
        assert_eq!(fetched.indexing_status, IndexingStatus::Processing);
    }

    #[tokio::test]
    async fn test_complete_indexing_writes_derived_fields() {
        let store = MemoryStore::new();
        let note = Note::new(Uuid::new_v4(), "hello");
        let id = note.id;
        store.put_note(note).await;

        let topic_id = Uuid::new_v4();
        store
            .notes()
            .complete_indexing(
                id,
                DerivedFields {
                    summary: Some("A greeting".to_string()),
                    compound_text: "hello".to_string(),
                    topic_ids: vec![topic_id],
                    intention_ids: vec![],
                },
            )
            .await
            .unwrap();

        let fetched = store.notes().fetch(id).await.unwrap();
        assert_eq!(fetched.indexing_status, IndexingStatus::Completed);
        assert_eq!(fetched.summary.as_deref(), Some("A greeting"));
        assert_eq!(fetched.compound_text.as_deref(), Some("hello"));
        assert_eq!(fetched.topic_ids, vec![topic_id]);
    }

    #[tokio::test]
    async fn test_write_vectors() {
        let store = MemoryStore::new();
        let note = Note::new(Uuid::new_v4(), "hello");
        let id = note.id;
        store.put_note(note).await;

        store
            .notes()
            .write_vectors(id, None, vec![0.1, 0.2])
            .await
            .unwrap();
        let fetched = store.notes().fetch(id).await.unwrap();
        assert!(fetched.summary_vector.is_none());
        assert_eq!(fetched.compound_text_vector.unwrap(), vec![0.1, 0.2]);
    }

    #[tokio::test]
    async fn test_topic_upsert_creates_then_reuses() {
        let store = MemoryStore::new();
        let topics = store.topics();
        let source_a = Uuid::new_v4();
        let source_b = Uuid::new_v4();

        let first = topics
            .upsert(TopicUpsert {
                name: "Climate Policy".to_string(),
                description: Some("Policy around climate".to_string()),
                source_id: source_a,
            })
            .await
            .unwrap();

        // Different case and spacing, same identity.
        let second = topics
            .upsert(TopicUpsert {
                name: "  climate   POLICY ".to_string(),
                description: None,
                source_id: source_b,
            })
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.topic_count().await, 1);
        assert_eq!(second.source_ids, vec![source_a, source_b]);
        // Empty incoming description never clears the stored one.
        assert_eq!(second.description.as_deref(), Some("Policy around climate"));
    }

    #[tokio::test]
    async fn test_topic_upsert_refreshes_description() {
        let store = MemoryStore::new();
        let topics = store.topics();
        let source = Uuid::new_v4();

        topics
            .upsert(TopicUpsert {
                name: "Rust".to_string(),
                description: Some("old".to_string()),
                source_id: source,
            })
            .await
            .unwrap();
        let updated = topics
            .upsert(TopicUpsert {
                name: "rust".to_string(),
                description: Some("A systems language".to_string()),
                source_id: source,
            })
            .await
            .unwrap();

        assert_eq!(updated.description.as_deref(), Some("A systems language"));
        // Duplicate source contributions collapse.
        assert_eq!(updated.source_ids, vec![source]);
    }

    #[tokio::test]
    async fn test_topic_and_intention_namespaces_are_disjoint() {
        let store = MemoryStore::new();
        let source = Uuid::new_v4();

        let topic = store
            .topics()
            .upsert(TopicUpsert {
                name: "Networking".to_string(),
                description: None,
                source_id: source,
            })
            .await
            .unwrap();
        let intention = store
            .intentions()
            .upsert(TopicUpsert {
                name: "Networking".to_string(),
                description: None,
                source_id: source,
            })
            .await
            .unwrap();

        assert_ne!(topic.id, intention.id);
        assert!(store
            .topics()
            .get_by_name("networking")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .intentions()
            .get_by_name("networking")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_knowledge_delete_by_source_is_scoped() {
        let store = MemoryStore::new();
        let knowledge = store.knowledge();
        let source_a = KnowledgeSource::note(Uuid::new_v4());
        let source_b = KnowledgeSource::note(Uuid::new_v4());

        for source in [&source_a, &source_a, &source_b] {
            knowledge
                .insert(NewAtomicKnowledge {
                    statement: "something".to_string(),
                    is_ask: false,
                    source: *source,
                    human_portfolio_ids: vec![],
                    project_portfolio_ids: vec![],
                    topic_ids: vec![],
                })
                .await
                .unwrap();
        }

        let removed = knowledge.delete_by_source(&source_a).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.knowledge_count().await, 1);
        assert_eq!(knowledge.list_by_source(&source_b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_interest_add_accumulates() {
        let store = MemoryStore::new();
        let interest = store.interest();
        let user = Uuid::new_v4();
        let topic = Uuid::new_v4();

        assert_eq!(interest.add(user, topic, 0.1).await.unwrap(), 0.1);
        let weight = interest.add(user, topic, 0.1).await.unwrap();
        assert!((weight - 0.2).abs() < f32::EPSILON);

        let score = interest.get(user, topic).await.unwrap().unwrap();
        assert!((score.weight - 0.2).abs() < f32::EPSILON);
        assert_eq!(interest.list_for_user(user).await.unwrap().len(), 1);
    }
}
