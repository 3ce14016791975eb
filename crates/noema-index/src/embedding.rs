//! Embedding stage — generate and persist the note's vectors.

use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use noema_core::{EmbeddingBackend, Error, NoteStore, Result};

/// Generates embeddings for a note's summary and compound text and writes
/// them verbatim through the note store. This stage performs no comparison
/// or search.
pub struct EmbeddingStage {
    backend: Arc<dyn EmbeddingBackend>,
    notes: Arc<dyn NoteStore>,
}

impl EmbeddingStage {
    pub fn new(backend: Arc<dyn EmbeddingBackend>, notes: Arc<dyn NoteStore>) -> Self {
        Self { backend, notes }
    }

    /// Embed the compound text (always) and the summary (when present) in
    /// one batch, then persist both vectors.
    #[instrument(skip(self, summary, compound_text), fields(subsystem = "index", component = "embedding", op = "embed_and_store", note_id = %note_id, model = self.backend.model_name()))]
    pub async fn embed_and_store(
        &self,
        note_id: Uuid,
        summary: Option<&str>,
        compound_text: &str,
    ) -> Result<()> {
        let mut inputs = vec![compound_text.to_string()];
        if let Some(summary) = summary {
            inputs.push(summary.to_string());
        }

        let mut vectors = self.backend.embed_texts(&inputs).await?;
        if vectors.len() != inputs.len() {
            return Err(Error::Embedding(format!(
                "Expected {} vectors, got {}",
                inputs.len(),
                vectors.len()
            )));
        }

        let compound_vector = vectors.remove(0);
        let summary_vector = vectors.pop();

        debug!(
            has_summary_vector = summary_vector.is_some(),
            "Persisting note vectors"
        );
        self.notes
            .write_vectors(note_id, summary_vector, compound_vector)
            .await
    }
}
