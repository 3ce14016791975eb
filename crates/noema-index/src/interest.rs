//! Interest tracker — accumulating per-user topic signals.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use noema_core::InterestStore;

/// Adds a fixed increment to the author's interest score for every topic
/// touched by a note they authored.
///
/// Interest scores are an auxiliary signal, not correctness-critical data:
/// every store error is caught and logged here, never re-thrown.
pub struct InterestTracker {
    store: Arc<dyn InterestStore>,
    increment: f32,
}

impl InterestTracker {
    pub fn new(store: Arc<dyn InterestStore>, increment: f32) -> Self {
        Self { store, increment }
    }

    pub fn increment(&self) -> f32 {
        self.increment
    }

    /// Apply the increment for each topic. Returns how many updates were
    /// actually applied.
    pub async fn record(&self, user_id: Uuid, topic_ids: &[Uuid]) -> usize {
        let mut applied = 0;
        for topic_id in topic_ids {
            match self.store.add(user_id, *topic_id, self.increment).await {
                Ok(_) => applied += 1,
                Err(e) => warn!(
                    author_id = %user_id,
                    topic = %topic_id,
                    error = %e,
                    "Interest update failed, continuing"
                ),
            }
        }
        debug!(
            author_id = %user_id,
            result_count = applied,
            "Interest scores updated"
        );
        applied
    }
}
