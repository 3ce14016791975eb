//! # noema-store
//!
//! In-memory implementation of the noema record-store contracts.
//!
//! The production record store is an external collaborator; this crate
//! provides a contract-conformant store backed by `tokio::sync::RwLock`
//! maps, used by the integration suite and local development.
//!
//! ## Example
//!
//! ```rust
//! use noema_core::{Note, NoteStore};
//! use noema_store::MemoryStore;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> noema_core::Result<()> {
//!     let store = MemoryStore::new();
//!     let note = Note::new(Uuid::new_v4(), "Hello, world!");
//!     let id = note.id;
//!     store.put_note(note).await;
//!
//!     let fetched = store.notes().fetch(id).await?;
//!     assert_eq!(fetched.text, "Hello, world!");
//!     Ok(())
//! }
//! ```

pub mod memory;

pub use memory::{
    MemInterestStore, MemIntentionStore, MemKnowledgeStore, MemNoteStore, MemTopicStore,
    MemoryStore,
};

// Re-export core types
pub use noema_core::*;
