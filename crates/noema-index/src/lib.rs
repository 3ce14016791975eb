//! # noema-index
//!
//! The noema indexing pipeline: derives structured knowledge from short
//! user-authored notes.
//!
//! One run per note, triggered fire-and-forget and safe to re-run. This
//! crate provides:
//! - Reference resolver (images and URLs become text fragments)
//! - Compound text builder (one canonical ordered string per note)
//! - Extraction engine (summary, atomic knowledge, topics, intentions)
//! - Embedding stage (vectors for summary and compound text)
//! - Knowledge graph writer (deduplicated topics and knowledge records)
//! - Interest tracker (per-author topic interest signals)
//! - Indexing orchestrator (the status state machine over it all)
//!
//! # Example
//!
//! ```rust,ignore
//! use noema_index::{IndexService, IndexerConfig, NoteIndexer};
//!
//! let indexer = NoteIndexer::new(
//!     notes, knowledge, topics, intentions, interest,
//!     extraction_backend, vision_backend, embedding_backend,
//!     IndexerConfig::from_env(),
//! );
//! let service = IndexService::new(indexer);
//! service.trigger(note_id)?; // fire-and-forget
//! ```

pub mod compound;
pub mod embedding;
pub mod extraction;
pub mod graph;
pub mod indexer;
pub mod interest;
pub mod references;

pub use compound::build_compound_text;
pub use embedding::EmbeddingStage;
pub use extraction::{parse_extraction_payload, ExtractionEngine, ExtractionVariant};
pub use graph::{GraphWriteResult, KnowledgeGraphWriter};
pub use indexer::{IndexService, IndexerConfig, NoteIndexer};
pub use interest::InterestTracker;
pub use references::{FragmentKind, ReferenceFragment, ReferenceResolver};
