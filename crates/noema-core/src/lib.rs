//! # noema-core
//!
//! Core types, traits, and abstractions for the noema knowledge pipeline.
//!
//! This crate provides the foundational data structures and the capability
//! contracts (record store, extraction, vision, embedding) that other noema
//! crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
