//! Key-value persistence for canonical offers and identity relations.
//!
//! The traits model the document store the pipeline writes to; the in-memory
//! implementations back the CLI and the test suites.

pub mod offers;
pub mod relations;

use thiserror::Error;

pub use offers::{merge_rescrape, MemoryOfferStore, OfferStore, UpsertOutcome};
pub use relations::{MemoryRelationStore, RelationStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
