//! Duplicate detection for canonical offers: GTIN-based identity relations,
//! fact reconciliation, and TF-IDF similarity candidates.

pub mod error;
pub mod gtin;
pub mod identity;
pub mod reconcile;
pub mod similarity;
pub mod union_find;

pub use error::MatcherError;
pub use gtin::{is_valid_ean13, is_valid_nobb, normalize_gtin, normalize_gtins};
pub use identity::{relation_id, BatchReport, IdentityMatcher, MatchOutcome};
pub use reconcile::{choose, reconcile, Side};
pub use similarity::{accept, Rejection, SimilarityConfig, SimilarityIndex, SimilarityMatch};
pub use union_find::DisjointSet;
