//! Free-text quantity extraction, category resolution and normalization of
//! raw dealer records into canonical offers.

pub mod category;
pub mod classify;
pub mod error;
pub mod explicit;
pub mod extract;
pub mod field_map;
pub mod normalize;
pub mod standardize;
pub mod tokenize;
pub mod units;

pub use category::{breadcrumb_from_value, CategoryTable};
pub use classify::{Classifier, Reading};
pub use error::{CategoryError, ParserError};
pub use explicit::ExplicitQuantities;
pub use extract::{extract, extract_fields, Extractor};
pub use field_map::{apply_field_mapping, RawOffer};
pub use normalize::normalize_offer;
pub use standardize::{standardize, standardize_field};
pub use tokenize::{tokenize, NumberContext};
pub use units::UnitTable;
