//! Shared domain types and configuration for the offerdb workspace.

pub mod app_config;
pub mod config;
pub mod dealers;
pub mod offers;
pub mod quantity;
pub mod relations;
pub mod time;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use dealers::{
    load_dealers, parse_dealers, CategoryRule, CategoryStrategy, DealerConfig, DealersFile,
    FieldRule,
};
pub use offers::{
    CanonicalOffer, CategoryNode, ContestedField, Nutrient, Overrides, Pricing, ProductFacts,
    SchemaVersions, CURRENT_SCHEMA_VERSION,
};
pub use quantity::{
    AmountRange, Extraction, OfferQuantityField, Quantity, SiConversion, Unit, UnitKind,
};
pub use relations::{gtin_key, offer_key, IdentityRelation};
pub use time::TimeContext;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    FileParse(#[from] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),
}
