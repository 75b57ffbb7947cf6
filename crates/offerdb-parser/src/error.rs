use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid unit table: {0}")]
    UnitTable(String),

    #[error("normalization error for offer {provenance_id}: {reason}")]
    Normalization {
        provenance_id: String,
        reason: String,
    },

    #[error("dealer '{dealer}' has no namespace configured")]
    MissingNamespace { dealer: String },

    #[error(transparent)]
    Category(#[from] CategoryError),
}

/// Integrity failures in the canonical category tree. These indicate a broken
/// configuration, not a bad offer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CategoryError {
    #[error("category '{key}' references missing parent '{parent}'")]
    MissingParent { key: String, parent: String },

    #[error("category '{key}' is part of a parent cycle")]
    Cycle { key: String },

    #[error("duplicate category key '{0}'")]
    DuplicateKey(String),
}
