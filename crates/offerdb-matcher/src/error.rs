use offerdb_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatcherError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("relation {id} is indexed but missing from the store")]
    MissingRelation { id: String },

    #[error("offer {uri} belongs to no relation")]
    UnknownOffer { uri: String },

    #[error("invalid offer: {0}")]
    InvalidOffer(String),
}
