//! Offer persistence keyed by `uri`, with re-scrape protection for manually
//! edited fields.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use offerdb_core::{CanonicalOffer, ContestedField, TimeContext};

use crate::StoreError;

/// What an upsert did to the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

pub trait OfferStore {
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store fails.
    fn get(&self, uri: &str) -> Result<Option<CanonicalOffer>, StoreError>;

    /// Writes `offer` under its uri. Fields the stored copy protects with a
    /// manual edit younger than `retention` keep their stored value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store fails or the offer has no uri.
    fn upsert(
        &mut self,
        offer: CanonicalOffer,
        ctx: &TimeContext,
        retention: Duration,
    ) -> Result<UpsertOutcome, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store fails.
    fn all(&self) -> Result<Vec<CanonicalOffer>, StoreError>;
}

/// Combines a freshly scraped offer with the stored copy.
///
/// Protected fields (value, version and override flags) come from `stored`.
/// Every other field comes from `incoming`, which drops lapsed overrides.
#[must_use]
pub fn merge_rescrape(
    stored: &CanonicalOffer,
    mut incoming: CanonicalOffer,
    now: DateTime<Utc>,
    retention: Duration,
) -> CanonicalOffer {
    for field in ContestedField::ALL {
        if stored.facts.overrides.is_protected(field, now, retention) {
            incoming.facts.take_field(&stored.facts, field);
        } else if stored.facts.overrides.is_manual(field) {
            tracing::debug!(
                uri = %stored.uri,
                field = %field,
                "manual override lapsed; taking scraped value"
            );
        }
    }
    incoming
}

#[derive(Debug, Default)]
pub struct MemoryOfferStore {
    offers: BTreeMap<String, CanonicalOffer>,
}

impl MemoryOfferStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a store from a JSON array of offers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Snapshot`] for malformed JSON and
    /// [`StoreError::InvalidRecord`] for offers without a uri.
    pub fn from_snapshot(json: &str) -> Result<Self, StoreError> {
        let offers: Vec<CanonicalOffer> = serde_json::from_str(json)?;
        let mut store = Self::new();
        for offer in offers {
            validate_uri(&offer)?;
            store.offers.insert(offer.uri.clone(), offer);
        }
        Ok(store)
    }

    /// Serializes every offer, ordered by uri.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Snapshot`] if serialization fails.
    pub fn snapshot(&self) -> Result<String, StoreError> {
        let offers: Vec<&CanonicalOffer> = self.offers.values().collect();
        Ok(serde_json::to_string_pretty(&offers)?)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }
}

fn validate_uri(offer: &CanonicalOffer) -> Result<(), StoreError> {
    if offer.uri.trim().is_empty() {
        return Err(StoreError::InvalidRecord(format!(
            "offer '{}' from {} has no uri",
            offer.provenance_id, offer.dealer
        )));
    }
    Ok(())
}

impl OfferStore for MemoryOfferStore {
    fn get(&self, uri: &str) -> Result<Option<CanonicalOffer>, StoreError> {
        Ok(self.offers.get(uri).cloned())
    }

    fn upsert(
        &mut self,
        offer: CanonicalOffer,
        ctx: &TimeContext,
        retention: Duration,
    ) -> Result<UpsertOutcome, StoreError> {
        validate_uri(&offer)?;

        let Some(stored) = self.offers.get(&offer.uri) else {
            self.offers.insert(offer.uri.clone(), offer);
            return Ok(UpsertOutcome::Inserted);
        };

        let merged = merge_rescrape(stored, offer, ctx.now, retention);
        if &merged == stored {
            return Ok(UpsertOutcome::Unchanged);
        }
        self.offers.insert(merged.uri.clone(), merged);
        Ok(UpsertOutcome::Updated)
    }

    fn all(&self) -> Result<Vec<CanonicalOffer>, StoreError> {
        Ok(self.offers.values().cloned().collect())
    }
}
