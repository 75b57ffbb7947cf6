use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::offers::ProductFacts;

/// A set of offers believed to reference the same physical product.
///
/// Relations are never deleted: when a new offer bridges two relations the
/// smaller one is flagged `is_merged` and points at the survivor through
/// `merged_to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRelation {
    pub id: String,
    #[serde(default)]
    pub offers: BTreeSet<String>,
    /// Normalized GTIN keys, e.g. `"ean:7038010009457"`.
    #[serde(default)]
    pub gtins: BTreeSet<String>,
    #[serde(default)]
    pub is_merged: bool,
    pub merged_to: Option<String>,
    /// Reconciled product facts per market code.
    #[serde(default)]
    pub markets: BTreeMap<String, ProductFacts>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentityRelation {
    /// An empty, live relation.
    #[must_use]
    pub fn new(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            offers: BTreeSet::new(),
            gtins: BTreeSet::new(),
            is_merged: false,
            merged_to: None,
            markets: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn contains_offer(&self, uri: &str) -> bool {
        self.offers.contains(uri)
    }

    /// Lookup keys under which this relation is indexed: `uri:{uri}` for
    /// every member and `gtin:{key}` for every GTIN.
    #[must_use]
    pub fn index_keys(&self) -> Vec<String> {
        self.offers
            .iter()
            .map(|uri| offer_key(uri))
            .chain(self.gtins.iter().map(|gtin| gtin_key(gtin)))
            .collect()
    }
}

/// Index key for an offer uri.
#[must_use]
pub fn offer_key(uri: &str) -> String {
    format!("uri:{uri}")
}

/// Index key for a normalized GTIN.
#[must_use]
pub fn gtin_key(gtin: &str) -> String {
    format!("gtin:{gtin}")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn new_relation_is_live_and_empty() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let relation = IdentityRelation::new("rel-1".to_string(), now);
        assert!(!relation.is_merged);
        assert!(relation.merged_to.is_none());
        assert!(relation.offers.is_empty());
        assert_eq!(relation.created_at, relation.updated_at);
    }

    #[test]
    fn index_keys_cover_offers_and_gtins() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut relation = IdentityRelation::new("rel-1".to_string(), now);
        relation.offers.insert("meny:1".to_string());
        relation.gtins.insert("ean:7038010009457".to_string());

        assert_eq!(
            relation.index_keys(),
            vec![
                "uri:meny:1".to_string(),
                "gtin:ean:7038010009457".to_string()
            ]
        );
        assert!(relation.contains_offer("meny:1"));
        assert!(!relation.contains_offer("meny:2"));
    }
}
