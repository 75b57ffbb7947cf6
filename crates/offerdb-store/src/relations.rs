//! Identity-relation persistence with a secondary index from `uri:` and
//! `gtin:` keys to relation ids.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use offerdb_core::IdentityRelation;

use crate::StoreError;

pub trait RelationStore {
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store fails.
    fn get(&self, id: &str) -> Result<Option<IdentityRelation>, StoreError>;

    /// Ids of every relation (live or merged) indexed under `key`, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store fails.
    fn find_by_key(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Writes `relation` and re-indexes it. Writing the same relation twice
    /// leaves the store unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store fails or the relation has
    /// no id.
    fn upsert(&mut self, relation: IdentityRelation) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store fails.
    fn all(&self) -> Result<Vec<IdentityRelation>, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryRelationStore {
    relations: BTreeMap<String, IdentityRelation>,
    index: HashMap<String, BTreeSet<String>>,
}

impl MemoryRelationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a store from a JSON array of relations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Snapshot`] for malformed JSON and
    /// [`StoreError::InvalidRecord`] for relations without an id.
    pub fn from_snapshot(json: &str) -> Result<Self, StoreError> {
        let relations: Vec<IdentityRelation> = serde_json::from_str(json)?;
        let mut store = Self::new();
        for relation in relations {
            store.upsert(relation)?;
        }
        Ok(store)
    }

    /// Serializes every relation, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Snapshot`] if serialization fails.
    pub fn snapshot(&self) -> Result<String, StoreError> {
        let relations: Vec<&IdentityRelation> = self.relations.values().collect();
        Ok(serde_json::to_string_pretty(&relations)?)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    fn unindex(&mut self, relation: &IdentityRelation) {
        for key in relation.index_keys() {
            if let Some(ids) = self.index.get_mut(&key) {
                ids.remove(&relation.id);
                if ids.is_empty() {
                    self.index.remove(&key);
                }
            }
        }
    }
}

impl RelationStore for MemoryRelationStore {
    fn get(&self, id: &str) -> Result<Option<IdentityRelation>, StoreError> {
        Ok(self.relations.get(id).cloned())
    }

    fn find_by_key(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .index
            .get(key)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn upsert(&mut self, relation: IdentityRelation) -> Result<(), StoreError> {
        if relation.id.trim().is_empty() {
            return Err(StoreError::InvalidRecord(
                "relation has no id".to_string(),
            ));
        }

        if let Some(previous) = self.relations.remove(&relation.id) {
            self.unindex(&previous);
        }
        for key in relation.index_keys() {
            self.index
                .entry(key)
                .or_default()
                .insert(relation.id.clone());
        }
        tracing::trace!(
            relation = %relation.id,
            offers = relation.offers.len(),
            merged = relation.is_merged,
            "relation stored"
        );
        self.relations.insert(relation.id.clone(), relation);
        Ok(())
    }

    fn all(&self) -> Result<Vec<IdentityRelation>, StoreError> {
        Ok(self.relations.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use offerdb_core::{gtin_key, offer_key};

    use super::*;

    fn relation(id: &str, offers: &[&str], gtins: &[&str]) -> IdentityRelation {
        let mut relation =
            IdentityRelation::new(id.to_string(), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        relation.offers = offers.iter().map(|s| (*s).to_string()).collect();
        relation.gtins = gtins.iter().map(|s| (*s).to_string()).collect();
        relation
    }

    #[test]
    fn find_by_offer_and_gtin_keys() {
        let mut store = MemoryRelationStore::new();
        store
            .upsert(relation("rel-a", &["meny:1"], &["ean:7038010009457"]))
            .unwrap();
        assert_eq!(store.find_by_key(&offer_key("meny:1")).unwrap(), vec!["rel-a"]);
        assert_eq!(
            store.find_by_key(&gtin_key("ean:7038010009457")).unwrap(),
            vec!["rel-a"]
        );
        assert!(store.find_by_key(&offer_key("meny:2")).unwrap().is_empty());
    }

    #[test]
    fn upsert_reindexes_removed_members() {
        let mut store = MemoryRelationStore::new();
        store.upsert(relation("rel-a", &["meny:1", "oda:9"], &[])).unwrap();
        store.upsert(relation("rel-a", &["meny:1"], &[])).unwrap();
        assert!(store.find_by_key(&offer_key("oda:9")).unwrap().is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn shared_key_lists_every_relation_sorted() {
        let mut store = MemoryRelationStore::new();
        store.upsert(relation("rel-b", &[], &["nobb:12345678"])).unwrap();
        store.upsert(relation("rel-a", &[], &["nobb:12345678"])).unwrap();
        assert_eq!(
            store.find_by_key(&gtin_key("nobb:12345678")).unwrap(),
            vec!["rel-a", "rel-b"]
        );
    }

    #[test]
    fn repeated_upsert_is_idempotent() {
        let mut store = MemoryRelationStore::new();
        let rel = relation("rel-a", &["meny:1"], &["ean:7038010009457"]);
        store.upsert(rel.clone()).unwrap();
        let before = store.snapshot().unwrap();
        store.upsert(rel).unwrap();
        assert_eq!(store.snapshot().unwrap(), before);
    }

    #[test]
    fn rejects_blank_id() {
        let mut store = MemoryRelationStore::new();
        let err = store.upsert(relation(" ", &[], &[])).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)), "got: {err:?}");
    }

    #[test]
    fn snapshot_roundtrip_restores_index() {
        let mut store = MemoryRelationStore::new();
        store.upsert(relation("rel-a", &["meny:1"], &[])).unwrap();
        let restored = MemoryRelationStore::from_snapshot(&store.snapshot().unwrap()).unwrap();
        assert_eq!(restored.get("rel-a").unwrap(), store.get("rel-a").unwrap());
        assert_eq!(
            restored.find_by_key(&offer_key("meny:1")).unwrap(),
            vec!["rel-a"]
        );
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        let err = MemoryRelationStore::from_snapshot("{").unwrap_err();
        assert!(matches!(err, StoreError::Snapshot(_)), "got: {err:?}");
    }
}
