//! Identity matching: groups offers that reference the same product into
//! [`IdentityRelation`]s by shared offer uri or normalized GTIN.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use offerdb_core::{gtin_key, offer_key, CanonicalOffer, IdentityRelation, TimeContext};
use offerdb_store::RelationStore;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::MatcherError;
use crate::gtin::normalize_gtins;
use crate::reconcile::reconcile;
use crate::union_find::DisjointSet;

/// Hex characters of the sha256 digest kept in a relation id.
const RELATION_ID_HEX_LEN: usize = 16;

/// Deterministic relation id derived from the uri of the founding offer:
/// `"rel-"` followed by the first 16 hex characters of its sha256.
#[must_use]
pub fn relation_id(uri: &str) -> String {
    let hash = Sha256::digest(uri.as_bytes());
    let mut id = String::from("rel-");
    for byte in hash.iter().take(RELATION_ID_HEX_LEN / 2) {
        let _ = write!(id, "{byte:02x}");
    }
    id
}

/// What matching one offer did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Created(String),
    Joined(String),
    /// The offer bridged several relations; `absorbed` were soft-merged into
    /// `primary`.
    Merged {
        primary: String,
        absorbed: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub created: usize,
    pub joined: usize,
    pub merged: usize,
    /// `(uri, error)` for every offer that could not be matched.
    pub failed: Vec<(String, String)>,
}

/// Matches offers into relations held by a [`RelationStore`].
///
/// Soft-merged relations stay in the store; a disjoint-set forest built from
/// their `merged_to` pointers resolves any indexed id to its live relation.
pub struct IdentityMatcher<S> {
    store: S,
    sets: DisjointSet<String>,
}

impl<S: RelationStore> IdentityMatcher<S> {
    /// Wraps `store`, loading the merge forest from its relations.
    ///
    /// # Errors
    ///
    /// Returns [`MatcherError::Store`] if the relations cannot be read.
    pub fn new(store: S) -> Result<Self, MatcherError> {
        let mut sets = DisjointSet::new();
        for relation in store.all()? {
            sets.make_set(relation.id.clone());
            if let Some(target) = &relation.merged_to {
                if !sets.union_into(&relation.id, target) {
                    tracing::warn!(
                        relation = %relation.id,
                        merged_to = %target,
                        "merge pointer closes a cycle; ignoring it"
                    );
                }
            }
        }
        Ok(Self { store, sets })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Matches every offer in order. An offer that fails is logged, recorded
    /// in the report and skipped; the rest of the batch still runs.
    pub fn match_batch(&mut self, offers: &[CanonicalOffer], ctx: &TimeContext) -> BatchReport {
        let mut report = BatchReport::default();
        for offer in offers {
            match self.match_offer(offer, ctx) {
                Ok(MatchOutcome::Created(_)) => report.created += 1,
                Ok(MatchOutcome::Joined(_)) => report.joined += 1,
                Ok(MatchOutcome::Merged { absorbed, .. }) => {
                    report.joined += 1;
                    report.merged += absorbed.len();
                }
                Err(e) => {
                    tracing::warn!(uri = %offer.uri, error = %e, "identity matching failed; skipping offer");
                    report.failed.push((offer.uri.clone(), e.to_string()));
                }
            }
        }
        tracing::info!(
            offers = offers.len(),
            created = report.created,
            joined = report.joined,
            merged = report.merged,
            failed = report.failed.len(),
            "identity batch complete"
        );
        report
    }

    /// Places `offer` in a relation.
    ///
    /// Every live relation sharing the offer's uri or one of its normalized
    /// GTINs is a candidate. With none, a relation is founded; with one, the
    /// offer joins it; with several, the largest becomes primary and the
    /// others are soft-merged into it. The offer's facts are reconciled into
    /// the primary's entry for the offer's market.
    ///
    /// # Errors
    ///
    /// Returns [`MatcherError::InvalidOffer`] for an offer without a uri and
    /// [`MatcherError::Store`] or [`MatcherError::MissingRelation`] when the
    /// store fails or is inconsistent.
    pub fn match_offer(
        &mut self,
        offer: &CanonicalOffer,
        ctx: &TimeContext,
    ) -> Result<MatchOutcome, MatcherError> {
        if offer.uri.trim().is_empty() {
            return Err(MatcherError::InvalidOffer(format!(
                "offer '{}' from {} has no uri",
                offer.provenance_id, offer.dealer
            )));
        }

        let gtins = normalize_gtins(&offer.gtins);
        let keys = lookup_keys(&offer.uri, &gtins);
        let mut candidates = self.live_relations(&keys)?;

        let (mut primary, original, outcome) = match candidates.len() {
            0 => {
                let id = relation_id(&offer.uri);
                let relation = match self.store.get(&id)? {
                    Some(existing) => existing,
                    None => IdentityRelation::new(id.clone(), ctx.now),
                };
                self.sets.make_set(id.clone());
                let original = IdentityRelation::new(id.clone(), ctx.now);
                (relation, original, MatchOutcome::Created(id))
            }
            1 => {
                let relation = candidates.remove(0);
                let original = relation.clone();
                let outcome = MatchOutcome::Joined(relation.id.clone());
                (relation, original, outcome)
            }
            _ => {
                let index = primary_index(&candidates, &offer.uri);
                let mut relation = candidates.swap_remove(index);
                candidates.sort_by(|a, b| a.id.cmp(&b.id));
                let original = relation.clone();
                let absorbed = self.absorb(&mut relation, candidates, ctx)?;
                let outcome = MatchOutcome::Merged {
                    primary: relation.id.clone(),
                    absorbed,
                };
                (relation, original, outcome)
            }
        };

        primary.offers.insert(offer.uri.clone());
        primary.gtins.extend(gtins);
        match primary.markets.get_mut(&offer.market) {
            Some(current) => {
                reconcile(current, &offer.facts);
            }
            None => {
                primary
                    .markets
                    .insert(offer.market.clone(), offer.facts.clone());
            }
        }

        if primary != original || matches!(outcome, MatchOutcome::Created(_)) {
            primary.updated_at = ctx.now;
            tracing::debug!(uri = %offer.uri, relation = %primary.id, "offer matched");
            self.store.upsert(primary)?;
        }
        Ok(outcome)
    }

    /// Uris of every other offer in the live relation(s) `offer` maps to.
    ///
    /// # Errors
    ///
    /// Returns [`MatcherError::Store`] or [`MatcherError::MissingRelation`]
    /// when the store fails or is inconsistent.
    pub fn find_matches(&mut self, offer: &CanonicalOffer) -> Result<Vec<String>, MatcherError> {
        let keys = lookup_keys(&offer.uri, &normalize_gtins(&offer.gtins));
        let mut uris: BTreeSet<String> = self
            .live_relations(&keys)?
            .into_iter()
            .flat_map(|relation| relation.offers)
            .collect();
        uris.remove(&offer.uri);
        Ok(uris.into_iter().collect())
    }

    /// Joins the relations holding two already-matched offers, e.g. after a
    /// similarity match. Returns the id of the surviving relation.
    ///
    /// # Errors
    ///
    /// Returns [`MatcherError::UnknownOffer`] if either uri is in no relation,
    /// and store errors as in [`IdentityMatcher::match_offer`].
    pub fn link(
        &mut self,
        uri_a: &str,
        uri_b: &str,
        ctx: &TimeContext,
    ) -> Result<String, MatcherError> {
        let a = self.relation_of(uri_a)?;
        let b = self.relation_of(uri_b)?;
        if a.id == b.id {
            return Ok(a.id);
        }

        let mut pair = vec![a, b];
        let index = primary_index(&pair, "");
        let mut primary = pair.swap_remove(index);
        let original = primary.clone();
        self.absorb(&mut primary, pair, ctx)?;

        let id = primary.id.clone();
        if primary != original {
            primary.updated_at = ctx.now;
            self.store.upsert(primary)?;
        }
        tracing::info!(%uri_a, %uri_b, relation = %id, "linked offers");
        Ok(id)
    }

    fn relation_of(&mut self, uri: &str) -> Result<IdentityRelation, MatcherError> {
        self.live_relations(&[offer_key(uri)])?
            .into_iter()
            .next()
            .ok_or_else(|| MatcherError::UnknownOffer {
                uri: uri.to_string(),
            })
    }

    /// Distinct live relations indexed under any of `keys`, ordered by id.
    fn live_relations(&mut self, keys: &[String]) -> Result<Vec<IdentityRelation>, MatcherError> {
        let mut roots = BTreeSet::new();
        for key in keys {
            for id in self.store.find_by_key(key)? {
                roots.insert(self.sets.find(&id));
            }
        }

        let mut relations = Vec::with_capacity(roots.len());
        for id in roots {
            let relation = self
                .store
                .get(&id)?
                .ok_or_else(|| MatcherError::MissingRelation { id: id.clone() })?;
            if relation.is_merged {
                tracing::warn!(relation = %relation.id, "merged relation has no live root; using it as is");
            }
            relations.push(relation);
        }
        Ok(relations)
    }

    /// Soft-merges `others` into `primary`: members, GTINs and per-market
    /// facts move over, and each absorbed relation is flagged and pointed at
    /// the primary. Returns the absorbed ids.
    fn absorb(
        &mut self,
        primary: &mut IdentityRelation,
        others: Vec<IdentityRelation>,
        ctx: &TimeContext,
    ) -> Result<Vec<String>, MatcherError> {
        let mut absorbed = Vec::with_capacity(others.len());
        for mut other in others {
            primary.offers.extend(other.offers.iter().cloned());
            primary.gtins.extend(other.gtins.iter().cloned());
            for (market, facts) in &other.markets {
                match primary.markets.get_mut(market) {
                    Some(current) => {
                        reconcile(current, facts);
                    }
                    None => {
                        primary.markets.insert(market.clone(), facts.clone());
                    }
                }
            }

            other.is_merged = true;
            other.merged_to = Some(primary.id.clone());
            other.updated_at = ctx.now;
            self.sets.union_into(&other.id, &primary.id);
            tracing::info!(absorbed = %other.id, into = %primary.id, "soft-merged relation");
            absorbed.push(other.id.clone());
            self.store.upsert(other)?;
        }
        Ok(absorbed)
    }
}

fn lookup_keys(uri: &str, gtins: &BTreeSet<String>) -> Vec<String> {
    std::iter::once(offer_key(uri))
        .chain(gtins.iter().map(|gtin| gtin_key(gtin)))
        .collect()
}

/// Index of the relation that survives a merge: the one with the most
/// offers, then one not already holding `uri`, then the lowest id.
fn primary_index(candidates: &[IdentityRelation], uri: &str) -> usize {
    candidates
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            b.offers
                .len()
                .cmp(&a.offers.len())
                .then_with(|| a.contains_offer(uri).cmp(&b.contains_offer(uri)))
                .then_with(|| a.id.cmp(&b.id))
        })
        .map_or(0, |(index, _)| index)
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
