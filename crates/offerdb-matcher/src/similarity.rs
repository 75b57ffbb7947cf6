//! Text-similarity candidate matching for offers without a shared GTIN.
//!
//! Each offer's [`CanonicalOffer::search_text`] becomes a TF-IDF vector;
//! candidates are compared by cosine similarity and then filtered by
//! dealer, standardized size and price.

use std::collections::HashMap;

use offerdb_core::{CanonicalOffer, Quantity};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityConfig {
    /// Minimum cosine similarity for a candidate to be considered.
    pub floor: f64,
    /// Maximum relative price difference, `|a - b| / max(a, b)`, accepted
    /// when both offers carry a price.
    pub price_ratio_cutoff: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            floor: 0.7,
            price_ratio_cutoff: 0.6,
        }
    }
}

/// An accepted candidate pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMatch {
    pub uri: String,
    pub candidate: String,
    pub score: f64,
}

/// Why an otherwise similar candidate was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    SameDealer,
    SizeMismatch,
    PriceMismatch,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::SameDealer => write!(f, "same dealer"),
            Rejection::SizeMismatch => write!(f, "standardized size differs"),
            Rejection::PriceMismatch => write!(f, "price too far apart"),
        }
    }
}

type TermVector = HashMap<String, f64>;

/// L2-normalized TF-IDF vectors over a fixed set of offers.
pub struct SimilarityIndex<'a> {
    offers: &'a [CanonicalOffer],
    vectors: Vec<TermVector>,
}

impl<'a> SimilarityIndex<'a> {
    /// Builds vectors with `tf * (ln((1 + N) / (1 + df)) + 1)` weights, where
    /// `tf` is the raw term count in the offer and `df` the number of offers
    /// containing the term.
    #[must_use]
    pub fn build(offers: &'a [CanonicalOffer]) -> Self {
        let term_counts: Vec<HashMap<String, usize>> = offers
            .iter()
            .map(|offer| {
                let mut counts = HashMap::new();
                for term in terms(&offer.search_text()) {
                    *counts.entry(term).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for counts in &term_counts {
            for term in counts.keys() {
                *document_frequency.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let total = offers.len() as f64;
        let vectors = term_counts
            .iter()
            .map(|counts| {
                let mut vector: TermVector = counts
                    .iter()
                    .map(|(term, count)| {
                        #[allow(clippy::cast_precision_loss)]
                        let df = document_frequency.get(term.as_str()).copied().unwrap_or(0) as f64;
                        #[allow(clippy::cast_precision_loss)]
                        let tf = *count as f64;
                        let idf = ((1.0 + total) / (1.0 + df)).ln() + 1.0;
                        (term.clone(), tf * idf)
                    })
                    .collect();
                normalize(&mut vector);
                vector
            })
            .collect();

        tracing::debug!(
            offers = offers.len(),
            terms = document_frequency.len(),
            "similarity index built"
        );
        Self { offers, vectors }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    /// Cosine similarity of offers `a` and `b`. Out-of-range indices score 0.
    #[must_use]
    pub fn score(&self, a: usize, b: usize) -> f64 {
        match (self.vectors.get(a), self.vectors.get(b)) {
            (Some(left), Some(right)) => dot(left, right),
            _ => 0.0,
        }
    }

    /// For each offer, its single highest-scoring other offer (ties go to
    /// the earlier offer), kept when the score reaches `config.floor` and
    /// the pair passes [`accept`].
    #[must_use]
    pub fn best_matches(&self, config: &SimilarityConfig) -> Vec<SimilarityMatch> {
        let mut matches = Vec::new();
        for (i, offer) in self.offers.iter().enumerate() {
            let mut best: Option<(usize, f64)> = None;
            for j in (0..self.offers.len()).filter(|j| *j != i) {
                let score = self.score(i, j);
                if best.is_none_or(|(_, top)| score > top) {
                    best = Some((j, score));
                }
            }

            let Some((j, score)) = best else { continue };
            if score < config.floor {
                continue;
            }
            let candidate = &self.offers[j];
            match accept(offer, candidate, config) {
                Ok(()) => matches.push(SimilarityMatch {
                    uri: offer.uri.clone(),
                    candidate: candidate.uri.clone(),
                    score,
                }),
                Err(reason) => {
                    tracing::debug!(
                        uri = %offer.uri,
                        candidate = %candidate.uri,
                        score,
                        %reason,
                        "similar candidate rejected"
                    );
                }
            }
        }
        matches
    }
}

/// Checks the non-textual conditions for two similar offers to be the same
/// product: different dealers, equal standardized size, and close prices
/// when both are known.
///
/// # Errors
///
/// Returns the first failing [`Rejection`].
pub fn accept(
    offer: &CanonicalOffer,
    candidate: &CanonicalOffer,
    config: &SimilarityConfig,
) -> Result<(), Rejection> {
    if offer.dealer == candidate.dealer {
        return Err(Rejection::SameDealer);
    }
    if !same_standard_size(&offer.facts.quantity.size, &candidate.facts.quantity.size) {
        return Err(Rejection::SizeMismatch);
    }
    if let (Some(a), Some(b)) = (offer.pricing.price, candidate.pricing.price) {
        if price_ratio(a, b) >= config.price_ratio_cutoff {
            return Err(Rejection::PriceMismatch);
        }
    }
    Ok(())
}

/// Both sizes standardized, in the same SI base, with equal amounts.
fn same_standard_size(a: &Quantity, b: &Quantity) -> bool {
    let target = |q: &Quantity| {
        q.unit
            .as_ref()
            .and_then(|unit| unit.si.as_ref())
            .map(|si| si.target.clone())
    };
    a.standard.max.is_some() && a.standard == b.standard && target(a) == target(b)
}

/// `|a - b| / max(a, b)`; two zero prices are identical.
fn price_ratio(a: f64, b: f64) -> f64 {
    let max = a.max(b);
    if max <= 0.0 {
        return 0.0;
    }
    (a - b).abs() / max
}

/// Lowercased alphanumeric runs of the NFKC form of `text`, so composed and
/// decomposed spellings of the same letter yield the same term.
fn terms(text: &str) -> Vec<String> {
    let normalized: String = text.nfkc().collect();
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn normalize(vector: &mut TermVector) {
    let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for weight in vector.values_mut() {
            *weight /= norm;
        }
    }
}

fn dot(a: &TermVector, b: &TermVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(term, weight)| large.get(term).map(|other| weight * other))
        .sum()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use offerdb_core::{AmountRange, SiConversion, Unit, UnitKind};

    use super::*;

    fn offer(dealer: &str, id: &str, title: &str) -> CanonicalOffer {
        CanonicalOffer::new(
            dealer,
            dealer,
            id,
            title,
            Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap(),
        )
    }

    fn sized(mut offer: CanonicalOffer, symbol: &str, target: &str, standard: f64) -> CanonicalOffer {
        offer.facts.quantity.size = Quantity {
            unit: Some(Unit {
                symbol: symbol.to_string(),
                kind: UnitKind::Quantity,
                si: Some(SiConversion {
                    target: target.to_string(),
                    factor: 1.0,
                }),
            }),
            amount: AmountRange::exact(standard),
            standard: AmountRange::exact(standard),
        };
        offer
    }

    fn priced(mut offer: CanonicalOffer, price: f64) -> CanonicalOffer {
        offer.pricing.price = Some(price);
        offer
    }

    #[test]
    fn terms_split_and_lowercase() {
        let terms = terms("Tine Lettmelk 1,0% - 1 L");
        assert_eq!(terms, vec!["tine", "lettmelk", "1", "0", "1", "l"]);
    }

    #[test]
    fn decomposed_letters_match_composed() {
        let composed = terms("Sm\u{f8}r Bl\u{e5}b\u{e6}r");
        let decomposed = terms("Sm\u{f8}r Bla\u{30a}b\u{e6}r");
        assert_eq!(composed, vec!["sm\u{f8}r", "bl\u{e5}b\u{e6}r"]);
        assert_eq!(decomposed, composed);

        let offers = vec![
            offer("meny", "1", "Bl\u{e5}b\u{e6}rsyltet\u{f8}y"),
            offer("oda", "2", "Bla\u{30a}b\u{e6}rsyltet\u{f8}y"),
        ];
        let index = SimilarityIndex::build(&offers);
        assert!((index.score(0, 1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn identical_text_scores_one() {
        let offers = vec![
            offer("meny", "1", "Tine Lettmelk"),
            offer("oda", "2", "Tine Lettmelk"),
            offer("joker", "3", "Gilde Bacon"),
        ];
        let index = SimilarityIndex::build(&offers);
        assert!((index.score(0, 1) - 1.0).abs() < 1e-9);
        assert!(index.score(0, 2).abs() < 1e-9);
        assert!(index.score(0, 99).abs() < f64::EPSILON);
    }

    #[test]
    fn rare_terms_weigh_more() {
        let offers = vec![
            offer("meny", "1", "Tine melk"),
            offer("oda", "2", "Q melk"),
            offer("joker", "3", "Tine yoghurt"),
            offer("spar", "4", "Q yoghurt melk"),
        ];
        let index = SimilarityIndex::build(&offers);
        assert!(index.score(0, 1) > 0.0);
        assert!(index.score(0, 1) < 1.0);
    }

    #[test]
    fn best_matches_accepts_cross_dealer_pair() {
        let offers = vec![
            priced(sized(offer("meny", "1", "Tine Lettmelk 1 l"), "l", "l", 1.0), 21.9),
            priced(sized(offer("oda", "2", "Tine Lettmelk 1 l"), "l", "l", 1.0), 23.5),
            offer("joker", "3", "Gilde Kokt Skinke"),
        ];
        let index = SimilarityIndex::build(&offers);
        let matches = index.best_matches(&SimilarityConfig::default());
        let pairs: Vec<(&str, &str)> = matches
            .iter()
            .map(|m| (m.uri.as_str(), m.candidate.as_str()))
            .collect();
        assert_eq!(pairs, vec![("meny:1", "oda:2"), ("oda:2", "meny:1")]);
    }

    #[test]
    fn same_dealer_is_rejected() {
        let a = offer("meny", "1", "Tine Lettmelk");
        let b = offer("meny", "2", "Tine Lettmelk");
        assert_eq!(
            accept(&a, &b, &SimilarityConfig::default()),
            Err(Rejection::SameDealer)
        );
    }

    #[test]
    fn different_size_is_rejected() {
        let a = sized(offer("meny", "1", "Cola"), "l", "l", 1.5);
        let b = sized(offer("oda", "2", "Cola"), "l", "l", 0.5);
        assert_eq!(
            accept(&a, &b, &SimilarityConfig::default()),
            Err(Rejection::SizeMismatch)
        );
    }

    #[test]
    fn same_amount_in_other_base_is_rejected() {
        let a = sized(offer("meny", "1", "Saft"), "l", "l", 1.0);
        let b = sized(offer("oda", "2", "Saft"), "kg", "kg", 1.0);
        assert_eq!(
            accept(&a, &b, &SimilarityConfig::default()),
            Err(Rejection::SizeMismatch)
        );
    }

    #[test]
    fn distant_price_is_rejected() {
        let a = priced(sized(offer("meny", "1", "Kaffe"), "kg", "kg", 0.5), 100.0);
        let b = priced(sized(offer("oda", "2", "Kaffe"), "kg", "kg", 0.5), 30.0);
        assert_eq!(
            accept(&a, &b, &SimilarityConfig::default()),
            Err(Rejection::PriceMismatch)
        );
    }

    #[test]
    fn missing_price_is_accepted() {
        let a = priced(sized(offer("meny", "1", "Kaffe"), "kg", "kg", 0.5), 100.0);
        let b = sized(offer("oda", "2", "Kaffe"), "kg", "kg", 0.5);
        assert_eq!(accept(&a, &b, &SimilarityConfig::default()), Ok(()));
    }

    #[test]
    fn unsized_offers_are_rejected() {
        let a = offer("meny", "1", "Kaffe");
        let b = offer("oda", "2", "Kaffe");
        assert_eq!(
            accept(&a, &b, &SimilarityConfig::default()),
            Err(Rejection::SizeMismatch)
        );
    }

    #[test]
    fn below_floor_is_not_matched() {
        let offers = vec![
            offer("meny", "1", "Tine Lettmelk"),
            offer("oda", "2", "Tine Sjokolademelk Stor Kartong"),
        ];
        let index = SimilarityIndex::build(&offers);
        assert!(index.score(0, 1) < 0.7);
        assert!(index.best_matches(&SimilarityConfig::default()).is_empty());
    }

    #[test]
    fn empty_index_has_no_matches() {
        let index = SimilarityIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.best_matches(&SimilarityConfig::default()).is_empty());
    }
}
