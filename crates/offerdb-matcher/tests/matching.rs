//! GTIN matching followed by similarity linking, as the CLI runs them.

use chrono::{TimeZone, Utc};
use offerdb_core::{AmountRange, CanonicalOffer, Quantity, SiConversion, TimeContext, Unit, UnitKind};
use offerdb_matcher::{IdentityMatcher, SimilarityConfig, SimilarityIndex};
use offerdb_store::{MemoryRelationStore, RelationStore};

fn ctx() -> TimeContext {
    TimeContext::at(Utc.with_ymd_and_hms(2025, 5, 2, 7, 30, 0).unwrap())
}

fn litre(mut offer: CanonicalOffer) -> CanonicalOffer {
    offer.facts.quantity.size = Quantity {
        unit: Some(Unit {
            symbol: "l".to_string(),
            kind: UnitKind::Quantity,
            si: Some(SiConversion {
                target: "l".to_string(),
                factor: 1.0,
            }),
        }),
        amount: AmountRange::exact(1.0),
        standard: AmountRange::exact(1.0),
    };
    offer
}

fn offer(dealer: &str, id: &str, title: &str, ean: Option<&str>, price: f64) -> CanonicalOffer {
    let mut offer = litre(CanonicalOffer::new(dealer, dealer, id, title, ctx().now));
    if let Some(ean) = ean {
        offer.gtins.insert("ean".to_string(), ean.to_string());
    }
    offer.pricing.price = Some(price);
    offer
}

#[test]
fn gtin_matching_then_similarity_linking() {
    let offers = vec![
        offer("meny", "100", "Tine Lettmelk 0,5% 1 l", Some("7038010009457"), 22.4),
        offer("oda", "200", "Tine Lettmelk 0,5 % 1 l", Some("7038010009457"), 21.9),
        offer("joker", "300", "Tine Lettmelk 0,5% 1 l", None, 24.9),
        offer("spar", "400", "Q Kefir 1 l", None, 31.0),
    ];

    let mut matcher = IdentityMatcher::new(MemoryRelationStore::new()).unwrap();
    let report = matcher.match_batch(&offers, &ctx());
    assert_eq!(report.created, 3);
    assert_eq!(report.joined, 1);

    // The joker offer has no GTIN; only text similarity can place it.
    assert!(matcher.find_matches(&offers[2]).unwrap().is_empty());

    let index = SimilarityIndex::build(&offers);
    for candidate in index.best_matches(&SimilarityConfig::default()) {
        matcher
            .link(&candidate.uri, &candidate.candidate, &ctx())
            .unwrap();
    }

    let matches = matcher.find_matches(&offers[2]).unwrap();
    assert_eq!(matches, vec!["meny:100", "oda:200"]);
    assert!(matcher.find_matches(&offers[3]).unwrap().is_empty());

    let live: Vec<_> = matcher
        .store()
        .all()
        .unwrap()
        .into_iter()
        .filter(|relation| !relation.is_merged)
        .collect();
    assert_eq!(live.len(), 2);
}
