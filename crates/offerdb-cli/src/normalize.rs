//! `normalize`: raw dealer records in, canonical offers out.
//!
//! A record that fails to normalize is logged and skipped so one bad record
//! does not abort the run.

use std::borrow::Cow;
use std::path::Path;

use anyhow::Context;
use chrono::Duration;
use offerdb_core::{AppConfig, CanonicalOffer, DealerConfig, TimeContext};
use offerdb_parser::{normalize_offer, CategoryTable, RawOffer, UnitTable};
use offerdb_store::{MemoryOfferStore, OfferStore};

use crate::jsonl;

/// Offers that normalized cleanly plus the number of records skipped.
#[derive(Debug, Default)]
pub(crate) struct NormalizeOutcome {
    pub offers: Vec<CanonicalOffer>,
    pub skipped: usize,
}

/// The configured unit table, or the built-in one when no path is set.
pub(crate) fn load_units(config: &AppConfig) -> anyhow::Result<Cow<'static, UnitTable>> {
    match &config.units_path {
        Some(path) => {
            let table = UnitTable::load(path)
                .with_context(|| format!("failed to load unit table {}", path.display()))?;
            Ok(Cow::Owned(table))
        }
        None => Ok(Cow::Borrowed(UnitTable::builtin())),
    }
}

/// Normalizes every line of `content` for `dealer`.
pub(crate) fn normalize_records(
    content: &str,
    dealer: &DealerConfig,
    units: &UnitTable,
    categories: &CategoryTable,
    ctx: &TimeContext,
) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();
    for (line, parsed) in jsonl::parse::<RawOffer>(content) {
        let raw = match parsed {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(dealer = %dealer.key, line, error = %e, "skipping malformed record");
                outcome.skipped += 1;
                continue;
            }
        };
        match normalize_offer(raw, dealer, units, categories, ctx) {
            Ok(offer) => outcome.offers.push(offer),
            Err(e) => {
                tracing::warn!(dealer = %dealer.key, line, error = %e, "skipping record");
                outcome.skipped += 1;
            }
        }
    }
    outcome
}

/// Upserts `offers` into `store` and returns the stored versions, which keep
/// protected manual edits.
pub(crate) fn apply_to_store(
    store: &mut dyn OfferStore,
    offers: Vec<CanonicalOffer>,
    ctx: &TimeContext,
    retention: Duration,
) -> anyhow::Result<Vec<CanonicalOffer>> {
    let mut stored = Vec::with_capacity(offers.len());
    for offer in offers {
        let uri = offer.uri.clone();
        let outcome = store.upsert(offer, ctx, retention)?;
        tracing::debug!(%uri, ?outcome, "offer stored");
        let current = store
            .get(&uri)?
            .with_context(|| format!("offer {uri} vanished after upsert"))?;
        stored.push(current);
    }
    Ok(stored)
}

/// Run the `normalize` command.
///
/// # Errors
///
/// Returns an error if the dealer is unknown, a configuration table or the
/// input cannot be loaded, or the output cannot be written. Per-record
/// failures are logged and skipped, not propagated.
pub(crate) async fn run_normalize(
    config: &AppConfig,
    dealer_key: &str,
    input: &Path,
    output: &Path,
    store_path: Option<&Path>,
) -> anyhow::Result<()> {
    let dealers = offerdb_core::load_dealers(&config.dealers_path).with_context(|| {
        format!("failed to load dealers from {}", config.dealers_path.display())
    })?;
    let dealer = dealers.get(dealer_key).ok_or_else(|| {
        anyhow::anyhow!(
            "dealer '{dealer_key}' not found in {}",
            config.dealers_path.display()
        )
    })?;
    let units = load_units(config)?;
    let categories = CategoryTable::load(&config.categories_path).with_context(|| {
        format!(
            "failed to load categories from {}",
            config.categories_path.display()
        )
    })?;

    let content = jsonl::read(input).await?;
    let ctx = TimeContext::wall_clock();
    let NormalizeOutcome { offers, skipped } =
        normalize_records(&content, dealer, &units, &categories, &ctx);

    let offers = match store_path {
        Some(path) => {
            let mut store = if tokio::fs::try_exists(path).await.unwrap_or(false) {
                let snapshot = jsonl::read(path).await?;
                MemoryOfferStore::from_snapshot(&snapshot)
                    .with_context(|| format!("failed to restore offers from {}", path.display()))?
            } else {
                MemoryOfferStore::new()
            };
            let retention = Duration::days(config.protection_days);
            let stored = apply_to_store(&mut store, offers, &ctx, retention)?;
            jsonl::write(path, &store.snapshot()?).await?;
            stored
        }
        None => offers,
    };

    jsonl::write(output, &jsonl::render(&offers)?).await?;
    tracing::info!(
        dealer = %dealer.key,
        normalized = offers.len(),
        skipped,
        "normalize run complete"
    );
    println!(
        "normalized {} offers for {} ({skipped} skipped) -> {}",
        offers.len(),
        dealer.key,
        output.display()
    );
    Ok(())
}
