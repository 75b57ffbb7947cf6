//! `match` and `similar`: identity relations and text-similarity candidates
//! over canonical offers.

use std::path::Path;

use anyhow::Context;
use offerdb_core::{AppConfig, CanonicalOffer, TimeContext};
use offerdb_matcher::{
    BatchReport, IdentityMatcher, SimilarityConfig, SimilarityIndex, SimilarityMatch,
};
use offerdb_store::{MemoryRelationStore, RelationStore};

use crate::jsonl;

pub(crate) fn similarity_config(config: &AppConfig) -> SimilarityConfig {
    SimilarityConfig {
        floor: config.similarity_floor,
        price_ratio_cutoff: config.price_ratio_cutoff,
    }
}

/// Matches `offers` by identity and, when `link_similar` is set, links each
/// accepted similarity candidate. Link failures are logged and skipped.
pub(crate) fn match_offers<S: RelationStore>(
    matcher: &mut IdentityMatcher<S>,
    offers: &[CanonicalOffer],
    similarity: Option<&SimilarityConfig>,
    ctx: &TimeContext,
) -> (BatchReport, usize) {
    let report = matcher.match_batch(offers, ctx);
    let Some(similarity) = similarity else {
        return (report, 0);
    };

    let mut linked = 0;
    for candidate in SimilarityIndex::build(offers).best_matches(similarity) {
        match matcher.link(&candidate.uri, &candidate.candidate, ctx) {
            Ok(_) => linked += 1,
            Err(e) => {
                tracing::warn!(
                    uri = %candidate.uri,
                    candidate = %candidate.candidate,
                    error = %e,
                    "failed to link similar offers"
                );
            }
        }
    }
    (report, linked)
}

/// Run the `match` command.
///
/// # Errors
///
/// Returns an error if the input or relation snapshot cannot be read or
/// parsed, or the output cannot be written. Per-offer failures are logged
/// and reported, not propagated.
pub(crate) async fn run_match(
    config: &AppConfig,
    input: &Path,
    relations: Option<&Path>,
    output: &Path,
    link_similar: bool,
) -> anyhow::Result<()> {
    let offers: Vec<CanonicalOffer> = jsonl::parse_lenient(&jsonl::read(input).await?, input);

    let store = match relations {
        Some(path) => {
            let snapshot = jsonl::read(path).await?;
            MemoryRelationStore::from_snapshot(&snapshot)
                .with_context(|| format!("failed to restore relations from {}", path.display()))?
        }
        None => MemoryRelationStore::new(),
    };
    let mut matcher = IdentityMatcher::new(store)?;

    let ctx = TimeContext::wall_clock();
    let similarity = link_similar.then(|| similarity_config(config));
    let (report, linked) = match_offers(&mut matcher, &offers, similarity.as_ref(), &ctx);

    let store = matcher.into_store();
    jsonl::write(output, &store.snapshot()?).await?;

    for (uri, error) in &report.failed {
        eprintln!("failed: {uri}: {error}");
    }
    println!(
        "matched {} offers: {} created, {} joined, {} merged, {} failed, {linked} linked by similarity -> {}",
        offers.len(),
        report.created,
        report.joined,
        report.merged,
        report.failed.len(),
        output.display()
    );
    Ok(())
}

/// Run the `similar` command: prints one [`SimilarityMatch`] per line.
///
/// # Errors
///
/// Returns an error if the input cannot be read.
pub(crate) async fn run_similar(config: &AppConfig, input: &Path) -> anyhow::Result<()> {
    let offers: Vec<CanonicalOffer> = jsonl::parse_lenient(&jsonl::read(input).await?, input);
    let matches: Vec<SimilarityMatch> =
        SimilarityIndex::build(&offers).best_matches(&similarity_config(config));
    tracing::info!(offers = offers.len(), matches = matches.len(), "similarity run complete");
    print!("{}", jsonl::render(&matches)?);
    Ok(())
}
