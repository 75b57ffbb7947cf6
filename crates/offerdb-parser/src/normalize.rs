//! Normalization from raw dealer records to [`offerdb_core::CanonicalOffer`].
//!
//! Quantity parsing is delegated to [`crate::extract`] and
//! [`crate::explicit`], categories to [`crate::category`]; this module
//! focuses on structural conversion of the raw record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use offerdb_core::{
    CanonicalOffer, DealerConfig, Nutrient, Overrides, Pricing, ProductFacts, SchemaVersions,
    TimeContext,
};
use serde_json::Value;

use crate::category::{breadcrumb_from_value, CategoryTable};
use crate::error::ParserError;
use crate::explicit::ExplicitQuantities;
use crate::extract::Extractor;
use crate::field_map::{apply_field_mapping, RawOffer};
use crate::units::UnitTable;

/// Raw identifier fields copied into [`CanonicalOffer::gtins`], keyed by the
/// field name. Validation happens at match time.
pub const GTIN_FIELDS: [&str; 4] = ["ean", "gtin13", "gtin", "nobb"];

/// Normalizes one raw record from `dealer` into a [`CanonicalOffer`].
///
/// # Errors
///
/// Returns [`ParserError::Normalization`] if the record has no `id` or
/// carries an unparseable timestamp;
/// [`ParserError::MissingNamespace`] if the dealer has no namespace; and
/// [`ParserError::Category`] if the category tree is broken.
pub fn normalize_offer(
    raw: RawOffer,
    dealer: &DealerConfig,
    units: &UnitTable,
    categories: &CategoryTable,
    ctx: &TimeContext,
) -> Result<CanonicalOffer, ParserError> {
    let raw = apply_field_mapping(raw, &dealer.field_mapping);

    let provenance_id = raw
        .identifier("id")
        .ok_or_else(|| ParserError::Normalization {
            provenance_id: "<unknown>".to_string(),
            reason: "record has no id".into(),
        })?;

    if dealer.namespace.trim().is_empty() {
        return Err(ParserError::MissingNamespace {
            dealer: dealer.key.clone(),
        });
    }
    let uri = format!("{}:{}", dealer.namespace, provenance_id);

    let title = raw.get_str("title").map(str::to_string).unwrap_or_else(|| {
        tracing::debug!(uri = %uri, "record has no title");
        String::new()
    });

    let gtins: BTreeMap<String, String> = GTIN_FIELDS
        .iter()
        .filter_map(|field| raw.identifier(field).map(|code| ((*field).to_string(), code)))
        .collect();

    let pricing = Pricing {
        price: price_field(&raw, "price"),
        pre_price: price_field(&raw, "pre_price"),
        currency: raw
            .get_str("currency")
            .unwrap_or(&dealer.currency)
            .to_string(),
    };

    let extractor = Extractor::new(units);
    let texts: Vec<Option<String>> = dealer
        .quantity_fields
        .iter()
        .map(|field| raw.text(field))
        .collect();
    let mut extraction = extractor.extract_fields(&texts);
    ExplicitQuantities::read(&raw, &extractor).apply(&mut extraction);

    let category_chain = match &dealer.category {
        Some(rule) => match raw.get(&rule.field) {
            Some(value) => categories.resolve(&breadcrumb_from_value(value), rule)?,
            None => Vec::new(),
        },
        None => Vec::new(),
    };

    let valid_from = timestamp_field(&raw, "valid_from", &provenance_id)?.unwrap_or(ctx.now);
    let valid_through = timestamp_field(&raw, "valid_through", &provenance_id)?;

    let nutrition = match raw.get("nutrition") {
        Some(value) => serde_json::from_value::<Vec<Nutrient>>(value.clone()).unwrap_or_else(|e| {
            tracing::debug!(uri = %uri, error = %e, "ignoring malformed nutrition block");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let facts = ProductFacts {
        quantity: extraction.quantity,
        categories: category_chain,
        nutrition,
        ingredients: raw.get("ingredients").map(string_list).unwrap_or_default(),
        properties: raw.get("properties").map(string_list).unwrap_or_default(),
        versions: SchemaVersions::current(),
        overrides: Overrides::default(),
    };

    tracing::debug!(
        uri = %uri,
        dealer = %dealer.key,
        size = ?facts.quantity.size.symbol(),
        categories = facts.categories.len(),
        "normalized offer"
    );

    Ok(CanonicalOffer {
        uri,
        dealer: dealer.key.clone(),
        provenance: raw
            .get_str("provenance")
            .unwrap_or(&dealer.key)
            .to_string(),
        provenance_id,
        market: raw.get_str("market").unwrap_or(&dealer.market).to_string(),
        title,
        subtitle: raw.get_str("subtitle").map(str::to_string),
        description: raw.get_str("description").map(str::to_string),
        brand: raw.get_str("brand").map(str::to_string),
        gtins,
        pricing,
        value: extraction.value,
        items: extraction.items,
        valid_from,
        valid_through,
        scraped_at: ctx.now,
        facts,
    })
}

/// Non-negative finite price, or `None`.
fn price_field(raw: &RawOffer, key: &str) -> Option<f64> {
    raw.get_f64(key).filter(|p| p.is_finite() && *p >= 0.0)
}

fn timestamp_field(
    raw: &RawOffer,
    key: &str,
    provenance_id: &str,
) -> Result<Option<DateTime<Utc>>, ParserError> {
    let Some(text) = raw.get_str(key) else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(text)
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|e| ParserError::Normalization {
            provenance_id: provenance_id.to_string(),
            reason: format!("invalid {key} timestamp '{text}': {e}"),
        })
}

/// A list of strings, or a single comma-separated string.
fn string_list(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
