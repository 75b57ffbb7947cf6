//! Conversion of extracted amounts into SI base units.
//!
//! Sizes multiply by the unit's factor (`500 g` → `0.5 kg`). Unit prices
//! divide by it (`20 kr/hg` → `200 kr/kg`). Units without an SI mapping
//! (pieces) get an empty standard range.

use offerdb_core::{AmountRange, Extraction, OfferQuantityField, Quantity};

/// Decimal places kept after conversion. Strips float noise such as
/// `0.30000000000000004` while staying far below any real package size.
const ROUNDING_SCALE: f64 = 1e9;

fn round(value: f64) -> f64 {
    (value * ROUNDING_SCALE).round() / ROUNDING_SCALE
}

/// Returns `quantity` with its `standard` range recomputed from `amount`.
///
/// Only `amount` is read, so applying this twice gives the same result.
#[must_use]
pub fn standardize(quantity: &Quantity) -> Quantity {
    let standard = match &quantity.unit {
        Some(unit) => match &unit.si {
            Some(si) if unit.kind.is_value() => quantity.amount.map(|v| round(v / si.factor)),
            Some(si) => quantity.amount.map(|v| round(v * si.factor)),
            None => AmountRange::default(),
        },
        None => AmountRange::default(),
    };
    Quantity {
        unit: quantity.unit.clone(),
        amount: quantity.amount,
        standard,
    }
}

#[must_use]
pub fn standardize_field(field: &OfferQuantityField) -> OfferQuantityField {
    OfferQuantityField {
        size: standardize(&field.size),
        pieces: standardize(&field.pieces),
    }
}

/// Standardizes every axis of an extraction in place.
pub fn standardize_extraction(extraction: &mut Extraction) {
    extraction.quantity = standardize_field(&extraction.quantity);
    extraction.value = standardize_field(&extraction.value);
}
