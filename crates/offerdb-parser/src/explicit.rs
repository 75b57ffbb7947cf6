//! Structured quantity fields that some dealers publish next to free text.
//!
//! Per axis, an explicit amount/unit pair beats a `quantity_string`, which
//! beats whatever free-text extraction found.

use offerdb_core::{Extraction, OfferQuantityField, Quantity, Unit, UnitKind};

use crate::extract::Extractor;
use crate::field_map::RawOffer;
use crate::standardize::standardize_field;

pub const QUANTITY_VALUE: &str = "quantity_value";
pub const QUANTITY_UNIT: &str = "quantity_unit";
pub const QUANTITY_STRING: &str = "quantity_string";
pub const UNIT_PRICE_VALUE: &str = "unit_price_value";
pub const UNIT_PRICE_UNIT: &str = "unit_price_unit";

/// Quantities read from explicit fields, one slot per axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplicitQuantities {
    pub quantity: OfferQuantityField,
    pub value: OfferQuantityField,
}

impl ExplicitQuantities {
    /// Reads every explicit quantity field of `raw`.
    #[must_use]
    pub fn read(raw: &RawOffer, extractor: &Extractor<'_>) -> Self {
        let mut explicit = Self::default();

        if let Some(text) = raw.text(QUANTITY_STRING) {
            let parsed = extractor.extract(&[text]);
            explicit.quantity = parsed.quantity;
        }

        if let (Some(amount), Some(symbol)) =
            (amount_field(raw, QUANTITY_VALUE), raw.get_str(QUANTITY_UNIT))
        {
            match quantity_unit(extractor, symbol) {
                Some(unit) => {
                    let slot = axis_mut(&mut explicit.quantity, unit.kind);
                    *slot = Quantity::new(unit, amount);
                }
                None => tracing::debug!(unit = %symbol, "unknown explicit quantity unit"),
            }
        }

        if let (Some(amount), Some(symbol)) =
            (amount_field(raw, UNIT_PRICE_VALUE), raw.get_str(UNIT_PRICE_UNIT))
        {
            match value_unit(extractor, symbol) {
                Some(unit) => {
                    let slot = axis_mut(&mut explicit.value, unit.kind);
                    *slot = Quantity::new(unit, amount);
                }
                None => tracing::debug!(unit = %symbol, "unknown explicit unit price unit"),
            }
        }

        explicit
    }

    /// Overwrites every axis of `extraction` that this set fills, then
    /// re-standardizes the overwritten fields.
    pub fn apply(self, extraction: &mut Extraction) {
        overlay(&mut extraction.quantity, self.quantity);
        overlay(&mut extraction.value, self.value);
        extraction.quantity = standardize_field(&extraction.quantity);
        extraction.value = standardize_field(&extraction.value);
    }
}

/// Finite, non-negative amount of `key`. Anything else is skipped so it
/// cannot displace a free-text reading.
fn amount_field(raw: &RawOffer, key: &str) -> Option<f64> {
    let amount = raw.get_f64(key)?;
    if amount.is_finite() && amount >= 0.0 {
        Some(amount)
    } else {
        tracing::debug!(field = key, amount, "ignoring explicit amount");
        None
    }
}

fn overlay(target: &mut OfferQuantityField, source: OfferQuantityField) {
    if !source.size.is_empty() {
        target.size = source.size;
    }
    if !source.pieces.is_empty() {
        target.pieces = source.pieces;
    }
}

fn axis_mut(field: &mut OfferQuantityField, kind: UnitKind) -> &mut Quantity {
    match kind {
        UnitKind::Piece | UnitKind::PieceValue => &mut field.pieces,
        _ => &mut field.size,
    }
}

fn quantity_unit(extractor: &Extractor<'_>, symbol: &str) -> Option<Unit> {
    let table = extractor.table();
    table
        .lookup_exact(UnitKind::Quantity, symbol)
        .or_else(|| table.lookup_exact(UnitKind::Piece, symbol))
        .cloned()
}

/// Accepts both value patterns (`"kr/kg"`) and bare unit symbols (`"kg"`).
fn value_unit(extractor: &Extractor<'_>, symbol: &str) -> Option<Unit> {
    let table = extractor.table();
    if let Some(unit) = table
        .lookup_exact(UnitKind::QuantityValue, symbol)
        .or_else(|| table.lookup_exact(UnitKind::PieceValue, symbol))
    {
        return Some(unit.clone());
    }
    let base = quantity_unit(extractor, symbol)?;
    Some(Unit {
        kind: base.kind.as_value()?,
        ..base
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::units::UnitTable;

    fn raw(value: serde_json::Value) -> RawOffer {
        serde_json::from_value(value).unwrap()
    }

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn explicit_pair_beats_free_text() {
        let extractor = Extractor::new(UnitTable::builtin());
        let mut extraction = extractor.extract(&["Kaffe 250 g"]);
        let offer = raw(json!({ "quantity_value": "0,5", "quantity_unit": "kg" }));
        ExplicitQuantities::read(&offer, &extractor).apply(&mut extraction);
        assert_eq!(extraction.quantity.size.symbol(), Some("kg"));
        assert!(approx(extraction.quantity.size.standard.max, 0.5));
    }

    #[test]
    fn explicit_pair_beats_quantity_string() {
        let extractor = Extractor::new(UnitTable::builtin());
        let offer = raw(json!({
            "quantity_string": "6x0,33l",
            "quantity_value": 1.98,
            "quantity_unit": "liter"
        }));
        let explicit = ExplicitQuantities::read(&offer, &extractor);
        assert_eq!(explicit.quantity.size.symbol(), Some("l"));
        assert!(approx(explicit.quantity.size.amount.max, 1.98));
    }

    #[test]
    fn quantity_string_fills_only_its_axes() {
        let extractor = Extractor::new(UnitTable::builtin());
        let mut extraction = extractor.extract(&["Egg 12 stk 600 g"]);
        let offer = raw(json!({ "quantity_string": "0,7 kg" }));
        ExplicitQuantities::read(&offer, &extractor).apply(&mut extraction);
        assert!(approx(extraction.quantity.size.standard.max, 0.7));
        assert_eq!(extraction.quantity.pieces.symbol(), Some("stk"));
    }

    #[test]
    fn piece_unit_goes_to_pieces_axis() {
        let extractor = Extractor::new(UnitTable::builtin());
        let offer = raw(json!({ "quantity_value": 10, "quantity_unit": "stk" }));
        let explicit = ExplicitQuantities::read(&offer, &extractor);
        assert!(explicit.quantity.size.is_empty());
        assert_eq!(explicit.quantity.pieces.symbol(), Some("stk"));
    }

    #[test]
    fn unit_price_accepts_bare_symbol() {
        let extractor = Extractor::new(UnitTable::builtin());
        let offer = raw(json!({ "unit_price_value": 59.8, "unit_price_unit": "kg" }));
        let explicit = ExplicitQuantities::read(&offer, &extractor);
        let unit = explicit.value.size.unit.as_ref().unwrap();
        assert_eq!(unit.symbol, "kg");
        assert_eq!(unit.kind, UnitKind::QuantityValue);
    }

    #[test]
    fn unit_price_accepts_value_pattern() {
        let extractor = Extractor::new(UnitTable::builtin());
        let offer = raw(json!({ "unit_price_value": "4,50", "unit_price_unit": "kr/stk" }));
        let explicit = ExplicitQuantities::read(&offer, &extractor);
        assert_eq!(explicit.value.pieces.symbol(), Some("stk"));
        assert!(approx(explicit.value.pieces.amount.max, 4.5));
    }

    #[test]
    fn non_finite_or_negative_amount_keeps_free_text() {
        let extractor = Extractor::new(UnitTable::builtin());
        for amount in [json!("NaN"), json!("inf"), json!(-500), json!("-0,5")] {
            let mut extraction = extractor.extract(&["Kaffe 250 g"]);
            let offer = raw(json!({
                "quantity_value": amount.clone(),
                "quantity_unit": "g",
                "unit_price_value": amount.clone(),
                "unit_price_unit": "kr/kg"
            }));
            let explicit = ExplicitQuantities::read(&offer, &extractor);
            assert_eq!(explicit, ExplicitQuantities::default(), "amount {amount}");

            explicit.apply(&mut extraction);
            assert!(approx(extraction.quantity.size.amount.max, 250.0), "amount {amount}");
            assert!(approx(extraction.quantity.size.standard.max, 0.25), "amount {amount}");
        }
    }

    #[test]
    fn zero_amount_is_accepted() {
        let extractor = Extractor::new(UnitTable::builtin());
        let offer = raw(json!({ "quantity_value": 0, "quantity_unit": "g" }));
        let explicit = ExplicitQuantities::read(&offer, &extractor);
        assert!(approx(explicit.quantity.size.amount.max, 0.0));
    }

    #[test]
    fn unknown_unit_is_ignored() {
        let extractor = Extractor::new(UnitTable::builtin());
        let offer = raw(json!({ "quantity_value": 3, "quantity_unit": "bunter" }));
        let explicit = ExplicitQuantities::read(&offer, &extractor);
        assert_eq!(explicit, ExplicitQuantities::default());
    }
}
