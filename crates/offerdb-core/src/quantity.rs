//! Quantity, unit and unit-value types shared by extraction, persistence and
//! matching.

use serde::{Deserialize, Serialize};

/// What a unit symbol denotes when it trails (or precedes) a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Package size: weight, volume or length (`"500 g"`).
    Quantity,
    /// Discrete count (`"12 stk"`).
    Piece,
    /// Price per size unit (`"kr 29,90/kg"`).
    QuantityValue,
    /// Price per piece (`"kr 5/stk"`).
    PieceValue,
    /// Pack multiplier (`"4x"` in `"4x130g"`).
    Multiplier,
}

impl UnitKind {
    /// `true` for the price-per-unit kinds.
    #[must_use]
    pub fn is_value(self) -> bool {
        matches!(self, UnitKind::QuantityValue | UnitKind::PieceValue)
    }

    /// Maps a size/piece kind to the matching price-per-unit kind.
    #[must_use]
    pub fn as_value(self) -> Option<UnitKind> {
        match self {
            UnitKind::Quantity | UnitKind::QuantityValue => Some(UnitKind::QuantityValue),
            UnitKind::Piece | UnitKind::PieceValue => Some(UnitKind::PieceValue),
            UnitKind::Multiplier => None,
        }
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitKind::Quantity => write!(f, "quantity"),
            UnitKind::Piece => write!(f, "piece"),
            UnitKind::QuantityValue => write!(f, "quantity_value"),
            UnitKind::PieceValue => write!(f, "piece_value"),
            UnitKind::Multiplier => write!(f, "multiplier"),
        }
    }
}

/// Conversion of a unit into its SI base (`kg`, `l` or `m`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiConversion {
    /// Base symbol, e.g. `"kg"`.
    pub target: String,
    /// Multiplier from this unit into `target`, e.g. `0.001` for grams.
    pub factor: f64,
}

/// A known unit. Immutable once the unit table is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Canonical symbol, e.g. `"g"`, `"stk"`, `"kg"` (for `"kr/kg"`).
    pub symbol: String,
    pub kind: UnitKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub si: Option<SiConversion>,
}

/// A possibly ranged amount. Every extraction path today sets `min == max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AmountRange {
    /// A degenerate range holding a single amount.
    #[must_use]
    pub fn exact(amount: f64) -> Self {
        Self {
            min: Some(amount),
            max: Some(amount),
        }
    }

    /// `true` when neither bound is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Applies `f` to each present bound.
    #[must_use]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            min: self.min.map(&f),
            max: self.max.map(&f),
        }
    }
}

/// One axis of a quantity or unit value: a unit, its raw amount and the
/// amount expressed in the unit's SI base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub unit: Option<Unit>,
    #[serde(default)]
    pub amount: AmountRange,
    /// Filled by standardization; empty when the unit has no SI mapping.
    #[serde(default)]
    pub standard: AmountRange,
}

impl Quantity {
    /// A quantity of exactly `amount` in `unit`, not yet standardized.
    #[must_use]
    pub fn new(unit: Unit, amount: f64) -> Self {
        Self {
            unit: Some(unit),
            amount: AmountRange::exact(amount),
            standard: AmountRange::default(),
        }
    }

    /// `true` when no unit was found. Amount is always empty in that case.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unit.is_none()
    }

    /// Symbol of the unit, if any.
    #[must_use]
    pub fn symbol(&self) -> Option<&str> {
        self.unit.as_ref().map(|u| u.symbol.as_str())
    }
}

/// Both axes of an offer's quantity (or of its unit value).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferQuantityField {
    #[serde(default)]
    pub size: Quantity,
    #[serde(default)]
    pub pieces: Quantity,
}

impl OfferQuantityField {
    /// `true` when neither axis carries a unit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size.is_empty() && self.pieces.is_empty()
    }

    /// Whether this field carries a comparable size. An empty unit object is
    /// not informative; only a standardized maximum counts.
    #[must_use]
    pub fn has_standard_size(&self) -> bool {
        self.size.standard.max.is_some()
    }
}

/// Result of mining one or more strings for quantities and unit values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub quantity: OfferQuantityField,
    pub value: OfferQuantityField,
    /// Number of items sold together. Always `{1, 1}`: multi-item offers
    /// ("3 for 2") are not detected.
    pub items: AmountRange,
}

impl Default for Extraction {
    fn default() -> Self {
        Self {
            quantity: OfferQuantityField::default(),
            value: OfferQuantityField::default(),
            items: AmountRange::exact(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grams() -> Unit {
        Unit {
            symbol: "g".to_string(),
            kind: UnitKind::Quantity,
            si: Some(SiConversion {
                target: "kg".to_string(),
                factor: 0.001,
            }),
        }
    }

    #[test]
    fn amount_range_exact_sets_both_bounds() {
        let range = AmountRange::exact(2.5);
        assert_eq!(range.min, Some(2.5));
        assert_eq!(range.max, Some(2.5));
        assert!(!range.is_empty());
    }

    #[test]
    fn amount_range_map_skips_missing_bounds() {
        let range = AmountRange {
            min: None,
            max: Some(4.0),
        }
        .map(|v| v * 2.0);
        assert_eq!(range.min, None);
        assert_eq!(range.max, Some(8.0));
    }

    #[test]
    fn default_quantity_is_empty() {
        let quantity = Quantity::default();
        assert!(quantity.is_empty());
        assert!(quantity.amount.is_empty());
        assert!(quantity.symbol().is_none());
    }

    #[test]
    fn quantity_new_is_not_standardized() {
        let quantity = Quantity::new(grams(), 500.0);
        assert_eq!(quantity.symbol(), Some("g"));
        assert!(quantity.standard.is_empty());
    }

    #[test]
    fn has_standard_size_requires_standard_max() {
        let mut field = OfferQuantityField {
            size: Quantity::new(grams(), 500.0),
            pieces: Quantity::default(),
        };
        assert!(!field.has_standard_size());
        field.size.standard = AmountRange::exact(0.5);
        assert!(field.has_standard_size());
    }

    #[test]
    fn default_extraction_has_single_item() {
        let extraction = Extraction::default();
        assert_eq!(extraction.items, AmountRange::exact(1.0));
        assert!(extraction.quantity.is_empty());
        assert!(extraction.value.is_empty());
    }

    #[test]
    fn unit_kind_value_mapping() {
        assert_eq!(UnitKind::Quantity.as_value(), Some(UnitKind::QuantityValue));
        assert_eq!(UnitKind::Piece.as_value(), Some(UnitKind::PieceValue));
        assert_eq!(UnitKind::Multiplier.as_value(), None);
        assert!(UnitKind::PieceValue.is_value());
        assert!(!UnitKind::Piece.is_value());
    }

    #[test]
    fn unit_kind_serializes_snake_case() {
        let json = serde_json::to_string(&UnitKind::QuantityValue).unwrap();
        assert_eq!(json, "\"quantity_value\"");
    }
}
