//! Decides what a number means from the text around it.

use offerdb_core::{Unit, UnitKind};

use crate::tokenize::NumberContext;
use crate::units::UnitTable;

/// Interpretation of one number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading<'t> {
    /// The number is an amount of this unit.
    Unit(&'t Unit),
    /// The number multiplies the next number (`"4x"` in `"4x130g"`).
    MultiplyNext,
    /// The number multiplies the previous number (`"x8"` in `"1,5lx8"`).
    MultiplyPrevious,
    /// Not a quantity (prices, years, model numbers).
    Noise,
}

/// Unit kinds tried against the suffix, in priority order.
const SUFFIX_ORDER: [UnitKind; 4] = [
    UnitKind::Piece,
    UnitKind::Quantity,
    UnitKind::QuantityValue,
    UnitKind::PieceValue,
];

#[derive(Debug, Clone, Copy)]
pub struct Classifier<'t> {
    table: &'t UnitTable,
}

impl<'t> Classifier<'t> {
    #[must_use]
    pub fn new(table: &'t UnitTable) -> Self {
        Self { table }
    }

    #[must_use]
    pub fn table(&self) -> &'t UnitTable {
        self.table
    }

    /// Classifies a number by its prefix first, then its suffix.
    ///
    /// A prefix ending in the multiplier (`" x "`, or glued to a size unit as
    /// in `"lx"`) makes the number a backward multiplier. Otherwise the
    /// suffix decides.
    #[must_use]
    pub fn classify(&self, ctx: &NumberContext<'_>) -> Reading<'t> {
        if self.prefix_is_multiplier(ctx.prefix) {
            return Reading::MultiplyPrevious;
        }
        self.classify_suffix(ctx.suffix)
    }

    /// Classifies a number by the text that follows it, ignoring the prefix.
    #[must_use]
    pub fn classify_suffix(&self, suffix: &str) -> Reading<'t> {
        let token = suffix.split_whitespace().next().unwrap_or("");
        let raw = unit_letters(token);
        let multiplier = self.table.multiplier();
        if token == multiplier || raw == multiplier {
            return Reading::MultiplyNext;
        }
        if raw.is_empty() {
            return Reading::Noise;
        }

        let candidate = raw.to_lowercase();
        SUFFIX_ORDER
            .iter()
            .find_map(|kind| self.table.match_prefix(*kind, &candidate))
            .map_or(Reading::Noise, Reading::Unit)
    }

    fn prefix_is_multiplier(&self, prefix: &str) -> bool {
        let token = prefix.split_whitespace().next_back().unwrap_or("");
        let multiplier = self.table.multiplier();
        if token == multiplier || unit_letters(token) == multiplier {
            return true;
        }
        // "1,5lx8": the multiplier is glued to the unit of the previous number.
        token
            .strip_suffix(multiplier)
            .map(unit_letters)
            .filter(|unit| !unit.is_empty())
            .is_some_and(|unit| {
                self.table
                    .lookup_exact(UnitKind::Quantity, &unit)
                    .is_some()
            })
    }
}

/// Keeps the characters a unit pattern can contain: letters and `/`.
/// Case is preserved so the multiplier check stays case-sensitive.
fn unit_letters(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphabetic() || *c == '/')
        .collect()
}
