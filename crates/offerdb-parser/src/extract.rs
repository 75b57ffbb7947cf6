//! Quantity and unit-price extraction from free text.
//!
//! Each input string is tokenized into numbers, each number is classified by
//! its surroundings, and multipliers are folded into the amount they apply
//! to. The first size, piece count, price-per-size and price-per-piece found
//! across the inputs (in order) win, so callers pass the most authoritative
//! text first.

use offerdb_core::{Extraction, Quantity, Unit, UnitKind};

use crate::classify::{Classifier, Reading};
use crate::standardize::standardize_extraction;
use crate::tokenize::tokenize;
use crate::units::UnitTable;

/// Extracts quantities using the built-in unit table.
#[must_use]
pub fn extract<S: AsRef<str>>(inputs: &[S]) -> Extraction {
    Extractor::new(UnitTable::builtin()).extract(inputs)
}

/// Like [`extract`] but skips missing fields.
#[must_use]
pub fn extract_fields(inputs: &[Option<String>]) -> Extraction {
    Extractor::new(UnitTable::builtin()).extract_fields(inputs)
}

#[derive(Debug, Clone, Copy)]
pub struct Extractor<'t> {
    classifier: Classifier<'t>,
}

impl<'t> Extractor<'t> {
    #[must_use]
    pub fn new(table: &'t UnitTable) -> Self {
        Self {
            classifier: Classifier::new(table),
        }
    }

    #[must_use]
    pub fn table(&self) -> &'t UnitTable {
        self.classifier.table()
    }

    /// Mines `inputs` in order and returns a standardized extraction.
    /// Text without recognizable quantities yields empty axes, never an error.
    #[must_use]
    pub fn extract<S: AsRef<str>>(&self, inputs: &[S]) -> Extraction {
        let mut extraction = Extraction::default();

        for input in inputs {
            for (unit, amount) in self.fold(input.as_ref()) {
                let slot = match unit.kind {
                    UnitKind::Quantity => &mut extraction.quantity.size,
                    UnitKind::Piece => &mut extraction.quantity.pieces,
                    UnitKind::QuantityValue => &mut extraction.value.size,
                    UnitKind::PieceValue => &mut extraction.value.pieces,
                    UnitKind::Multiplier => continue,
                };
                if slot.is_empty() {
                    *slot = Quantity::new(unit.clone(), amount);
                }
            }
        }

        standardize_extraction(&mut extraction);

        tracing::trace!(
            size = ?extraction.quantity.size.symbol(),
            pieces = ?extraction.quantity.pieces.symbol(),
            value = ?extraction.value.size.symbol(),
            "quantity extraction finished"
        );

        extraction
    }

    #[must_use]
    pub fn extract_fields(&self, inputs: &[Option<String>]) -> Extraction {
        let present: Vec<&str> = inputs.iter().filter_map(Option::as_deref).collect();
        self.extract(&present)
    }

    /// Classifies every number in `text` and resolves multipliers, returning
    /// the unit-bearing amounts in order of appearance.
    ///
    /// Forward multipliers (`"4x"`) accumulate until the next number that is
    /// not itself a multiplier. A backward multiplier (`"x8"`) scales the
    /// previous size amount; when there is none, or a forward multiplier is
    /// still pending (`"4x130g"`), the number is re-read from its suffix.
    /// Trailing forward multipliers and orphaned backward ones are dropped.
    fn fold(&self, text: &str) -> Vec<(&'t Unit, f64)> {
        let mut folded: Vec<(Reading<'t>, f64)> = Vec::new();
        let mut pending: Option<f64> = None;

        for ctx in tokenize(text) {
            let Some(value) = ctx.value() else {
                continue;
            };

            let mut reading = self.classifier.classify(&ctx);
            if reading == Reading::MultiplyPrevious {
                if pending.is_none() {
                    if let Some((Reading::Unit(unit), amount)) = folded.last_mut() {
                        if unit.kind == UnitKind::Quantity {
                            *amount *= value;
                            continue;
                        }
                    }
                }
                reading = self.classifier.classify_suffix(ctx.suffix);
            }

            match reading {
                Reading::MultiplyNext => {
                    pending = Some(pending.unwrap_or(1.0) * value);
                }
                Reading::MultiplyPrevious => {}
                other => {
                    let amount = pending.take().map_or(value, |factor| factor * value);
                    folded.push((other, amount));
                }
            }
        }

        if pending.is_some() {
            tracing::trace!(text, "dropping trailing multiplier");
        }

        folded
            .into_iter()
            .filter_map(|(reading, amount)| match reading {
                Reading::Unit(unit) => Some((unit, amount)),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
