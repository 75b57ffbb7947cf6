//! The unit table: which symbols are recognized after a number, what kind of
//! unit each one is, and how it converts into SI.
//!
//! The table is data, not code. A built-in table ships with the crate
//! (`data/units.yaml`) and can be replaced wholesale by a file of the same
//! shape at startup.

use std::path::Path;
use std::sync::LazyLock;

use offerdb_core::{SiConversion, Unit, UnitKind};
use serde::Deserialize;

use crate::error::ParserError;

const BUILTIN_UNITS: &str = include_str!("../data/units.yaml");

static BUILTIN: LazyLock<UnitTable> = LazyLock::new(|| {
    UnitTable::from_yaml_str(BUILTIN_UNITS).expect("built-in unit table is valid")
});

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnitsFile {
    multiplier: String,
    units: Vec<UnitEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UnitEntry {
    symbol: String,
    kind: UnitKind,
    #[serde(default)]
    si: Option<SiConversion>,
    /// Defaults to the bare symbol.
    #[serde(default)]
    patterns: Vec<String>,
}

/// A lowercased pattern pointing at the unit it denotes.
#[derive(Debug, Clone)]
struct Pattern {
    text: String,
    unit: Unit,
}

/// Immutable lookup structure built once from the unit table.
#[derive(Debug, Clone)]
pub struct UnitTable {
    multiplier: String,
    quantities: Vec<Pattern>,
    pieces: Vec<Pattern>,
    quantity_values: Vec<Pattern>,
    piece_values: Vec<Pattern>,
}

impl UnitTable {
    /// The table compiled into the crate.
    #[must_use]
    pub fn builtin() -> &'static UnitTable {
        &BUILTIN
    }

    /// Loads a replacement table from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ParserError::Io`] if the file cannot be read, or any error
    /// from [`UnitTable::from_yaml_str`].
    pub fn load(path: &Path) -> Result<Self, ParserError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParserError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Builds a table from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ParserError::Deserialize`] for malformed YAML and
    /// [`ParserError::UnitTable`] for entries that cannot be used: empty
    /// symbols or patterns, multiplier entries inside `units`, or SI factors
    /// that are not finite and positive.
    pub fn from_yaml_str(content: &str) -> Result<Self, ParserError> {
        let file: UnitsFile =
            serde_yaml::from_str(content).map_err(|e| ParserError::Deserialize {
                context: "unit table".to_string(),
                source: e,
            })?;

        if file.multiplier.trim().is_empty() {
            return Err(ParserError::UnitTable(
                "multiplier symbol must be non-empty".to_string(),
            ));
        }

        let mut table = Self {
            multiplier: file.multiplier,
            quantities: Vec::new(),
            pieces: Vec::new(),
            quantity_values: Vec::new(),
            piece_values: Vec::new(),
        };

        for entry in file.units {
            validate_entry(&entry)?;
            let unit = Unit {
                symbol: entry.symbol.clone(),
                kind: entry.kind,
                si: entry.si,
            };
            let patterns = if entry.patterns.is_empty() {
                vec![entry.symbol]
            } else {
                entry.patterns
            };
            let bucket = table.bucket_mut(unit.kind).ok_or_else(|| {
                ParserError::UnitTable(format!(
                    "unit '{}' cannot use kind multiplier",
                    unit.symbol
                ))
            })?;
            for text in patterns {
                bucket.push(Pattern {
                    text: text.to_lowercase(),
                    unit: unit.clone(),
                });
            }
        }

        for bucket in [
            &mut table.quantities,
            &mut table.pieces,
            &mut table.quantity_values,
            &mut table.piece_values,
        ] {
            // Longest first so "ml" is tried before "m".
            bucket.sort_by(|a, b| b.text.len().cmp(&a.text.len()));
        }

        Ok(table)
    }

    /// The pack multiplier symbol (`"x"`). Matched case-sensitively.
    #[must_use]
    pub fn multiplier(&self) -> &str {
        &self.multiplier
    }

    /// Finds the unit of `kind` whose pattern is the longest prefix of
    /// `candidate`. `candidate` must already be lowercased.
    #[must_use]
    pub fn match_prefix(&self, kind: UnitKind, candidate: &str) -> Option<&Unit> {
        if candidate.is_empty() {
            return None;
        }
        self.bucket(kind)?
            .iter()
            .find(|p| candidate.starts_with(p.text.as_str()))
            .map(|p| &p.unit)
    }

    /// Finds the unit of `kind` with a pattern exactly equal to `text`
    /// (case-insensitive). Used for structured fields like `quantity_unit`.
    #[must_use]
    pub fn lookup_exact(&self, kind: UnitKind, text: &str) -> Option<&Unit> {
        let needle = text.trim().to_lowercase();
        self.bucket(kind)?
            .iter()
            .find(|p| p.text == needle)
            .map(|p| &p.unit)
    }

    fn bucket(&self, kind: UnitKind) -> Option<&Vec<Pattern>> {
        match kind {
            UnitKind::Quantity => Some(&self.quantities),
            UnitKind::Piece => Some(&self.pieces),
            UnitKind::QuantityValue => Some(&self.quantity_values),
            UnitKind::PieceValue => Some(&self.piece_values),
            UnitKind::Multiplier => None,
        }
    }

    fn bucket_mut(&mut self, kind: UnitKind) -> Option<&mut Vec<Pattern>> {
        match kind {
            UnitKind::Quantity => Some(&mut self.quantities),
            UnitKind::Piece => Some(&mut self.pieces),
            UnitKind::QuantityValue => Some(&mut self.quantity_values),
            UnitKind::PieceValue => Some(&mut self.piece_values),
            UnitKind::Multiplier => None,
        }
    }
}

fn validate_entry(entry: &UnitEntry) -> Result<(), ParserError> {
    if entry.symbol.trim().is_empty() {
        return Err(ParserError::UnitTable(
            "unit symbol must be non-empty".to_string(),
        ));
    }
    if entry.patterns.iter().any(|p| p.trim().is_empty()) {
        return Err(ParserError::UnitTable(format!(
            "unit '{}' has an empty pattern",
            entry.symbol
        )));
    }
    if let Some(si) = &entry.si {
        if !si.factor.is_finite() || si.factor <= 0.0 {
            return Err(ParserError::UnitTable(format!(
                "unit '{}' has invalid SI factor {}",
                entry.symbol, si.factor
            )));
        }
        if si.target.trim().is_empty() {
            return Err(ParserError::UnitTable(format!(
                "unit '{}' has an empty SI target",
                entry.symbol
            )));
        }
    }
    Ok(())
}
