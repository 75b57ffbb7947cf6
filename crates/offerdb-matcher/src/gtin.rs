//! GTIN-family identifier normalization and validation.
//!
//! `ean`, `gtin13` and `gtin` are the same code under different names and
//! share the `ean:` namespace. `nobb` (Norwegian building-products number)
//! keeps its own namespace.

use std::collections::{BTreeMap, BTreeSet};

const EAN_ID_TYPES: [&str; 3] = ["ean", "gtin13", "gtin"];
const NOBB_ID_TYPE: &str = "nobb";
const EAN_LENGTH: usize = 13;
const NOBB_LENGTH: usize = 8;

/// Normalizes every recognized, valid identifier into a namespaced key such
/// as `"ean:7038010009457"` or `"nobb:41234567"`. Unknown id types and
/// invalid codes are dropped.
#[must_use]
pub fn normalize_gtins(raw: &BTreeMap<String, String>) -> BTreeSet<String> {
    raw.iter()
        .filter_map(|(id_type, code)| {
            let key = normalize_gtin(id_type, code);
            if key.is_none() {
                tracing::debug!(id_type = %id_type, code = %code, "dropping unusable identifier");
            }
            key
        })
        .collect()
}

/// Normalizes a single identifier. Returns `None` for unknown id types and
/// codes that fail validation.
#[must_use]
pub fn normalize_gtin(id_type: &str, code: &str) -> Option<String> {
    let id_type = id_type.trim().to_lowercase();
    let digits: String = code
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if EAN_ID_TYPES.contains(&id_type.as_str()) {
        let padded = pad_ean(&digits)?;
        return is_valid_ean13(&padded).then(|| format!("ean:{padded}"));
    }
    if id_type == NOBB_ID_TYPE {
        return is_valid_nobb(&digits).then(|| format!("nobb:{digits}"));
    }
    None
}

/// GTIN-8 and GTIN-12 codes are left-padded to 13 digits. Padding with
/// zeros preserves the GS1 check digit.
fn pad_ean(digits: &str) -> Option<String> {
    match digits.len() {
        8 | 12 | EAN_LENGTH => Some(format!("{digits:0>13}")),
        _ => None,
    }
}

/// 13 ASCII digits, not all zero, with a correct GS1 check digit.
#[must_use]
pub fn is_valid_ean13(code: &str) -> bool {
    if code.len() != EAN_LENGTH || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if code.bytes().all(|b| b == b'0') {
        return false;
    }
    let digits: Vec<u32> = code.bytes().map(|b| u32::from(b - b'0')).collect();
    gs1_check_digit(&digits[..EAN_LENGTH - 1]) == digits[EAN_LENGTH - 1]
}

/// GS1 check digit: weights alternate 3, 1 starting from the rightmost data
/// digit.
fn gs1_check_digit(data: &[u32]) -> u32 {
    let sum: u32 = data
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 3 } else { *d })
        .sum();
    (10 - sum % 10) % 10
}

/// Exactly 8 ASCII digits. A leading zero marks a placeholder number.
#[must_use]
pub fn is_valid_nobb(code: &str) -> bool {
    code.len() == NOBB_LENGTH
        && code.bytes().all(|b| b.is_ascii_digit())
        && !code.starts_with('0')
}
