//! Raw dealer records and the declarative field rewrites applied to them.

use offerdb_core::FieldRule;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which some dealers nest extra attributes as
/// `[{ "key": ..., "value": ... }]`.
pub const ADDITIONAL_PROPERTIES: &str = "additionalProperties";

/// A dealer record as scraped: an untyped JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawOffer(pub Map<String, Value>);

impl RawOffer {
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Looks up `key`, falling back to the `additionalProperties` list when
    /// the top-level field is absent or null.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.0.get(key) {
            Some(Value::Null) | None => self.additional_property(key),
            Some(value) => Some(value),
        }
    }

    fn additional_property(&self, key: &str) -> Option<&Value> {
        self.0
            .get(ADDITIONAL_PROPERTIES)?
            .as_array()?
            .iter()
            .find(|entry| entry.get("key").and_then(Value::as_str) == Some(key))
            .and_then(|entry| entry.get("value"))
            .filter(|value| !value.is_null())
    }

    /// Non-blank string value of `key`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Numeric value of `key`. Strings are accepted with either `,` or `.`
    /// as decimal separator.
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', ".").parse().ok(),
            _ => None,
        }
    }

    /// `key` rendered as text for quantity mining. Numbers use a comma
    /// decimal separator so the tokenizer reads them whole; string arrays
    /// are joined with spaces.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<String> {
        let text = match self.get(key)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string().replace('.', ","),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" "),
            _ => return None,
        };
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Identifier-like value of `key`: strings as-is, integers in decimal.
    #[must_use]
    pub fn identifier(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => n.as_u64().map(|v| v.to_string()),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Removes `key` from the top level and from `additionalProperties`,
    /// returning the value [`RawOffer::get`] would have read.
    pub fn take(&mut self, key: &str) -> Option<Value> {
        let top = self.0.remove(key).filter(|v| !v.is_null());
        let nested = self.remove_additional_property(key);
        top.or(nested)
    }

    fn remove_additional_property(&mut self, key: &str) -> Option<Value> {
        let entries = self.0.get_mut(ADDITIONAL_PROPERTIES)?.as_array_mut()?;
        let mut found = None;
        entries.retain(|entry| {
            if entry.get("key").and_then(Value::as_str) != Some(key) {
                return true;
            }
            if found.is_none() {
                found = entry.get("value").filter(|v| !v.is_null()).cloned();
            }
            false
        });
        found
    }
}

impl From<Map<String, Value>> for RawOffer {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Applies dealer field rules in order. Renamed and ignored sources are
/// removed from both the top level and `additionalProperties`. A rename whose
/// source is missing leaves the destination untouched.
#[must_use]
pub fn apply_field_mapping(mut raw: RawOffer, rules: &[FieldRule]) -> RawOffer {
    for rule in rules {
        match rule {
            FieldRule::Rename {
                source,
                destination,
            } => {
                match raw.take(source) {
                    Some(value) => raw.insert(destination.clone(), value),
                    None => tracing::trace!(source = %source, "rename source missing"),
                }
            }
            FieldRule::Fixed { destination, value } => {
                raw.insert(destination.clone(), value.clone());
            }
            FieldRule::Ignore { source } => {
                raw.take(source);
            }
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(value: Value) -> RawOffer {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn get_falls_back_to_additional_properties() {
        let offer = raw(json!({
            "title": "Melk",
            "brand": null,
            "additionalProperties": [
                { "key": "brand", "value": "Tine", "type": "string" },
                { "key": "ean", "value": "7038010009457" }
            ]
        }));
        assert_eq!(offer.get_str("title"), Some("Melk"));
        assert_eq!(offer.get_str("brand"), Some("Tine"));
        assert_eq!(offer.get_str("ean"), Some("7038010009457"));
        assert!(offer.get("missing").is_none());
    }

    #[test]
    fn get_f64_accepts_comma_strings() {
        let offer = raw(json!({ "price": "29,90", "pre_price": 39.5, "bad": "n/a" }));
        assert_eq!(offer.get_f64("price"), Some(29.9));
        assert_eq!(offer.get_f64("pre_price"), Some(39.5));
        assert_eq!(offer.get_f64("bad"), None);
    }

    #[test]
    fn text_renders_numbers_with_comma() {
        let offer = raw(json!({ "size": 1.5, "tags": ["4x", "130g"], "blank": "  " }));
        assert_eq!(offer.text("size").as_deref(), Some("1,5"));
        assert_eq!(offer.text("tags").as_deref(), Some("4x 130g"));
        assert_eq!(offer.text("blank"), None);
    }

    #[test]
    fn identifier_accepts_numbers() {
        let offer = raw(json!({ "id": 12345, "sku": " A-1 " }));
        assert_eq!(offer.identifier("id").as_deref(), Some("12345"));
        assert_eq!(offer.identifier("sku").as_deref(), Some("A-1"));
    }

    #[test]
    fn rules_apply_in_order() {
        let offer = raw(json!({ "name": "Kaffe", "tracking": "abc", "title": "old" }));
        let rules = vec![
            FieldRule::Rename {
                source: "name".to_string(),
                destination: "title".to_string(),
            },
            FieldRule::Fixed {
                destination: "provenance".to_string(),
                value: json!("meny-web"),
            },
            FieldRule::Ignore {
                source: "tracking".to_string(),
            },
        ];
        let mapped = apply_field_mapping(offer, &rules);
        assert_eq!(mapped.get_str("title"), Some("Kaffe"));
        assert_eq!(mapped.get_str("provenance"), Some("meny-web"));
        assert!(mapped.get("tracking").is_none());
        assert!(mapped.get("name").is_none());
    }

    #[test]
    fn rename_with_missing_source_keeps_destination() {
        let offer = raw(json!({ "title": "Kaffe" }));
        let rules = vec![FieldRule::Rename {
            source: "name".to_string(),
            destination: "title".to_string(),
        }];
        let mapped = apply_field_mapping(offer, &rules);
        assert_eq!(mapped.get_str("title"), Some("Kaffe"));
    }

    #[test]
    fn rename_reads_additional_properties() {
        let offer = raw(json!({
            "additionalProperties": [{ "key": "ean", "value": "7038010009457" }]
        }));
        let rules = vec![FieldRule::Rename {
            source: "ean".to_string(),
            destination: "gtin13".to_string(),
        }];
        let mapped = apply_field_mapping(offer, &rules);
        assert_eq!(mapped.get_str("gtin13"), Some("7038010009457"));
    }

    #[test]
    fn ignore_drops_additional_properties() {
        let offer = raw(json!({
            "additionalProperties": [
                { "key": "description", "value": "Pose 5 kg" },
                { "key": "brand", "value": "Tine" }
            ]
        }));
        let rules = vec![FieldRule::Ignore {
            source: "description".to_string(),
        }];
        let mapped = apply_field_mapping(offer, &rules);
        assert!(mapped.get("description").is_none());
        assert!(mapped.text("description").is_none());
        assert_eq!(mapped.get_str("brand"), Some("Tine"));
    }

    #[test]
    fn rename_moves_additional_property() {
        let offer = raw(json!({
            "additionalProperties": [{ "key": "name", "value": "Kaffe" }]
        }));
        let rules = vec![FieldRule::Rename {
            source: "name".to_string(),
            destination: "title".to_string(),
        }];
        let mapped = apply_field_mapping(offer, &rules);
        assert_eq!(mapped.get_str("title"), Some("Kaffe"));
        assert!(mapped.get("name").is_none());
    }
}
