use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::quantity::{AmountRange, OfferQuantityField};

/// Schema version stamped on freshly parsed derived blocks. Bumped whenever
/// the parser's output for a block changes shape or meaning.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// One node of the canonical category tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub key: String,
    pub parent: Option<String>,
    pub text: String,
}

/// A single nutrition declaration, e.g. `{"code": "fat", "amount": 3.5, "unit": "g"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrient {
    pub code: String,
    pub amount: f64,
    pub unit: String,
}

/// Fields whose value is reconciled when duplicate offers are merged and
/// which may be protected by a manual edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestedField {
    Nutrition,
    Ingredients,
    Properties,
    Quantity,
    Categories,
}

impl ContestedField {
    pub const ALL: [ContestedField; 5] = [
        ContestedField::Nutrition,
        ContestedField::Ingredients,
        ContestedField::Properties,
        ContestedField::Quantity,
        ContestedField::Categories,
    ];
}

impl std::fmt::Display for ContestedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContestedField::Nutrition => write!(f, "nutrition"),
            ContestedField::Ingredients => write!(f, "ingredients"),
            ContestedField::Properties => write!(f, "properties"),
            ContestedField::Quantity => write!(f, "quantity"),
            ContestedField::Categories => write!(f, "categories"),
        }
    }
}

/// Schema version of each derived block, compared during merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersions {
    pub quantity: u32,
    pub categories: u32,
    pub nutrition: u32,
    pub ingredients: u32,
    pub properties: u32,
}

impl SchemaVersions {
    /// Every block at [`CURRENT_SCHEMA_VERSION`].
    #[must_use]
    pub fn current() -> Self {
        Self {
            quantity: CURRENT_SCHEMA_VERSION,
            categories: CURRENT_SCHEMA_VERSION,
            nutrition: CURRENT_SCHEMA_VERSION,
            ingredients: CURRENT_SCHEMA_VERSION,
            properties: CURRENT_SCHEMA_VERSION,
        }
    }

    #[must_use]
    pub fn get(&self, field: ContestedField) -> u32 {
        match field {
            ContestedField::Quantity => self.quantity,
            ContestedField::Categories => self.categories,
            ContestedField::Nutrition => self.nutrition,
            ContestedField::Ingredients => self.ingredients,
            ContestedField::Properties => self.properties,
        }
    }

    pub fn set(&mut self, field: ContestedField, version: u32) {
        match field {
            ContestedField::Quantity => self.quantity = version,
            ContestedField::Categories => self.categories = version,
            ContestedField::Nutrition => self.nutrition = version,
            ContestedField::Ingredients => self.ingredients = version,
            ContestedField::Properties => self.properties = version,
        }
    }
}

impl Default for SchemaVersions {
    fn default() -> Self {
        Self::current()
    }
}

/// Manual and automatic overrides on contested fields.
///
/// A manual override records when the field was edited; within the
/// retention window that edit protects the field from re-scrape overwrites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    pub manual: BTreeMap<ContestedField, DateTime<Utc>>,
    #[serde(default)]
    pub automatic: BTreeSet<ContestedField>,
}

impl Overrides {
    #[must_use]
    pub fn is_manual(&self, field: ContestedField) -> bool {
        self.manual.contains_key(&field)
    }

    #[must_use]
    pub fn is_automatic(&self, field: ContestedField) -> bool {
        self.automatic.contains(&field)
    }

    /// `true` when `field` was edited by hand less than `retention` ago.
    #[must_use]
    pub fn is_protected(&self, field: ContestedField, now: DateTime<Utc>, retention: Duration) -> bool {
        self.manual
            .get(&field)
            .is_some_and(|edited_at| now.signed_duration_since(*edited_at) < retention)
    }

    /// Copies the override flags for `field` from `other`, replacing ours.
    pub fn take_from(&mut self, other: &Overrides, field: ContestedField) {
        match other.manual.get(&field) {
            Some(at) => {
                self.manual.insert(field, *at);
            }
            None => {
                self.manual.remove(&field);
            }
        }
        if other.automatic.contains(&field) {
            self.automatic.insert(field);
        } else {
            self.automatic.remove(&field);
        }
    }
}

/// The product-level facts of an offer: the blocks that are shared between
/// duplicate offers and reconciled when they are merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFacts {
    #[serde(default)]
    pub quantity: OfferQuantityField,
    #[serde(default)]
    pub categories: Vec<CategoryNode>,
    #[serde(default)]
    pub nutrition: Vec<Nutrient>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub versions: SchemaVersions,
    #[serde(default)]
    pub overrides: Overrides,
}

impl ProductFacts {
    /// Whether `field` carries information worth keeping over an empty rival.
    #[must_use]
    pub fn is_informative(&self, field: ContestedField) -> bool {
        match field {
            ContestedField::Quantity => self.quantity.has_standard_size(),
            ContestedField::Categories => !self.categories.is_empty(),
            ContestedField::Nutrition => !self.nutrition.is_empty(),
            ContestedField::Ingredients => !self.ingredients.is_empty(),
            ContestedField::Properties => !self.properties.is_empty(),
        }
    }

    /// Replaces `field` (value, version and override flags) with `other`'s.
    pub fn take_field(&mut self, other: &ProductFacts, field: ContestedField) {
        match field {
            ContestedField::Quantity => self.quantity = other.quantity.clone(),
            ContestedField::Categories => self.categories = other.categories.clone(),
            ContestedField::Nutrition => self.nutrition = other.nutrition.clone(),
            ContestedField::Ingredients => self.ingredients = other.ingredients.clone(),
            ContestedField::Properties => self.properties = other.properties.clone(),
        }
        self.versions.set(field, other.versions.get(field));
        self.overrides.take_from(&other.overrides, field);
    }
}

/// Price information as scraped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub price: Option<f64>,
    /// Price before a campaign, if the dealer shows one.
    pub pre_price: Option<f64>,
    /// ISO 4217 currency code (e.g., `"NOK"`).
    pub currency: String,
}

/// A dealer offer normalized into the canonical schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalOffer {
    /// `"{namespace}:{provenance_id}"`; the upsert key.
    pub uri: String,
    /// Dealer key from the dealer configuration.
    pub dealer: String,
    /// Scraper/source identifier.
    pub provenance: String,
    /// The source's own id for the offer.
    pub provenance_id: String,
    /// Market code (e.g., `"no"`), used to scope reconciled facts.
    pub market: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    /// Raw GTIN-family identifiers keyed by id type (`"ean"`, `"gtin13"`, `"nobb"`).
    #[serde(default)]
    pub gtins: BTreeMap<String, String>,
    pub pricing: Pricing,
    /// Price per unit, split into size and piece axes.
    #[serde(default)]
    pub value: OfferQuantityField,
    pub items: AmountRange,
    pub valid_from: DateTime<Utc>,
    pub valid_through: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
    #[serde(flatten)]
    pub facts: ProductFacts,
}

impl CanonicalOffer {
    /// A bare offer from `dealer` with only its identity and title set.
    #[must_use]
    pub fn new(
        namespace: &str,
        dealer: &str,
        provenance_id: &str,
        title: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uri: format!("{namespace}:{provenance_id}"),
            dealer: dealer.to_string(),
            provenance: dealer.to_string(),
            provenance_id: provenance_id.to_string(),
            market: "no".to_string(),
            title: title.to_string(),
            subtitle: None,
            description: None,
            brand: None,
            gtins: BTreeMap::new(),
            pricing: Pricing::default(),
            value: OfferQuantityField::default(),
            items: AmountRange::exact(1.0),
            valid_from: now,
            valid_through: None,
            scraped_at: now,
            facts: ProductFacts::default(),
        }
    }

    /// Text used for similarity matching: title, subtitle, description and
    /// category labels.
    #[must_use]
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.title.as_str()];
        parts.extend(self.subtitle.as_deref());
        parts.extend(self.description.as_deref());
        parts.extend(self.facts.categories.iter().map(|c| c.text.as_str()));
        parts.join(" ")
    }

    /// `true` when the offer is valid at `at`: `valid_from <= at < valid_through`.
    #[must_use]
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_through.is_none_or(|until| at < until)
    }
}

#[cfg(test)]
#[path = "offers_test.rs"]
mod tests;
