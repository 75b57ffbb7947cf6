use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One declarative field rewrite applied to a raw offer before parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldRule {
    /// Move `source` to `destination` when present.
    Rename { source: String, destination: String },
    /// Set `destination` to a constant.
    Fixed {
        destination: String,
        value: serde_json::Value,
    },
    /// Drop `source`.
    Ignore { source: String },
}

/// How a dealer's breadcrumb is turned into a canonical category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStrategy {
    /// Look up `"{last label}_{depth}"` directly in the category tree.
    BreadcrumbDepth,
    /// Translate the dealer path through `mapping` into a canonical key.
    SourceMapping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryRule {
    #[serde(default = "default_category_field")]
    pub field: String,
    pub strategy: CategoryStrategy,
    /// Breadcrumb entries dropped from the front (e.g. `"Hjem"`).
    #[serde(default)]
    pub trim_first: usize,
    /// Breadcrumb entries dropped from the end.
    #[serde(default)]
    pub trim_last: usize,
    /// Source path (JSON list) or last label → canonical category key.
    #[serde(default)]
    pub mapping: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DealerConfig {
    pub key: String,
    /// Prefix of every offer uri from this dealer.
    pub namespace: String,
    #[serde(default = "default_market")]
    pub market: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Fields mined for quantity text, most authoritative first.
    #[serde(default = "default_quantity_fields")]
    pub quantity_fields: Vec<String>,
    #[serde(default)]
    pub field_mapping: Vec<FieldRule>,
    #[serde(default)]
    pub category: Option<CategoryRule>,
}

fn default_category_field() -> String {
    "categories".to_string()
}

fn default_market() -> String {
    "no".to_string()
}

fn default_currency() -> String {
    "NOK".to_string()
}

fn default_quantity_fields() -> Vec<String> {
    vec![
        "title".to_string(),
        "subtitle".to_string(),
        "description".to_string(),
    ]
}

#[derive(Debug, Deserialize)]
pub struct DealersFile {
    pub dealers: Vec<DealerConfig>,
}

impl DealersFile {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&DealerConfig> {
        self.dealers.iter().find(|d| d.key == key)
    }
}

/// Load and validate the dealer configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_dealers(path: &Path) -> Result<DealersFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_dealers(&content)
}

/// Parse and validate dealer configuration from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_dealers(content: &str) -> Result<DealersFile, ConfigError> {
    let dealers_file: DealersFile =
        serde_yaml::from_str(content).map_err(ConfigError::FileParse)?;
    validate_dealers(&dealers_file)?;
    Ok(dealers_file)
}

fn validate_dealers(dealers_file: &DealersFile) -> Result<(), ConfigError> {
    let mut seen_keys = HashSet::new();

    for dealer in &dealers_file.dealers {
        if dealer.key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "dealer key must be non-empty".to_string(),
            ));
        }

        if dealer.namespace.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "dealer '{}' has an empty namespace",
                dealer.key
            )));
        }

        if dealer.namespace.contains(':') {
            return Err(ConfigError::Validation(format!(
                "dealer '{}' namespace '{}' must not contain ':'",
                dealer.key, dealer.namespace
            )));
        }

        if !seen_keys.insert(dealer.key.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate dealer key: '{}'",
                dealer.key
            )));
        }

        if dealer.quantity_fields.is_empty() {
            return Err(ConfigError::Validation(format!(
                "dealer '{}' lists no quantity fields",
                dealer.key
            )));
        }

        if let Some(rule) = &dealer.category {
            if rule.strategy == CategoryStrategy::SourceMapping && rule.mapping.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "dealer '{}' uses source_mapping without any mapping entries",
                    dealer.key
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "dealers_test.rs"]
mod tests;
