//! Canonical category tree and resolution of dealer breadcrumbs against it.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use offerdb_core::{CategoryNode, CategoryRule, CategoryStrategy};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{CategoryError, ParserError};

#[derive(Debug, Deserialize)]
struct CategoriesFile {
    categories: Vec<CategoryNode>,
}

/// The canonical category tree, validated at construction.
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    nodes: HashMap<String, CategoryNode>,
    /// `"{text}_{depth}"` → node key. Roots have depth 0.
    by_depth: HashMap<String, String>,
}

impl CategoryTable {
    /// Builds the tree, failing on duplicate keys, missing parents or
    /// parent cycles.
    ///
    /// # Errors
    ///
    /// Returns the first [`CategoryError`] found.
    pub fn new(nodes: Vec<CategoryNode>) -> Result<Self, CategoryError> {
        let mut table = Self::default();
        for node in nodes {
            if table.nodes.contains_key(&node.key) {
                return Err(CategoryError::DuplicateKey(node.key));
            }
            table.nodes.insert(node.key.clone(), node);
        }

        let mut keys: Vec<&String> = table.nodes.keys().collect();
        keys.sort();
        let mut by_depth = HashMap::new();
        for key in keys {
            let depth = table.chain(key)?.len() - 1;
            let node = &table.nodes[key];
            let label = depth_label(&node.text, depth);
            if let Some(existing) = by_depth.get(&label) {
                tracing::warn!(
                    label = %label,
                    kept = %existing,
                    ignored = %key,
                    "category label is ambiguous at this depth"
                );
                continue;
            }
            by_depth.insert(label, key.clone());
        }
        table.by_depth = by_depth;

        Ok(table)
    }

    /// Loads the tree from a YAML file with a top-level `categories` list.
    ///
    /// # Errors
    ///
    /// Returns [`ParserError`] if the file cannot be read or parsed, or the
    /// tree is inconsistent.
    pub fn load(path: &Path) -> Result<Self, ParserError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParserError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// # Errors
    ///
    /// Returns [`ParserError`] if the YAML is malformed or the tree is
    /// inconsistent.
    pub fn from_yaml_str(content: &str) -> Result<Self, ParserError> {
        let file: CategoriesFile =
            serde_yaml::from_str(content).map_err(|e| ParserError::Deserialize {
                context: "category table".to_string(),
                source: e,
            })?;
        Ok(Self::new(file.categories)?)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CategoryNode> {
        self.nodes.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node whose label is `text` at `depth`.
    #[must_use]
    pub fn by_depth_label(&self, text: &str, depth: usize) -> Option<&CategoryNode> {
        self.by_depth
            .get(&depth_label(text, depth))
            .and_then(|key| self.nodes.get(key))
    }

    /// Root-to-leaf chain ending at `key`. Empty when `key` is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`CategoryError`] if a parent is missing or the parents loop.
    pub fn ancestors(&self, key: &str) -> Result<Vec<CategoryNode>, CategoryError> {
        if !self.nodes.contains_key(key) {
            return Ok(Vec::new());
        }
        Ok(self
            .chain(key)?
            .into_iter()
            .rev()
            .cloned()
            .collect())
    }

    /// Leaf-to-root walk.
    fn chain(&self, key: &str) -> Result<Vec<&CategoryNode>, CategoryError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.nodes.get(key);
        while let Some(node) = current {
            if !seen.insert(node.key.as_str()) {
                return Err(CategoryError::Cycle {
                    key: key.to_string(),
                });
            }
            chain.push(node);
            current = match &node.parent {
                Some(parent) => Some(self.nodes.get(parent).ok_or_else(|| {
                    CategoryError::MissingParent {
                        key: node.key.clone(),
                        parent: parent.clone(),
                    }
                })?),
                None => None,
            };
        }
        Ok(chain)
    }

    /// Maps a dealer breadcrumb to a root-to-leaf category chain.
    ///
    /// After trimming, `breadcrumb_depth` looks up the last label at its
    /// position; `source_mapping` looks up the whole path (as a JSON list)
    /// and then the last label alone. An unresolved breadcrumb yields an
    /// empty chain.
    ///
    /// # Errors
    ///
    /// Returns [`CategoryError`] only when the tree itself is broken.
    pub fn resolve(
        &self,
        breadcrumb: &[String],
        rule: &CategoryRule,
    ) -> Result<Vec<CategoryNode>, CategoryError> {
        let path = trim(breadcrumb, rule.trim_first, rule.trim_last);
        let Some(last) = path.last() else {
            return Ok(Vec::new());
        };

        let leaf = match rule.strategy {
            CategoryStrategy::BreadcrumbDepth => self
                .by_depth_label(last, path.len() - 1)
                .map(|node| node.key.clone()),
            CategoryStrategy::SourceMapping => {
                let joined = serde_json::to_string(path).unwrap_or_default();
                rule.mapping
                    .get(&joined)
                    .or_else(|| rule.mapping.get(last.as_str()))
                    .cloned()
            }
        };

        match leaf {
            Some(key) if self.nodes.contains_key(&key) => self.ancestors(&key),
            Some(key) => {
                tracing::warn!(category = %key, "mapped category is not in the tree");
                Ok(Vec::new())
            }
            None => {
                tracing::debug!(breadcrumb = ?path, "no category for breadcrumb");
                Ok(Vec::new())
            }
        }
    }
}

fn depth_label(text: &str, depth: usize) -> String {
    format!("{text}_{depth}")
}

fn trim(breadcrumb: &[String], first: usize, last: usize) -> &[String] {
    let start = first.min(breadcrumb.len());
    let end = breadcrumb.len().saturating_sub(last).max(start);
    &breadcrumb[start..end]
}

/// Reads a breadcrumb from a raw field: a list of labels, or a single string
/// separated by `>` or `/`.
#[must_use]
pub fn breadcrumb_from_value(value: &Value) -> Vec<String> {
    let labels: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(s) => s.split(['>', '/']).map(str::to_string).collect(),
        _ => Vec::new(),
    };
    labels
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

#[cfg(test)]
#[path = "category_test.rs"]
mod tests;
