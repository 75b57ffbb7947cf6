//! JSON-lines input and output for the command handlers.

use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Parses every non-blank line of `content`. Each entry carries its 1-based
/// line number so callers can log and skip bad lines.
pub(crate) fn parse<T: DeserializeOwned>(
    content: &str,
) -> Vec<(usize, Result<T, serde_json::Error>)> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| (index + 1, serde_json::from_str(line)))
        .collect()
}

/// Parses `content`, logging and dropping malformed lines.
pub(crate) fn parse_lenient<T: DeserializeOwned>(content: &str, source: &Path) -> Vec<T> {
    parse(content)
        .into_iter()
        .filter_map(|(line, parsed)| match parsed {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(file = %source.display(), line, error = %e, "skipping malformed line");
                None
            }
        })
        .collect()
}

/// Renders one compact JSON object per line.
pub(crate) fn render<T: Serialize>(items: &[T]) -> anyhow::Result<String> {
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(item)?);
        out.push('\n');
    }
    Ok(out)
}

pub(crate) async fn read(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

pub(crate) async fn write(path: &Path, content: &str) -> anyhow::Result<()> {
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}
