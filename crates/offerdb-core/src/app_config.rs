use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub dealers_path: PathBuf,
    pub categories_path: PathBuf,
    /// Replaces the built-in unit table when set.
    pub units_path: Option<PathBuf>,
    /// Minimum cosine similarity for a textual duplicate candidate.
    pub similarity_floor: f64,
    /// Price difference ratio at or above which a textual match is rejected.
    pub price_ratio_cutoff: f64,
    /// How long a manual edit protects a field from re-scrape overwrites.
    pub protection_days: i64,
}
