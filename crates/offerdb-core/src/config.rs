use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function,
/// so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_ratio = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let raw = or_default(var, default);
        let value = raw
            .parse::<f64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })?;
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("{value} is outside 0.0..=1.0"),
            });
        }
        Ok(value)
    };

    let parse_days = |var: &str, default: &str| -> Result<i64, ConfigError> {
        let raw = or_default(var, default);
        let days = raw.parse::<i64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })?;
        if days < 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        Ok(days)
    };

    let env = parse_environment(&or_default("OFFERDB_ENV", "development"));
    let log_level = or_default("OFFERDB_LOG_LEVEL", "info");
    let dealers_path = PathBuf::from(or_default("OFFERDB_DEALERS_PATH", "./config/dealers.yaml"));
    let categories_path = PathBuf::from(or_default(
        "OFFERDB_CATEGORIES_PATH",
        "./config/categories.yaml",
    ));
    let units_path = lookup("OFFERDB_UNITS_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    let similarity_floor = parse_ratio("OFFERDB_SIMILARITY_FLOOR", "0.7")?;
    let price_ratio_cutoff = parse_ratio("OFFERDB_PRICE_RATIO_CUTOFF", "0.6")?;
    let protection_days = parse_days("OFFERDB_PROTECTION_DAYS", "365")?;

    Ok(AppConfig {
        env,
        log_level,
        dealers_path,
        categories_path,
        units_path,
        similarity_floor,
        price_ratio_cutoff,
        protection_days,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
