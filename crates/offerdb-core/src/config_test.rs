use std::collections::HashMap;
use std::env::VarError;
use std::path::PathBuf;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_variants() {
    assert_eq!(parse_environment("development"), Environment::Development);
    assert_eq!(parse_environment("test"), Environment::Test);
    assert_eq!(parse_environment("production"), Environment::Production);
}

#[test]
fn parse_environment_unknown_defaults_to_development() {
    assert_eq!(parse_environment("staging"), Environment::Development);
}

#[test]
fn build_app_config_defaults() {
    let map = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.dealers_path, PathBuf::from("./config/dealers.yaml"));
    assert_eq!(cfg.categories_path, PathBuf::from("./config/categories.yaml"));
    assert!(cfg.units_path.is_none());
    assert!((cfg.similarity_floor - 0.7).abs() < f64::EPSILON);
    assert!((cfg.price_ratio_cutoff - 0.6).abs() < f64::EPSILON);
    assert_eq!(cfg.protection_days, 365);
}

#[test]
fn build_app_config_overrides() {
    let mut map = HashMap::new();
    map.insert("OFFERDB_ENV", "production");
    map.insert("OFFERDB_LOG_LEVEL", "debug");
    map.insert("OFFERDB_UNITS_PATH", "/etc/offerdb/units.yaml");
    map.insert("OFFERDB_SIMILARITY_FLOOR", "0.85");
    map.insert("OFFERDB_PROTECTION_DAYS", "30");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Production);
    assert_eq!(cfg.log_level, "debug");
    assert_eq!(
        cfg.units_path,
        Some(PathBuf::from("/etc/offerdb/units.yaml"))
    );
    assert!((cfg.similarity_floor - 0.85).abs() < f64::EPSILON);
    assert_eq!(cfg.protection_days, 30);
}

#[test]
fn build_app_config_blank_units_path_is_none() {
    let mut map = HashMap::new();
    map.insert("OFFERDB_UNITS_PATH", "  ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.units_path.is_none());
}

#[test]
fn build_app_config_rejects_unparseable_floor() {
    let mut map = HashMap::new();
    map.insert("OFFERDB_SIMILARITY_FLOOR", "high");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "OFFERDB_SIMILARITY_FLOOR"),
        "expected InvalidEnvVar(OFFERDB_SIMILARITY_FLOOR), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_ratio_out_of_range() {
    let mut map = HashMap::new();
    map.insert("OFFERDB_PRICE_RATIO_CUTOFF", "1.5");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, ref reason }) if var == "OFFERDB_PRICE_RATIO_CUTOFF" && reason.contains("outside")),
        "expected out-of-range error, got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_negative_protection_days() {
    let mut map = HashMap::new();
    map.insert("OFFERDB_PROTECTION_DAYS", "-1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "OFFERDB_PROTECTION_DAYS"),
        "expected InvalidEnvVar(OFFERDB_PROTECTION_DAYS), got: {result:?}"
    );
}
