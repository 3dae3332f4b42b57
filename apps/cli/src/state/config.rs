//! # Configuration
//!
//! Settings read once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Command-line flags (`--db`)
//! 2. Environment variables (`RELIEF_*`)
//! 3. Defaults (this file)

use std::path::PathBuf;

use serde::Serialize;

use relief_core::DEFAULT_LOW_STOCK_THRESHOLD;

use crate::error::{ApiError, ApiResult};

pub const ENV_DB_PATH: &str = "RELIEF_DB_PATH";
pub const ENV_LOW_STOCK_THRESHOLD: &str = "RELIEF_LOW_STOCK_THRESHOLD";
pub const ENV_REPORT_DIR: &str = "RELIEF_REPORT_DIR";

/// Where generated CSV reports go when `--out` is not given.
pub const DEFAULT_REPORT_DIR: &str = "./reports";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppConfig {
    /// Database file; `None` means the platform data directory.
    pub db_path: Option<PathBuf>,

    /// Stock at or below this is flagged `low`.
    pub low_stock_threshold: i64,

    pub report_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            db_path: None,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
        }
    }
}

impl AppConfig {
    /// Reads `RELIEF_*` variables over the defaults.
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        let mut config = AppConfig::default();

        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup(ENV_LOW_STOCK_THRESHOLD) {
            let threshold: i64 = raw.trim().parse().map_err(|_| {
                ApiError::validation(format!(
                    "{} must be a whole number, got '{}'",
                    ENV_LOW_STOCK_THRESHOLD, raw
                ))
            })?;
            if threshold < 0 {
                return Err(ApiError::validation(format!(
                    "{} cannot be negative",
                    ENV_LOW_STOCK_THRESHOLD
                )));
            }
            config.low_stock_threshold = threshold;
        }

        if let Some(dir) = lookup(ENV_REPORT_DIR).filter(|d| !d.trim().is_empty()) {
            config.report_dir = PathBuf::from(dir);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.low_stock_threshold, 10);
        assert_eq!(config.report_dir, PathBuf::from("./reports"));
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/tmp/relief.db"),
            (ENV_LOW_STOCK_THRESHOLD, " 25 "),
            (ENV_REPORT_DIR, "/tmp/reports"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/relief.db")));
        assert_eq!(config.low_stock_threshold, 25);
        assert_eq!(config.report_dir, PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn test_bad_threshold() {
        assert!(AppConfig::from_lookup(lookup(&[(ENV_LOW_STOCK_THRESHOLD, "many")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[(ENV_LOW_STOCK_THRESHOLD, "-1")])).is_err());
    }
}
