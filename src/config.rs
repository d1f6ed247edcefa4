use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::data::aggregate::TopNBounds;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "LABDASH_CONFIG";
/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "labdash.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Startup settings. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Spreadsheet (or CSV / Parquet) opened at startup.
    pub source: PathBuf,
    /// Sheet read from spreadsheet sources.
    pub sheet: String,
    pub ranking_top_n: TopNBounds,
    pub distribution_top_n: TopNBounds,
    /// Maximum rows drawn in the preview table.
    pub table_row_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("data/0012.xlsx"),
            sheet: "Planilha".to_string(),
            ranking_top_n: TopNBounds::RANKING,
            distribution_top_n: TopNBounds::DISTRIBUTION,
            table_row_limit: 500,
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// `$LABDASH_CONFIG`, else `./labdash.json`, else defaults.
    /// A config that fails to read is logged and replaced by defaults.
    pub fn discover() -> Self {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(p) => PathBuf::from(p),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !local.exists() {
                    return Self::default();
                }
                local
            }
        };
        match Self::from_file(&path) {
            Ok(config) => {
                log::info!("using config {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}; falling back to defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(
            DashboardConfig::from_json("{}").unwrap(),
            DashboardConfig::default()
        );
    }

    #[test]
    fn partial_config_overrides_fields() {
        let config = DashboardConfig::from_json(
            r#"{ "sheet": "Dados", "ranking_top_n": { "min": 1, "max": 10, "default": 3 } }"#,
        )
        .unwrap();
        assert_eq!(config.sheet, "Dados");
        assert_eq!(config.ranking_top_n.default, 3);
        assert_eq!(config.distribution_top_n, TopNBounds::DISTRIBUTION);
        assert_eq!(config.source, PathBuf::from("data/0012.xlsx"));
    }

    #[test]
    fn unreadable_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DashboardConfig::from_file(&dir.path().join("none.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_file_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = DashboardConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }
}
