//! Configuration system for Lumen.
//!
//! TOML-based configuration for query limits, result pagination and the
//! target warehouse.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dialect::{
    AdapterType, BigQueryDialect, DatabricksDialect, DuckDbDialect, PostgresDialect,
    SnowflakeDialect, TrinoDialect, WarehouseDialect, WeekDay,
};
use crate::error::{LumenError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LumenConfig {
    pub query: QueryConfig,
    pub pagination: PaginationConfig,
    pub warehouse: WarehouseConfig,
}

/// Query limit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Largest row limit a query may request (default: 5000).
    pub max_limit: u64,
    /// Row limit applied when a query leaves it unset (default: 500).
    pub default_limit: u64,
}

/// Result pagination configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Rows requested per page (default: 500).
    pub page_size: u64,
    /// Upper bound for any page request (default: 5000).
    pub max_page_size: u64,
}

/// Target warehouse configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Warehouse type (default: postgres).
    pub adapter: AdapterType,
    /// First day of the week for week truncation; warehouse default when unset.
    pub start_of_week: Option<WeekDay>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_limit: 5_000,
            default_limit: 500,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 500,
            max_page_size: 5_000,
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            adapter: AdapterType::Postgres,
            start_of_week: None,
        }
    }
}

impl WarehouseConfig {
    /// Dialect for the configured warehouse.
    pub fn dialect(&self) -> Box<dyn WarehouseDialect + Send + Sync> {
        let start = self.start_of_week;
        match self.adapter {
            AdapterType::BigQuery => Box::new(BigQueryDialect::default().with_start_of_week(start)),
            AdapterType::Databricks => {
                Box::new(DatabricksDialect::default().with_start_of_week(start))
            }
            AdapterType::Snowflake => {
                Box::new(SnowflakeDialect::default().with_start_of_week(start))
            }
            AdapterType::Redshift => {
                Box::new(PostgresDialect::redshift().with_start_of_week(start))
            }
            AdapterType::Postgres => {
                Box::new(PostgresDialect::default().with_start_of_week(start))
            }
            AdapterType::Trino => Box::new(TrinoDialect::default().with_start_of_week(start)),
            AdapterType::DuckDb => Box::new(DuckDbDialect::default().with_start_of_week(start)),
        }
    }
}

impl LumenConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| LumenError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(toml_str)
            .map_err(|e| LumenError::Config(format!("failed to parse config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `LUMEN_CONFIG` environment variable
    /// 2. `./lumen.toml` (current directory)
    /// 3. `~/.config/lumen/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("LUMEN_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from LUMEN_CONFIG");
                    return cfg;
                }
                Err(e) => tracing::warn!(path = %path, error = %e, "ignoring LUMEN_CONFIG"),
            }
        }

        if let Ok(cfg) = Self::from_file("lumen.toml") {
            tracing::info!("loaded config from ./lumen.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("lumen").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }

    fn validate(&self) -> Result<()> {
        if self.query.default_limit > self.query.max_limit {
            return Err(LumenError::Config(format!(
                "query.default_limit {} exceeds query.max_limit {}",
                self.query.default_limit, self.query.max_limit
            )));
        }
        let page_size = self.pagination.page_size;
        if page_size == 0 || page_size > self.pagination.max_page_size {
            return Err(LumenError::Config(format!(
                "pagination.page_size must be between 1 and {}",
                self.pagination.max_page_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = LumenConfig::default();
        assert_eq!(cfg.query.max_limit, 5_000);
        assert_eq!(cfg.query.default_limit, 500);
        assert_eq!(cfg.pagination.page_size, 500);
        assert_eq!(cfg.warehouse.adapter, AdapterType::Postgres);
        assert!(cfg.warehouse.start_of_week.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[query]
max_limit = 10000

[warehouse]
adapter = "bigquery"
start_of_week = "sunday"
"#;
        let cfg = LumenConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.query.max_limit, 10_000);
        assert_eq!(cfg.query.default_limit, 500);

        let dialect = cfg.warehouse.dialect();
        assert_eq!(dialect.adapter_type(), AdapterType::BigQuery);
        assert_eq!(dialect.start_of_week(), Some(WeekDay::Sunday));
    }

    #[test]
    fn test_rejects_inconsistent_limits() {
        let toml = r#"
[query]
max_limit = 100
default_limit = 500
"#;
        assert!(matches!(
            LumenConfig::from_toml(toml),
            Err(LumenError::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lumen.toml");
        std::fs::write(&path, "[pagination]\npage_size = 50\n").unwrap();
        let cfg = LumenConfig::from_file(&path).unwrap();
        assert_eq!(cfg.pagination.page_size, 50);
        assert!(LumenConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
