use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use aideon_catalog_core::{CatalogError, CatalogResult};

const DEFAULT_CONFIG_NAME: &str = "catalog.json";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Sqlite { path: Option<String> },
    Postgres { url: String },
    Mysql { url: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub connect_timeout_ms: Option<u64>,
    pub acquire_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
}

/// Caps applied to catalog reads. Missing fields fall back to
/// [`LimitsConfig::with_defaults`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest number of roots a single list page may return; a larger
    /// requested limit is clamped, never rejected.
    pub max_page_size: Option<u32>,
    /// Joined rows the list cursor asks for per statement. A root whose
    /// rows outnumber this is fetched on its own.
    pub cursor_batch_rows: Option<u64>,
    /// Longest search text, in characters, accepted by list filters.
    pub max_query_len: Option<usize>,
}

impl LimitsConfig {
    pub fn with_defaults() -> Self {
        Self {
            max_page_size: Some(100),
            cursor_batch_rows: Some(256),
            max_query_len: Some(256),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntegrityConfig {
    /// Emit a warning for each nested id that points at a missing row.
    /// Anomalies are still returned to the caller when this is off.
    pub log_anomalies: Option<bool>,
}

/// Limits after defaults are filled in and zero values rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatalogLimits {
    pub max_page_size: u32,
    pub cursor_batch_rows: u64,
    pub max_query_len: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub database: DatabaseConfig,
    pub pool: Option<PoolConfig>,
    pub limits: Option<LimitsConfig>,
    pub integrity: Option<IntegrityConfig>,
}

impl CatalogConfig {
    pub fn default_sqlite(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::Sqlite {
                path: Some(path.into()),
            },
            pool: None,
            limits: Some(LimitsConfig::with_defaults()),
            integrity: Some(IntegrityConfig {
                log_anomalies: Some(true),
            }),
        }
    }

    pub fn load_or_init(base_dir: &Path, default_sqlite_path: &Path) -> CatalogResult<Self> {
        fs::create_dir_all(base_dir)
            .map_err(|err| CatalogError::storage(format!("create config dir: {err}")))?;
        let config_path = base_dir.join(DEFAULT_CONFIG_NAME);
        if config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .map_err(|err| CatalogError::storage(format!("read config: {err}")))?;
            let config: CatalogConfig =
                serde_json::from_str(&raw).map_err(|err| CatalogError::invalid(err.to_string()))?;
            config.validate()?;
            log::debug!(
                "loaded catalog config from {} ({})",
                config_path.display(),
                config.backend_name()
            );
            return Ok(config);
        }
        let default = CatalogConfig::default_sqlite(default_sqlite_path.to_string_lossy());
        let payload = serde_json::to_string_pretty(&default)
            .map_err(|err| CatalogError::storage(format!("serialize config: {err}")))?;
        fs::write(&config_path, payload)
            .map_err(|err| CatalogError::storage(format!("write config: {err}")))?;
        log::info!("wrote default catalog config to {}", config_path.display());
        Ok(default)
    }

    /// Rejects settings the catalog cannot serve with.
    pub fn validate(&self) -> CatalogResult<()> {
        match &self.database {
            DatabaseConfig::Postgres { url } if !url.starts_with("postgres") => {
                return Err(CatalogError::invalid("postgres backend needs a postgres:// url"));
            }
            DatabaseConfig::Mysql { url } if !url.starts_with("mysql://") => {
                return Err(CatalogError::invalid("mysql backend needs a mysql:// url"));
            }
            _ => {}
        }
        if let Some(pool) = &self.pool
            && let (Some(min), Some(max)) = (pool.min_connections, pool.max_connections)
            && min > max
        {
            return Err(CatalogError::invalid(format!(
                "pool min_connections {min} exceeds max_connections {max}"
            )));
        }
        self.resolved_limits().map(|_| ())
    }

    pub fn resolved_limits(&self) -> CatalogResult<CatalogLimits> {
        let defaults = LimitsConfig::with_defaults();
        let limits = self.limits.as_ref().unwrap_or(&defaults);
        let resolved = CatalogLimits {
            max_page_size: limits
                .max_page_size
                .or(defaults.max_page_size)
                .unwrap_or(100),
            cursor_batch_rows: limits
                .cursor_batch_rows
                .or(defaults.cursor_batch_rows)
                .unwrap_or(256),
            max_query_len: limits
                .max_query_len
                .or(defaults.max_query_len)
                .unwrap_or(256),
        };
        if resolved.max_page_size == 0 {
            return Err(CatalogError::invalid("limits.max_page_size must be positive"));
        }
        if resolved.cursor_batch_rows == 0 {
            return Err(CatalogError::invalid("limits.cursor_batch_rows must be positive"));
        }
        if resolved.max_query_len == 0 {
            return Err(CatalogError::invalid("limits.max_query_len must be positive"));
        }
        Ok(resolved)
    }

    pub fn log_anomalies(&self) -> bool {
        self.integrity
            .as_ref()
            .and_then(|integrity| integrity.log_anomalies)
            .unwrap_or(true)
    }

    pub fn sqlite_path(&self, base_dir: &Path) -> CatalogResult<PathBuf> {
        match &self.database {
            DatabaseConfig::Sqlite { path } => {
                let path = path.clone().unwrap_or_else(|| "catalog.sqlite".to_string());
                let candidate = PathBuf::from(path);
                if candidate.is_absolute() {
                    Ok(candidate)
                } else {
                    Ok(base_dir.join(candidate))
                }
            }
            _ => Err(CatalogError::invalid("config is not sqlite backend")),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.database {
            DatabaseConfig::Sqlite { .. } => "sqlite",
            DatabaseConfig::Postgres { .. } => "postgres",
            DatabaseConfig::Mysql { .. } => "mysql",
        }
    }

    pub fn connection_url(&self, base_dir: &Path) -> CatalogResult<String> {
        match &self.database {
            DatabaseConfig::Sqlite { .. } => {
                let path = self.sqlite_path(base_dir)?;
                Ok(format!("sqlite://{}?mode=rwc", path.display()))
            }
            DatabaseConfig::Postgres { url } | DatabaseConfig::Mysql { url } => Ok(url.clone()),
        }
    }
}
