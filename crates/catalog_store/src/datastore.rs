//! Entry point for a catalog kept in a data directory: `catalog.json` next
//! to the default `catalog.sqlite` file.

use std::path::{Path, PathBuf};

use crate::{CatalogConfig, CatalogResult, CatalogStore};

const DEFAULT_DB_NAME: &str = "catalog.sqlite";

pub fn default_sqlite_path(base: &Path) -> PathBuf {
    base.join(DEFAULT_DB_NAME)
}

/// Reads `catalog.json` under `base`, writing a sqlite default first when
/// the directory has none. A config with unusable limits is an error.
pub fn load_or_init_config(base: &Path) -> CatalogResult<CatalogConfig> {
    CatalogConfig::load_or_init(base, &default_sqlite_path(base))
}

pub async fn open_store(base: &Path) -> CatalogResult<CatalogStore> {
    let config = load_or_init_config(base)?;
    let store = CatalogStore::connect(&config, base).await?;
    let limits = store.limits();
    log::info!(
        "catalog opened from {} ({}, page cap {}, batch {} rows)",
        base.display(),
        config.backend_name(),
        limits.max_page_size,
        limits.cursor_batch_rows
    );
    Ok(store)
}
