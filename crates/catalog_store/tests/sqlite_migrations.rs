use std::collections::HashSet;

use aideon_catalog_store::{CatalogConfig, CatalogResult, CatalogStore};
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use tempfile::tempdir;

async fn list_tables(store: &CatalogStore) -> CatalogResult<HashSet<String>> {
    let rows = store
        .connection()
        .query_all_raw(Statement::from_string(
            DatabaseBackend::Sqlite,
            "SELECT name FROM sqlite_master WHERE type = 'table'",
        ))
        .await
        .map_err(aideon_catalog_store::CatalogError::from)?;
    let mut tables = HashSet::new();
    for row in rows {
        let name: String = row
            .try_get("", "name")
            .map_err(aideon_catalog_store::CatalogError::from)?;
        tables.insert(name);
    }
    Ok(tables)
}

#[tokio::test]
async fn sqlite_migrations_create_catalog_tables() -> CatalogResult<()> {
    let dir = tempdir().expect("tempdir");
    let base = dir.path();
    let config = CatalogConfig::default_sqlite(base.join("catalog.sqlite").to_string_lossy());
    let store = CatalogStore::connect(&config, base).await?;
    let tables = list_tables(&store).await?;
    for table in [
        "catalog_users",
        "catalog_packages",
        "catalog_worlds",
        "catalog_portals",
        "catalog_servers",
        "catalog_files",
        "catalog_grants",
        "catalog_ratings",
        "catalog_rating_totals",
    ] {
        assert!(tables.contains(table), "expected table '{table}' to exist");
    }
    // Idempotency check.
    let _store = CatalogStore::connect(&config, base).await?;
    Ok(())
}
