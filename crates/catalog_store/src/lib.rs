pub mod config;
pub mod cursor;
pub mod datastore;
mod db;
pub mod migration;
pub mod query;
pub mod store;

pub mod api {
    pub use aideon_catalog_core::api::*;
}

pub use aideon_catalog_core::*;
pub use config::{
    CatalogConfig, CatalogLimits, DatabaseConfig, IntegrityConfig, LimitsConfig, PoolConfig,
};
pub use cursor::{BatchedCursor, CountQuery, SqlRow};
pub use datastore::{default_sqlite_path, load_or_init_config, open_store};
pub use query::{ListFilter, ListPlan, RootKey, SortValue};
pub use store::CatalogStore;
