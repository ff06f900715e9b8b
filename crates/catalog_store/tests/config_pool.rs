use aideon_catalog_store::{CatalogConfig, DatabaseConfig};
use serde_json::json;

#[test]
fn deserializes_pool_and_limit_settings() {
    let payload = json!({
        "database": { "backend": "sqlite", "path": "data.sqlite" },
        "pool": {
            "max_connections": 20,
            "min_connections": 2,
            "connect_timeout_ms": 1000,
            "acquire_timeout_ms": 500,
            "idle_timeout_ms": 60000
        },
        "limits": {
            "max_page_size": 25,
            "cursor_batch_rows": 64,
            "max_query_len": 80
        }
    });
    let config: CatalogConfig = serde_json::from_value(payload).expect("config");
    match config.database {
        DatabaseConfig::Sqlite { path } => {
            assert_eq!(path.as_deref(), Some("data.sqlite"));
        }
        _ => panic!("expected sqlite backend"),
    }
    let pool = config.pool.expect("pool");
    assert_eq!(pool.max_connections, Some(20));
    assert_eq!(pool.min_connections, Some(2));
    assert_eq!(pool.connect_timeout_ms, Some(1000));
    assert_eq!(pool.acquire_timeout_ms, Some(500));
    assert_eq!(pool.idle_timeout_ms, Some(60000));
    let limits = config.limits.expect("limits");
    assert_eq!(limits.max_page_size, Some(25));
    assert_eq!(limits.cursor_batch_rows, Some(64));
    assert_eq!(limits.max_query_len, Some(80));
    assert!(config.integrity.is_none());
}

#[test]
fn postgres_config_uses_url_verbatim() {
    let payload = json!({
        "database": { "backend": "postgres", "url": "postgres://catalog@localhost/catalog" }
    });
    let config: CatalogConfig = serde_json::from_value(payload).expect("config");
    assert_eq!(config.backend_name(), "postgres");
    let url = config
        .connection_url(std::path::Path::new("/unused"))
        .expect("url");
    assert_eq!(url, "postgres://catalog@localhost/catalog");
    assert!(config.sqlite_path(std::path::Path::new("/unused")).is_err());
}
