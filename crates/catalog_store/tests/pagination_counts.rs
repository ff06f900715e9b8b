use std::collections::HashSet;

use aideon_catalog_store::{
    Audience, BatchedCursor, CatalogConfig, CatalogReadApi, CatalogResult, CatalogStore,
    CatalogWriteApi, ChainShape, EntityKind, Id, LimitsConfig, ListFilter, ListInput, ListPlan,
    Materializer, NewFile, NewPackage, Package, PaginationWindow, RowSource, SortKey, SqlRow,
};
use async_trait::async_trait;
use tempfile::{TempDir, tempdir};

async fn open_small_batches(dir: &TempDir) -> CatalogResult<CatalogStore> {
    let base = dir.path();
    let mut config = CatalogConfig::default_sqlite(base.join("paging.sqlite").to_string_lossy());
    config.limits = Some(LimitsConfig {
        max_page_size: Some(3),
        cursor_batch_rows: Some(2),
        max_query_len: Some(64),
    });
    CatalogStore::connect(&config, base).await
}

async fn package_with_files(
    store: &CatalogStore,
    name: &str,
    files: usize,
) -> CatalogResult<Id> {
    let id = store
        .create_package(NewPackage {
            name: name.to_string(),
            public: true,
            ..NewPackage::default()
        })
        .await?;
    for variant in 0..files {
        store
            .add_file(
                EntityKind::Package,
                id,
                NewFile {
                    url: Some(format!("https://cdn.example/{name}/{variant}")),
                    ..NewFile::default()
                },
            )
            .await?;
    }
    Ok(id)
}

enum Concurrent {
    Insert(&'static str),
    Delete(Id),
}

/// Store cursor that performs writes once a given number of rows were read.
struct WritingCursor {
    inner: BatchedCursor,
    store: CatalogStore,
    after_rows: usize,
    rows: usize,
    writes: Vec<Concurrent>,
}

impl WritingCursor {
    fn new(
        store: &CatalogStore,
        input: &ListInput,
        batch_rows: u64,
        after_rows: usize,
        writes: Vec<Concurrent>,
    ) -> Self {
        let plan = ListPlan::new(
            store.backend(),
            ChainShape::Package,
            ListFilter::from_list(input),
        );
        Self {
            inner: BatchedCursor::new(store.connection().clone(), plan, batch_rows),
            store: store.clone(),
            after_rows,
            rows: 0,
            writes,
        }
    }
}

#[async_trait]
impl RowSource for WritingCursor {
    type Row = SqlRow;

    async fn next_row(&mut self) -> CatalogResult<Option<SqlRow>> {
        if self.rows == self.after_rows {
            for write in std::mem::take(&mut self.writes) {
                match write {
                    Concurrent::Insert(name) => {
                        package_with_files(&self.store, name, 2).await?;
                    }
                    Concurrent::Delete(id) => {
                        self.store.delete_entity(EntityKind::Package, id).await?;
                    }
                }
            }
        }
        self.rows += 1;
        self.inner.next_row().await
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

async fn materialize_all(
    cursor: WritingCursor,
    audience: Audience,
) -> CatalogResult<Vec<Package>> {
    let materialized = Materializer::new(ChainShape::Package, audience)
        .materialize::<Package, _>(cursor, PaginationWindow::unbounded())
        .await?;
    Ok(materialized.items)
}

async fn seed(store: &CatalogStore, count: usize, files_each: usize) -> CatalogResult<()> {
    for index in 0..count {
        let id = store
            .create_package(NewPackage {
                name: format!("pkg-{index:02}"),
                public: index % 4 != 3,
                ..NewPackage::default()
            })
            .await?;
        for variant in 0..files_each {
            store
                .add_file(
                    EntityKind::Package,
                    id,
                    NewFile {
                        url: Some(format!("https://cdn.example/{index}/{variant}")),
                        ..NewFile::default()
                    },
                )
                .await?;
        }
    }
    Ok(())
}

fn window(offset: u32, limit: u32) -> ListInput {
    ListInput::new(Audience::Anonymous, offset, limit).with_sort(SortKey::Name)
}

#[tokio::test]
async fn pages_cover_distinct_roots_despite_file_fanout() -> CatalogResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open_small_batches(&dir).await?;
    // pkg-03 and pkg-07 are private, leaving 7 visible roots.
    seed(&store, 9, 3).await?;

    let mut seen = Vec::new();
    for offset in [0, 3, 6] {
        let page = store.list_packages(window(offset, 3)).await?;
        assert_eq!(page.total, 7);
        for item in &page.items {
            assert_eq!(item.files.len(), 3, "{}", item.name);
        }
        seen.extend(page.items.into_iter().map(|p| p.name));
    }
    assert_eq!(
        seen,
        vec!["pkg-00", "pkg-01", "pkg-02", "pkg-04", "pkg-05", "pkg-06", "pkg-08"]
    );
    let unique: HashSet<_> = seen.iter().collect();
    assert_eq!(unique.len(), seen.len());
    Ok(())
}

#[tokio::test]
async fn page_size_is_clamped_and_total_ignores_window() -> CatalogResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open_small_batches(&dir).await?;
    seed(&store, 8, 1).await?;

    let page = store.list_packages(window(1, 50)).await?;
    assert_eq!(page.limit, 3);
    assert_eq!(page.offset, 1);
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total, 6);
    assert!(page.has_more());
    assert_eq!(page.page_count(), 2);
    assert_eq!(store.count_packages(&window(0, 1)).await?, 6);
    Ok(())
}

#[tokio::test]
async fn offset_past_end_returns_empty_page_with_total() -> CatalogResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open_small_batches(&dir).await?;
    seed(&store, 3, 2).await?;

    let page = store.list_packages(window(10, 3)).await?;
    assert!(page.items.is_empty());
    assert_eq!(page.total, 3);
    assert!(!page.has_more());

    let zero = store.list_packages(window(0, 0)).await?;
    assert!(zero.items.is_empty());
    assert_eq!(zero.total, 3);
    Ok(())
}

#[tokio::test]
async fn admin_count_includes_private_roots() -> CatalogResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open_small_batches(&dir).await?;
    seed(&store, 8, 2).await?;

    let admin = ListInput::new(Audience::Admin, 0, 3);
    assert_eq!(store.count_packages(&admin).await?, 8);
    let anonymous = ListInput::new(Audience::Anonymous, 0, 3);
    assert_eq!(store.count_packages(&anonymous).await?, 6);
    Ok(())
}

#[tokio::test]
async fn insert_between_batches_never_repeats_a_root() -> CatalogResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open_small_batches(&dir).await?;
    package_with_files(&store, "a", 2).await?;
    package_with_files(&store, "b", 2).await?;

    let input = ListInput::new(Audience::Anonymous, 0, 10);
    let cursor = WritingCursor::new(&store, &input, 1, 2, vec![Concurrent::Insert("c")]);
    let items = materialize_all(cursor, Audience::Anonymous).await?;

    let names: Vec<_> = items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["b", "a"]);
    let ids: HashSet<_> = items.iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), items.len());
    for item in &items {
        assert_eq!(item.files.len(), 2, "{}", item.name);
    }
    Ok(())
}

#[tokio::test]
async fn writes_between_batches_keep_unread_roots_whole() -> CatalogResult<()> {
    let dir = tempdir().expect("tempdir");
    let store = open_small_batches(&dir).await?;
    let first = package_with_files(&store, "pkg-00", 2).await?;
    package_with_files(&store, "pkg-01", 2).await?;
    package_with_files(&store, "pkg-02", 3).await?;

    let input = ListInput::new(Audience::Anonymous, 0, 10).with_sort(SortKey::Name);
    let writes = vec![Concurrent::Delete(first), Concurrent::Insert("pkg-99")];
    let cursor = WritingCursor::new(&store, &input, 3, 2, writes);
    let items = materialize_all(cursor, Audience::Anonymous).await?;

    let names: Vec<_> = items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["pkg-00", "pkg-01", "pkg-02", "pkg-99"]);
    let files: Vec<_> = items.iter().map(|p| p.files.len()).collect();
    assert_eq!(files, vec![2, 2, 3, 2]);
    let ids: HashSet<_> = items.iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), items.len());
    Ok(())
}
