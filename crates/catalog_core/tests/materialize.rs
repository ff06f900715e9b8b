use aideon_catalog_core::memory::{Cell, MemoryCounter, MemoryRow, MemoryRowSource};
use aideon_catalog_core::{
    Audience, CatalogError, CatalogResult, ChainShape, EntityKind, Id, Materializer, Package,
    PaginationWindow, Portal, Server, fetch_page,
};

#[derive(Clone, Copy)]
struct Ent {
    id: Id,
    name: &'static str,
    public: bool,
    owner: Option<Id>,
    grant: Option<Id>,
}

impl Ent {
    fn public(name: &'static str) -> Self {
        Self {
            id: Id::new(),
            name,
            public: true,
            owner: None,
            grant: None,
        }
    }

    fn private(name: &'static str) -> Self {
        Self {
            public: false,
            ..Self::public(name)
        }
    }
}

/// Writes every column a level contributes to a join row.
fn put_level(
    mut row: MemoryRow,
    prefix: &str,
    kind: EntityKind,
    ent: Option<Ent>,
    links: &[(&str, Option<Id>)],
    file: Option<Id>,
    root: bool,
) -> MemoryRow {
    for field in kind.columns() {
        let name = format!("{prefix}_{field}");
        let cell = match (ent, *field) {
            (None, _) => Cell::Null,
            (Some(ent), "id") => Cell::Id(ent.id),
            (Some(ent), "name") => Cell::Str(ent.name.into()),
            (Some(ent), "public") => Cell::Bool(ent.public),
            (Some(ent), "owner_id") => ent.owner.map_or(Cell::Null, Cell::Id),
            (Some(_), "created_at") | (Some(_), "updated_at") => Cell::Int(1_700_000_000),
            (Some(_), other) => links
                .iter()
                .find(|(column, _)| *column == other)
                .and_then(|(_, id)| *id)
                .map_or(Cell::Null, Cell::Id),
        };
        row.set(name, cell);
    }
    row.set(
        format!("{prefix}_grant"),
        ent.and_then(|ent| ent.grant).map_or(Cell::Null, Cell::Id),
    );
    row.set(format!("{prefix}_f_id"), file.map_or(Cell::Null, Cell::Id));
    row = row.with_nulls(
        &format!("{prefix}_f"),
        &[
            "file_type",
            "mime_type",
            "size",
            "url",
            "original_path",
            "hash",
            "platform",
            "deployment",
            "created_at",
        ],
    );
    if root {
        let owner = ent.and_then(|ent| ent.owner);
        row.set(format!("{prefix}_o_id"), owner.map_or(Cell::Null, Cell::Id));
        row.set(
            format!("{prefix}_o_username"),
            owner.map_or(Cell::Null, |_| Cell::Str("owner".into())),
        );
        row = row
            .with_nulls(&format!("{prefix}_o"), &["display_name"])
            .with_nulls(prefix, &["rating_positive", "rating_negative", "rating_own"]);
    }
    row
}

fn package_row(ent: Ent, file: Option<Id>) -> MemoryRow {
    put_level(MemoryRow::new(), "p", EntityKind::Package, Some(ent), &[], file, true)
}

fn portal_row(root: Ent, dest: Option<Ent>, world: Option<Ent>, package: Option<Ent>) -> MemoryRow {
    let row = put_level(
        MemoryRow::new(),
        "p",
        EntityKind::Portal,
        Some(root),
        &[("destination_id", dest.map(|d| d.id))],
        None,
        true,
    );
    let row = put_level(
        row,
        "d",
        EntityKind::Portal,
        dest,
        &[("world_id", world.map(|w| w.id))],
        None,
        false,
    );
    let row = put_level(
        row,
        "dw",
        EntityKind::World,
        world,
        &[("package_id", package.map(|p| p.id))],
        None,
        false,
    );
    put_level(row, "dwp", EntityKind::Package, package, &[], None, false)
}

fn server_row(root: Ent, world: Option<Ent>, package: Option<Ent>) -> MemoryRow {
    let row = put_level(
        MemoryRow::new(),
        "s",
        EntityKind::Server,
        Some(root),
        &[("world_id", world.map(|w| w.id))],
        None,
        true,
    );
    let row = put_level(
        row,
        "sw",
        EntityKind::World,
        world,
        &[("package_id", package.map(|p| p.id))],
        None,
        false,
    );
    put_level(row, "swp", EntityKind::Package, package, &[], None, false)
}

/// Roots A (3 rows, files f1 f2 f1) and B (2 rows, file f3 twice).
fn two_root_stream() -> (Ent, Ent, Vec<MemoryRow>) {
    let a = Ent::public("alpha");
    let b = Ent::public("beta");
    let (f1, f2, f3) = (Id::new(), Id::new(), Id::new());
    let rows = vec![
        package_row(a, Some(f1)),
        package_row(a, Some(f2)),
        package_row(a, Some(f1)),
        package_row(b, Some(f3)),
        package_row(b, Some(f3)),
    ];
    (a, b, rows)
}

async fn packages(
    rows: Vec<MemoryRow>,
    audience: Audience,
    offset: u64,
    limit: u64,
) -> CatalogResult<Vec<Package>> {
    let materializer = Materializer::new(ChainShape::Package, audience);
    let source = MemoryRowSource::new(rows);
    Ok(materializer
        .materialize::<Package, _>(source, PaginationWindow::new(offset, limit))
        .await?
        .items)
}

#[tokio::test]
async fn windows_over_distinct_roots() -> CatalogResult<()> {
    let (a, b, rows) = two_root_stream();

    let first = packages(rows.clone(), Audience::Anonymous, 0, 1).await?;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, a.id);
    assert_eq!(first[0].files.len(), 2);

    let second = packages(rows.clone(), Audience::Anonymous, 1, 1).await?;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, b.id);
    assert_eq!(second[0].files.len(), 1);

    let third = packages(rows, Audience::Anonymous, 2, 1).await?;
    assert!(third.is_empty());
    Ok(())
}

#[tokio::test]
async fn returns_roots_at_window_positions() -> CatalogResult<()> {
    let ents: Vec<Ent> = (0..7).map(|_| Ent::public("pkg")).collect();
    let rows: Vec<MemoryRow> = ents
        .iter()
        .flat_map(|ent| [package_row(*ent, Some(Id::new())), package_row(*ent, None)])
        .collect();
    for offset in 0..9u64 {
        for limit in 0..9u64 {
            let items = packages(rows.clone(), Audience::Anonymous, offset, limit).await?;
            let start = (offset as usize).min(ents.len());
            let end = (start + limit as usize).min(ents.len());
            let expected: Vec<Id> = ents[start..end].iter().map(|ent| ent.id).collect();
            let got: Vec<Id> = items.iter().map(|item| item.id).collect();
            assert_eq!(got, expected, "offset {offset} limit {limit}");
        }
    }
    Ok(())
}

#[tokio::test]
async fn files_are_unique_per_root() -> CatalogResult<()> {
    let ent = Ent::public("dup");
    let file = Id::new();
    let rows = vec![package_row(ent, Some(file)); 6];
    let items = packages(rows, Audience::Anonymous, 0, 10).await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].files.len(), 1);
    assert_eq!(items[0].files[0].id, file);
    Ok(())
}

#[tokio::test]
async fn rematerializing_is_deterministic() -> CatalogResult<()> {
    let (_, _, rows) = two_root_stream();
    let first = packages(rows.clone(), Audience::Anonymous, 0, 10).await?;
    let second = packages(rows, Audience::Anonymous, 0, 10).await?;
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn early_stop_releases_cursor_once() -> CatalogResult<()> {
    let (_, _, rows) = two_root_stream();
    let materializer = Materializer::new(ChainShape::Package, Audience::Anonymous);
    let source = MemoryRowSource::new(rows);
    let stats = source.stats();
    let result = materializer
        .materialize::<Package, _>(source, PaginationWindow::new(0, 1))
        .await?;
    assert_eq!(result.items.len(), 1);
    // The first row of B completes A; nothing after it is read.
    assert_eq!(stats.rows_read(), 4);
    assert_eq!(stats.closes(), 1);
    Ok(())
}

#[tokio::test]
async fn full_window_reads_no_rows() -> CatalogResult<()> {
    let (_, _, rows) = two_root_stream();
    let materializer = Materializer::new(ChainShape::Package, Audience::Anonymous);
    let source = MemoryRowSource::new(rows);
    let stats = source.stats();
    let result = materializer
        .materialize::<Package, _>(source, PaginationWindow::new(0, 0))
        .await?;
    assert!(result.items.is_empty());
    assert_eq!(stats.rows_read(), 0);
    assert_eq!(stats.closes(), 1);
    Ok(())
}

#[tokio::test]
async fn empty_window_past_offset_reads_no_rows() -> CatalogResult<()> {
    let (_, _, rows) = two_root_stream();
    let materializer = Materializer::new(ChainShape::Package, Audience::Anonymous);
    let source = MemoryRowSource::new(rows);
    let stats = source.stats();
    let result = materializer
        .materialize::<Package, _>(source, PaginationWindow::new(1, 0))
        .await?;
    assert!(result.items.is_empty());
    assert_eq!(stats.rows_read(), 0);
    assert_eq!(stats.closes(), 1);
    Ok(())
}

#[tokio::test]
async fn skipped_roots_do_not_end_the_pass() -> CatalogResult<()> {
    let (_, b, rows) = two_root_stream();
    let materializer = Materializer::new(ChainShape::Package, Audience::Anonymous);
    let source = MemoryRowSource::new(rows);
    let stats = source.stats();
    let result = materializer
        .materialize::<Package, _>(source, PaginationWindow::new(1, 5))
        .await?;
    let ids: Vec<Id> = result.items.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![b.id]);
    assert_eq!(stats.rows_read(), 5);
    assert_eq!(stats.closes(), 1);
    Ok(())
}

#[tokio::test]
async fn decode_error_aborts_and_releases() {
    let (_, _, mut rows) = two_root_stream();
    rows[3].set("p_name", Cell::Int(12));
    let materializer = Materializer::new(ChainShape::Package, Audience::Anonymous);
    let source = MemoryRowSource::new(rows);
    let stats = source.stats();
    let result = materializer
        .materialize::<Package, _>(source, PaginationWindow::new(0, 10))
        .await;
    let err = result.expect_err("decode failure");
    assert!(matches!(err, CatalogError::Decode { .. }));
    assert!(err.is_fatal_read());
    assert_eq!(stats.closes(), 1);
}

#[tokio::test]
async fn source_error_surfaces_without_partial_results() {
    let (_, _, rows) = two_root_stream();
    let materializer = Materializer::new(ChainShape::Package, Audience::Anonymous);
    let source = MemoryRowSource::new(rows).failing_after(4);
    let stats = source.stats();
    let result = materializer
        .materialize::<Package, _>(source, PaginationWindow::new(1, 10))
        .await;
    assert!(matches!(result, Err(CatalogError::Source { .. })));
    assert_eq!(stats.closes(), 1);
}

#[tokio::test]
async fn private_roots_follow_audience() -> CatalogResult<()> {
    let me = Id::new();
    let mine = Ent {
        owner: Some(me),
        ..Ent::private("mine")
    };
    let shared = Ent {
        grant: Some(me),
        ..Ent::private("shared")
    };
    let hidden = Ent::private("hidden");
    let rows = vec![
        package_row(mine, None),
        package_row(shared, None),
        package_row(hidden, None),
    ];

    let anonymous = packages(rows.clone(), Audience::Anonymous, 0, 10).await?;
    assert!(anonymous.is_empty());

    let principal = packages(rows.clone(), Audience::Principal(me), 0, 10).await?;
    let ids: Vec<Id> = principal.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![mine.id, shared.id]);
    assert_eq!(principal[0].owner.as_ref().map(|o| o.id), Some(me));

    let admin = packages(rows, Audience::Admin, 0, 10).await?;
    assert_eq!(admin.len(), 3);
    Ok(())
}

#[tokio::test]
async fn portal_chain_is_visible_only_when_every_link_is() -> CatalogResult<()> {
    let links = || {
        (
            Ent::public("root"),
            Ent::public("dest"),
            Ent::public("world"),
            Ent::public("package"),
        )
    };

    let (root, dest, world, package) = links();
    let materializer = Materializer::new(ChainShape::PortalDestination, Audience::Anonymous);
    let visible = materializer
        .materialize::<Portal, _>(
            MemoryRowSource::new(vec![portal_row(root, Some(dest), Some(world), Some(package))]),
            PaginationWindow::unbounded(),
        )
        .await?;
    assert_eq!(visible.items.len(), 1);
    let destination = visible.items[0].destination.as_deref().expect("destination");
    assert_eq!(destination.id, dest.id);
    let dest_world = destination.world.as_deref().expect("world");
    assert_eq!(dest_world.id, world.id);
    assert_eq!(dest_world.package.as_deref().map(|p| p.id), Some(package.id));

    for hidden in 0..4 {
        let (mut root, mut dest, mut world, mut package) = links();
        match hidden {
            0 => root.public = false,
            1 => dest.public = false,
            2 => world.public = false,
            _ => package.public = false,
        }
        let result = materializer
            .materialize::<Portal, _>(
                MemoryRowSource::new(vec![portal_row(
                    root,
                    Some(dest),
                    Some(world),
                    Some(package),
                )]),
                PaginationWindow::unbounded(),
            )
            .await?;
        assert!(result.items.is_empty(), "link {hidden} hidden");
    }
    Ok(())
}

#[tokio::test]
async fn absent_links_do_not_hide_the_root() -> CatalogResult<()> {
    let root = Ent::public("lonely");
    let materializer = Materializer::new(ChainShape::PortalDestination, Audience::Anonymous);
    let result = materializer
        .materialize::<Portal, _>(
            MemoryRowSource::new(vec![portal_row(root, None, None, None)]),
            PaginationWindow::unbounded(),
        )
        .await?;
    assert_eq!(result.items.len(), 1);
    assert!(result.items[0].destination.is_none());
    assert!(result.anomalies.is_empty());
    Ok(())
}

#[tokio::test]
async fn hidden_server_world_is_pruned_not_fatal() -> CatalogResult<()> {
    let server = Ent::public("server");
    let world = Ent::private("world");
    let package = Ent::public("package");
    let materializer = Materializer::new(ChainShape::ServerWorld, Audience::Anonymous);
    let result = materializer
        .materialize::<Server, _>(
            MemoryRowSource::new(vec![server_row(server, Some(world), Some(package))]),
            PaginationWindow::unbounded(),
        )
        .await?;
    assert_eq!(result.items.len(), 1);
    assert!(result.items[0].world.is_none());
    Ok(())
}

#[tokio::test]
async fn orphaned_nested_id_is_reported_and_skipped() -> CatalogResult<()> {
    let root = Ent::public("root");
    let world = Ent::public("world");
    let package = Ent::public("package");
    // The destination id is null but its world and package ids are not.
    let row = portal_row(root, None, Some(world), Some(package));
    let materializer = Materializer::new(ChainShape::PortalDestination, Audience::Anonymous)
        .log_anomalies(false);
    let result = materializer
        .materialize::<Portal, _>(
            MemoryRowSource::new(vec![row.clone(), row]),
            PaginationWindow::unbounded(),
        )
        .await?;
    assert_eq!(result.items.len(), 1);
    assert!(result.items[0].destination.is_none());
    assert_eq!(result.anomalies.len(), 1);
    assert_eq!(result.anomalies[0].root_id, root.id);
    assert_eq!(result.anomalies[0].missing_ancestor, "d");
    Ok(())
}

#[tokio::test]
async fn page_total_matches_unbounded_window() -> CatalogResult<()> {
    let visible: Vec<Ent> = (0..5).map(|_| Ent::public("shown")).collect();
    let rows: Vec<MemoryRow> = visible
        .iter()
        .flat_map(|ent| [package_row(*ent, Some(Id::new())), package_row(*ent, Some(Id::new()))])
        .collect();
    let materializer = Materializer::new(ChainShape::Package, Audience::Anonymous);
    let counter = MemoryCounter::from_rows(&rows, "p_id")?;
    let page = fetch_page::<Package, _, _>(
        &materializer,
        MemoryRowSource::new(rows.clone()),
        &counter,
        PaginationWindow::new(2, 2),
    )
    .await?;
    let everything = materializer
        .materialize::<Package, _>(MemoryRowSource::new(rows), PaginationWindow::unbounded())
        .await?;
    assert_eq!(page.total, everything.items.len() as u64);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.page_count(), 3);
    assert!(page.has_more());
    Ok(())
}
