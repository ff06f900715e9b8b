use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sea_orm::sea_query::{
    Alias, Expr, ExprTrait, MysqlQueryBuilder, OnConflict, PostgresQueryBuilder, Query,
    QueryStatementWriter, SqliteQueryBuilder, Value as SeaValue,
};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, QueryResult,
    Statement, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use aideon_catalog_core::{
    Audience, CatalogError, CatalogReadApi, CatalogResult, CatalogWriteApi, ChainShape, EntityKind,
    GetInput, Id, ListInput, Materializer, NewFile, NewPackage, NewPortal, NewServer, NewUser,
    NewWorld, Node, Package, Page, PaginationWindow, Portal, RootCounter, Server, World,
    fetch_page,
};

use crate::cursor::{BatchedCursor, CountQuery};
use crate::db::*;
use crate::migration::Migrator;
use crate::query::{ListFilter, ListPlan, normalize_index_text};
use crate::{CatalogConfig, CatalogLimits};

#[derive(Clone)]
pub struct CatalogStore {
    conn: DatabaseConnection,
    backend: DatabaseBackend,
    limits: CatalogLimits,
    log_anomalies: bool,
    clock: Arc<AtomicI64>,
}

impl CatalogStore {
    pub async fn connect(config: &CatalogConfig, base_dir: &Path) -> CatalogResult<Self> {
        config.validate()?;
        let limits = config.resolved_limits()?;
        let url = config.connection_url(base_dir)?;
        let mut options = ConnectOptions::new(url);
        if let Some(pool) = &config.pool {
            if let Some(max) = pool.max_connections {
                options.max_connections(max);
            }
            if let Some(min) = pool.min_connections {
                options.min_connections(min);
            }
            if let Some(timeout_ms) = pool.connect_timeout_ms {
                options.connect_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.acquire_timeout_ms {
                options.acquire_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.idle_timeout_ms {
                options.idle_timeout(Duration::from_millis(timeout_ms));
            }
        }
        options.sqlx_logging(false);
        let conn = Database::connect(options).await.map_err(CatalogError::from)?;
        let backend = conn.get_database_backend();
        let store = Self {
            conn,
            backend,
            limits,
            log_anomalies: config.log_anomalies(),
            clock: Arc::new(AtomicI64::new(0)),
        };
        Migrator::up(&store.conn, None)
            .await
            .map_err(CatalogError::from)?;
        log::debug!("catalog store connected ({})", config.backend_name());
        Ok(store)
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    pub fn limits(&self) -> CatalogLimits {
        self.limits
    }

    /// Wall-clock millis, bumped so successive writes never share a timestamp.
    fn next_timestamp(&self) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0);
        let mut last = self.clock.load(Ordering::SeqCst);
        loop {
            let next = Ord::max(now, last + 1);
            match self
                .clock
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }

    fn plan(&self, kind: EntityKind, filter: ListFilter) -> ListPlan {
        ListPlan::new(self.backend, ChainShape::for_kind(kind), filter)
    }

    fn materializer(&self, plan: &ListPlan, audience: Audience) -> Materializer {
        Materializer::new(plan.shape(), audience).log_anomalies(self.log_anomalies)
    }

    async fn list_roots<N: Node>(&self, input: ListInput) -> CatalogResult<Page<N>> {
        let kind = N::KIND;
        input.validate(kind, self.limits.max_query_len)?;
        let plan = self.plan(kind, ListFilter::from_list(&input));
        let limit = Ord::min(input.limit, self.limits.max_page_size);
        let counter = CountQuery::new(self.conn.clone(), plan.count());
        let materializer = self.materializer(&plan, input.audience);
        let source = BatchedCursor::new(self.conn.clone(), plan, self.limits.cursor_batch_rows);
        fetch_page::<N, _, _>(
            &materializer,
            source,
            &counter,
            PaginationWindow::new(u64::from(input.offset), u64::from(limit)),
        )
        .await
        .map_err(|err| retrieval_failure("list", kind, err))
    }

    async fn count_roots(&self, kind: EntityKind, input: &ListInput) -> CatalogResult<u64> {
        input.validate(kind, self.limits.max_query_len)?;
        let plan = self.plan(kind, ListFilter::from_list(input));
        CountQuery::new(self.conn.clone(), plan.count())
            .count_roots()
            .await
            .map_err(|err| retrieval_failure("count", kind, err))
    }

    async fn get_root<N: Node>(&self, input: GetInput) -> CatalogResult<N> {
        let kind = N::KIND;
        let plan = self.plan(kind, ListFilter::by_id(&input));
        let materializer = self.materializer(&plan, input.audience);
        let source = BatchedCursor::new(self.conn.clone(), plan, self.limits.cursor_batch_rows);
        let materialized = materializer
            .materialize::<N, _>(source, PaginationWindow::new(0, 1))
            .await
            .map_err(|err| retrieval_failure("get", kind, err))?;
        materialized
            .items
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::not_found(format!("{} {}", kind.as_str(), input.id)))
    }

    async fn ensure_exists<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: EntityKind,
        id: Id,
    ) -> CatalogResult<()> {
        let select = Query::select()
            .from(entity_table(kind))
            .column(Alias::new("id"))
            .and_where(Expr::col(Alias::new("id")).eq(id_value(self.backend, id)))
            .limit(1)
            .to_owned();
        if query_one(conn, &select).await?.is_none() {
            return Err(CatalogError::not_found(format!("{} {id}", kind.as_str())));
        }
        Ok(())
    }

    async fn ensure_user<C: ConnectionTrait>(&self, conn: &C, id: Id) -> CatalogResult<()> {
        let select = Query::select()
            .from(CatalogUsers::Table)
            .column(CatalogUsers::Id)
            .and_where(Expr::col(CatalogUsers::Id).eq(id_value(self.backend, id)))
            .limit(1)
            .to_owned();
        if query_one(conn, &select).await?.is_none() {
            return Err(CatalogError::not_found(format!("user {id}")));
        }
        Ok(())
    }

    async fn ensure_opt_user(&self, id: Option<Id>) -> CatalogResult<()> {
        match id {
            Some(id) => self.ensure_user(&self.conn, id).await,
            None => Ok(()),
        }
    }

    async fn ensure_opt<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: EntityKind,
        id: Option<Id>,
    ) -> CatalogResult<()> {
        match id {
            Some(id) => self.ensure_exists(conn, kind, id).await,
            None => Ok(()),
        }
    }

    /// Rebuilds the vote sums of one entity from its individual votes.
    async fn refresh_rating_totals<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: EntityKind,
        entity_id: Id,
    ) -> CatalogResult<()> {
        let select = Query::select()
            .from(CatalogRatings::Table)
            .column(CatalogRatings::Value)
            .and_where(Expr::col(CatalogRatings::EntityKind).eq(kind.as_str()))
            .and_where(Expr::col(CatalogRatings::EntityId).eq(id_value(self.backend, entity_id)))
            .to_owned();
        let mut positive = 0i64;
        let mut negative = 0i64;
        for row in query_all(conn, &select).await? {
            let value: i64 = row.try_get("", &col_name(CatalogRatings::Value))?;
            if value > 0 {
                positive += value;
            } else {
                negative += value;
            }
        }
        let upsert = Query::insert()
            .into_table(CatalogRatingTotals::Table)
            .columns([
                CatalogRatingTotals::EntityKind,
                CatalogRatingTotals::EntityId,
                CatalogRatingTotals::Positive,
                CatalogRatingTotals::Negative,
            ])
            .values_panic([
                kind.as_str().into(),
                id_value(self.backend, entity_id).into(),
                positive.into(),
                negative.into(),
            ])
            .on_conflict(
                OnConflict::columns([
                    CatalogRatingTotals::EntityKind,
                    CatalogRatingTotals::EntityId,
                ])
                .update_columns([CatalogRatingTotals::Positive, CatalogRatingTotals::Negative])
                .to_owned(),
            )
            .to_owned();
        exec(conn, &upsert).await
    }
}

fn retrieval_failure(call: &str, kind: EntityKind, err: CatalogError) -> CatalogError {
    if !err.is_fatal_read() {
        return err;
    }
    log::error!("{call} {} aborted: {err}", kind.as_str());
    CatalogError::retrieval(err.to_string())
}

fn required_name(value: &str, what: &str) -> CatalogResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::invalid(format!("{what} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn search_title(title: &Option<String>) -> Option<String> {
    title.as_deref().map(normalize_index_text)
}

#[async_trait]
impl CatalogReadApi for CatalogStore {
    async fn list_packages(&self, input: ListInput) -> CatalogResult<Page<Package>> {
        self.list_roots(input).await
    }

    async fn list_worlds(&self, input: ListInput) -> CatalogResult<Page<World>> {
        self.list_roots(input).await
    }

    async fn list_portals(&self, input: ListInput) -> CatalogResult<Page<Portal>> {
        self.list_roots(input).await
    }

    async fn list_servers(&self, input: ListInput) -> CatalogResult<Page<Server>> {
        self.list_roots(input).await
    }

    async fn count_packages(&self, input: &ListInput) -> CatalogResult<u64> {
        self.count_roots(EntityKind::Package, input).await
    }

    async fn count_worlds(&self, input: &ListInput) -> CatalogResult<u64> {
        self.count_roots(EntityKind::World, input).await
    }

    async fn count_portals(&self, input: &ListInput) -> CatalogResult<u64> {
        self.count_roots(EntityKind::Portal, input).await
    }

    async fn count_servers(&self, input: &ListInput) -> CatalogResult<u64> {
        self.count_roots(EntityKind::Server, input).await
    }

    async fn get_package(&self, input: GetInput) -> CatalogResult<Package> {
        self.get_root(input).await
    }

    async fn get_world(&self, input: GetInput) -> CatalogResult<World> {
        self.get_root(input).await
    }

    async fn get_portal(&self, input: GetInput) -> CatalogResult<Portal> {
        self.get_root(input).await
    }

    async fn get_server(&self, input: GetInput) -> CatalogResult<Server> {
        self.get_root(input).await
    }
}

#[async_trait]
impl CatalogWriteApi for CatalogStore {
    async fn create_user(&self, input: NewUser) -> CatalogResult<Id> {
        let username = required_name(&input.username, "username")?;
        let existing = Query::select()
            .from(CatalogUsers::Table)
            .column(CatalogUsers::Id)
            .and_where(Expr::col(CatalogUsers::Username).eq(username.clone()))
            .limit(1)
            .to_owned();
        if query_one(&self.conn, &existing).await?.is_some() {
            return Err(CatalogError::conflict(format!(
                "username '{username}' is taken"
            )));
        }
        let id = Id::new();
        let insert = Query::insert()
            .into_table(CatalogUsers::Table)
            .columns([
                CatalogUsers::Id,
                CatalogUsers::Username,
                CatalogUsers::DisplayName,
                CatalogUsers::CreatedAt,
            ])
            .values_panic([
                id_value(self.backend, id).into(),
                username.into(),
                input.display_name.into(),
                self.next_timestamp().into(),
            ])
            .to_owned();
        exec(&self.conn, &insert).await?;
        Ok(id)
    }

    async fn create_package(&self, input: NewPackage) -> CatalogResult<Id> {
        let name = required_name(&input.name, "package name")?;
        self.ensure_opt_user(input.owner_id).await?;
        let id = Id::new();
        let now = self.next_timestamp();
        let insert = Query::insert()
            .into_table(CatalogPackages::Table)
            .columns([
                CatalogPackages::Id,
                CatalogPackages::Name,
                CatalogPackages::Title,
                CatalogPackages::Description,
                CatalogPackages::Version,
                CatalogPackages::Public,
                CatalogPackages::OwnerId,
                CatalogPackages::SearchName,
                CatalogPackages::SearchTitle,
                CatalogPackages::CreatedAt,
                CatalogPackages::UpdatedAt,
            ])
            .values_panic([
                id_value(self.backend, id).into(),
                name.clone().into(),
                input.title.clone().into(),
                input.description.into(),
                input.version.into(),
                input.public.into(),
                opt_id_value(self.backend, input.owner_id).into(),
                normalize_index_text(&name).into(),
                search_title(&input.title).into(),
                now.into(),
                now.into(),
            ])
            .to_owned();
        exec(&self.conn, &insert).await?;
        Ok(id)
    }

    async fn create_world(&self, input: NewWorld) -> CatalogResult<Id> {
        let name = required_name(&input.name, "world name")?;
        self.ensure_opt_user(input.owner_id).await?;
        self.ensure_opt(&self.conn, EntityKind::Package, input.package_id)
            .await?;
        let id = Id::new();
        let now = self.next_timestamp();
        let insert = Query::insert()
            .into_table(CatalogWorlds::Table)
            .columns([
                CatalogWorlds::Id,
                CatalogWorlds::PackageId,
                CatalogWorlds::Name,
                CatalogWorlds::Title,
                CatalogWorlds::Description,
                CatalogWorlds::Map,
                CatalogWorlds::Public,
                CatalogWorlds::OwnerId,
                CatalogWorlds::SearchName,
                CatalogWorlds::SearchTitle,
                CatalogWorlds::CreatedAt,
                CatalogWorlds::UpdatedAt,
            ])
            .values_panic([
                id_value(self.backend, id).into(),
                opt_id_value(self.backend, input.package_id).into(),
                name.clone().into(),
                input.title.clone().into(),
                input.description.into(),
                input.map.into(),
                input.public.into(),
                opt_id_value(self.backend, input.owner_id).into(),
                normalize_index_text(&name).into(),
                search_title(&input.title).into(),
                now.into(),
                now.into(),
            ])
            .to_owned();
        exec(&self.conn, &insert).await?;
        Ok(id)
    }

    async fn create_portal(&self, input: NewPortal) -> CatalogResult<Id> {
        let name = required_name(&input.name, "portal name")?;
        self.ensure_opt_user(input.owner_id).await?;
        self.ensure_opt(&self.conn, EntityKind::World, input.world_id)
            .await?;
        self.ensure_opt(&self.conn, EntityKind::Portal, input.destination_id)
            .await?;
        let id = Id::new();
        let now = self.next_timestamp();
        let insert = Query::insert()
            .into_table(CatalogPortals::Table)
            .columns([
                CatalogPortals::Id,
                CatalogPortals::WorldId,
                CatalogPortals::DestinationId,
                CatalogPortals::Name,
                CatalogPortals::Title,
                CatalogPortals::Description,
                CatalogPortals::Public,
                CatalogPortals::OwnerId,
                CatalogPortals::SearchName,
                CatalogPortals::SearchTitle,
                CatalogPortals::CreatedAt,
                CatalogPortals::UpdatedAt,
            ])
            .values_panic([
                id_value(self.backend, id).into(),
                opt_id_value(self.backend, input.world_id).into(),
                opt_id_value(self.backend, input.destination_id).into(),
                name.clone().into(),
                input.title.clone().into(),
                input.description.into(),
                input.public.into(),
                opt_id_value(self.backend, input.owner_id).into(),
                normalize_index_text(&name).into(),
                search_title(&input.title).into(),
                now.into(),
                now.into(),
            ])
            .to_owned();
        exec(&self.conn, &insert).await?;
        Ok(id)
    }

    async fn create_server(&self, input: NewServer) -> CatalogResult<Id> {
        let name = required_name(&input.name, "server name")?;
        if let Some(port) = input.port
            && !(0..=65_535).contains(&port)
        {
            return Err(CatalogError::invalid(format!("port {port} out of range")));
        }
        self.ensure_opt_user(input.owner_id).await?;
        self.ensure_opt(&self.conn, EntityKind::World, input.world_id)
            .await?;
        let id = Id::new();
        let now = self.next_timestamp();
        let insert = Query::insert()
            .into_table(CatalogServers::Table)
            .columns([
                CatalogServers::Id,
                CatalogServers::WorldId,
                CatalogServers::Name,
                CatalogServers::Title,
                CatalogServers::Description,
                CatalogServers::Host,
                CatalogServers::Port,
                CatalogServers::Region,
                CatalogServers::Public,
                CatalogServers::OwnerId,
                CatalogServers::SearchName,
                CatalogServers::SearchTitle,
                CatalogServers::CreatedAt,
                CatalogServers::UpdatedAt,
            ])
            .values_panic([
                id_value(self.backend, id).into(),
                opt_id_value(self.backend, input.world_id).into(),
                name.clone().into(),
                input.title.clone().into(),
                input.description.into(),
                input.host.into(),
                input.port.into(),
                input.region.into(),
                input.public.into(),
                opt_id_value(self.backend, input.owner_id).into(),
                normalize_index_text(&name).into(),
                search_title(&input.title).into(),
                now.into(),
                now.into(),
            ])
            .to_owned();
        exec(&self.conn, &insert).await?;
        Ok(id)
    }

    async fn add_file(
        &self,
        kind: EntityKind,
        entity_id: Id,
        input: NewFile,
    ) -> CatalogResult<Id> {
        if input.size.is_some_and(|size| size < 0) {
            return Err(CatalogError::invalid("file size must not be negative"));
        }
        self.ensure_exists(&self.conn, kind, entity_id).await?;
        let id = Id::new();
        let insert = Query::insert()
            .into_table(CatalogFiles::Table)
            .columns([
                CatalogFiles::Id,
                CatalogFiles::EntityKind,
                CatalogFiles::EntityId,
                CatalogFiles::FileType,
                CatalogFiles::MimeType,
                CatalogFiles::Size,
                CatalogFiles::Url,
                CatalogFiles::OriginalPath,
                CatalogFiles::Hash,
                CatalogFiles::Platform,
                CatalogFiles::Deployment,
                CatalogFiles::CreatedAt,
            ])
            .values_panic([
                id_value(self.backend, id).into(),
                kind.as_str().into(),
                id_value(self.backend, entity_id).into(),
                input.file_type.into(),
                input.mime_type.into(),
                input.size.into(),
                input.url.into(),
                input.original_path.into(),
                input.hash.into(),
                input.platform.into(),
                input.deployment.into(),
                self.next_timestamp().into(),
            ])
            .to_owned();
        exec(&self.conn, &insert).await?;
        Ok(id)
    }

    async fn rate(
        &self,
        kind: EntityKind,
        entity_id: Id,
        principal: Id,
        value: i64,
    ) -> CatalogResult<()> {
        if !(-1..=1).contains(&value) {
            return Err(CatalogError::invalid(format!(
                "rating must be -1, 0 or 1, got {value}"
            )));
        }
        let tx = self.conn.begin().await?;
        self.ensure_exists(&tx, kind, entity_id).await?;
        self.ensure_user(&tx, principal).await?;
        if value == 0 {
            let delete = Query::delete()
                .from_table(CatalogRatings::Table)
                .and_where(Expr::col(CatalogRatings::EntityKind).eq(kind.as_str()))
                .and_where(
                    Expr::col(CatalogRatings::EntityId).eq(id_value(self.backend, entity_id)),
                )
                .and_where(
                    Expr::col(CatalogRatings::PrincipalId).eq(id_value(self.backend, principal)),
                )
                .to_owned();
            exec(&tx, &delete).await?;
        } else {
            let upsert = Query::insert()
                .into_table(CatalogRatings::Table)
                .columns([
                    CatalogRatings::EntityKind,
                    CatalogRatings::EntityId,
                    CatalogRatings::PrincipalId,
                    CatalogRatings::Value,
                    CatalogRatings::UpdatedAt,
                ])
                .values_panic([
                    kind.as_str().into(),
                    id_value(self.backend, entity_id).into(),
                    id_value(self.backend, principal).into(),
                    value.into(),
                    self.next_timestamp().into(),
                ])
                .on_conflict(
                    OnConflict::columns([
                        CatalogRatings::EntityKind,
                        CatalogRatings::EntityId,
                        CatalogRatings::PrincipalId,
                    ])
                    .update_columns([CatalogRatings::Value, CatalogRatings::UpdatedAt])
                    .to_owned(),
                )
                .to_owned();
            exec(&tx, &upsert).await?;
        }
        self.refresh_rating_totals(&tx, kind, entity_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn grant_view(
        &self,
        kind: EntityKind,
        entity_id: Id,
        principal: Id,
    ) -> CatalogResult<()> {
        self.ensure_exists(&self.conn, kind, entity_id).await?;
        self.ensure_user(&self.conn, principal).await?;
        let insert = Query::insert()
            .into_table(CatalogGrants::Table)
            .columns([
                CatalogGrants::EntityKind,
                CatalogGrants::EntityId,
                CatalogGrants::PrincipalId,
                CatalogGrants::CreatedAt,
            ])
            .values_panic([
                kind.as_str().into(),
                id_value(self.backend, entity_id).into(),
                id_value(self.backend, principal).into(),
                self.next_timestamp().into(),
            ])
            .on_conflict(
                OnConflict::columns([
                    CatalogGrants::EntityKind,
                    CatalogGrants::EntityId,
                    CatalogGrants::PrincipalId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .to_owned();
        exec(&self.conn, &insert).await
    }

    async fn revoke_view(
        &self,
        kind: EntityKind,
        entity_id: Id,
        principal: Id,
    ) -> CatalogResult<()> {
        self.ensure_exists(&self.conn, kind, entity_id).await?;
        let delete = Query::delete()
            .from_table(CatalogGrants::Table)
            .and_where(Expr::col(CatalogGrants::EntityKind).eq(kind.as_str()))
            .and_where(Expr::col(CatalogGrants::EntityId).eq(id_value(self.backend, entity_id)))
            .and_where(Expr::col(CatalogGrants::PrincipalId).eq(id_value(self.backend, principal)))
            .to_owned();
        exec(&self.conn, &delete).await
    }

    async fn set_public(&self, kind: EntityKind, entity_id: Id, public: bool) -> CatalogResult<()> {
        self.ensure_exists(&self.conn, kind, entity_id).await?;
        let update = Query::update()
            .table(entity_table(kind))
            .values([
                (Alias::new("public"), public.into()),
                (Alias::new("updated_at"), self.next_timestamp().into()),
            ])
            .and_where(Expr::col(Alias::new("id")).eq(id_value(self.backend, entity_id)))
            .to_owned();
        exec(&self.conn, &update).await
    }

    async fn delete_entity(&self, kind: EntityKind, entity_id: Id) -> CatalogResult<()> {
        let tx = self.conn.begin().await?;
        self.ensure_exists(&tx, kind, entity_id).await?;
        let id = id_value(self.backend, entity_id);

        let files = Query::delete()
            .from_table(CatalogFiles::Table)
            .and_where(Expr::col(CatalogFiles::EntityKind).eq(kind.as_str()))
            .and_where(Expr::col(CatalogFiles::EntityId).eq(id.clone()))
            .to_owned();
        exec(&tx, &files).await?;
        let grants = Query::delete()
            .from_table(CatalogGrants::Table)
            .and_where(Expr::col(CatalogGrants::EntityKind).eq(kind.as_str()))
            .and_where(Expr::col(CatalogGrants::EntityId).eq(id.clone()))
            .to_owned();
        exec(&tx, &grants).await?;
        let ratings = Query::delete()
            .from_table(CatalogRatings::Table)
            .and_where(Expr::col(CatalogRatings::EntityKind).eq(kind.as_str()))
            .and_where(Expr::col(CatalogRatings::EntityId).eq(id.clone()))
            .to_owned();
        exec(&tx, &ratings).await?;
        let totals = Query::delete()
            .from_table(CatalogRatingTotals::Table)
            .and_where(Expr::col(CatalogRatingTotals::EntityKind).eq(kind.as_str()))
            .and_where(Expr::col(CatalogRatingTotals::EntityId).eq(id.clone()))
            .to_owned();
        exec(&tx, &totals).await?;

        // Entities pointing at this one keep existing with the link cleared.
        let references: &[(EntityKind, &str)] = match kind {
            EntityKind::Package => &[(EntityKind::World, "package_id")],
            EntityKind::World => &[
                (EntityKind::Portal, "world_id"),
                (EntityKind::Server, "world_id"),
            ],
            EntityKind::Portal => &[(EntityKind::Portal, "destination_id")],
            EntityKind::Server => &[],
        };
        for (referrer, column) in references {
            let update = Query::update()
                .table(entity_table(*referrer))
                .values([(Alias::new(*column), none_id_value(self.backend).into())])
                .and_where(Expr::col(Alias::new(*column)).eq(id.clone()))
                .to_owned();
            exec(&tx, &update).await?;
        }

        let entity = Query::delete()
            .from_table(entity_table(kind))
            .and_where(Expr::col(Alias::new("id")).eq(id))
            .to_owned();
        exec(&tx, &entity).await?;
        tx.commit().await?;
        log::debug!("deleted {} {entity_id}", kind.as_str());
        Ok(())
    }
}

pub(crate) fn id_value(backend: DatabaseBackend, id: Id) -> SeaValue {
    match backend {
        DatabaseBackend::Postgres => {
            let uuid = Uuid::from_bytes(id.as_bytes());
            SeaValue::Uuid(Some(uuid))
        }
        DatabaseBackend::MySql => SeaValue::Bytes(Some(id.as_vec())),
        _ => SeaValue::String(Some(id.to_uuid_string())),
    }
}

pub(crate) fn none_id_value(backend: DatabaseBackend) -> SeaValue {
    match backend {
        DatabaseBackend::Postgres => SeaValue::Uuid(None),
        DatabaseBackend::MySql => SeaValue::Bytes(None),
        _ => SeaValue::String(None),
    }
}

pub(crate) fn opt_id_value(backend: DatabaseBackend, id: Option<Id>) -> SeaValue {
    match id {
        Some(id) => id_value(backend, id),
        None => none_id_value(backend),
    }
}

fn build_stmt<S: QueryStatementWriter>(
    backend: DatabaseBackend,
    stmt: &S,
) -> (String, sea_orm::sea_query::Values) {
    match backend {
        DatabaseBackend::Postgres => stmt.build(PostgresQueryBuilder),
        DatabaseBackend::MySql => stmt.build(MysqlQueryBuilder),
        _ => stmt.build(SqliteQueryBuilder),
    }
}

async fn exec<C, S>(conn: &C, stmt: &S) -> CatalogResult<()>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    conn.execute_raw(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(())
}

pub(crate) async fn query_all<C, S>(conn: &C, stmt: &S) -> CatalogResult<Vec<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let rows = conn
        .query_all_raw(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(rows)
}

async fn query_one<C, S>(conn: &C, stmt: &S) -> CatalogResult<Option<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let row = conn
        .query_one_raw(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(row)
}
