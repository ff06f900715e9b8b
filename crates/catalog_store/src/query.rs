//! SQL for list, get and count calls.
//!
//! A row query selects the root table aliased by its level prefix, left joins
//! every nested level through its foreign key, and aliases each selected
//! column `{prefix}_{field}` so the assembler can read it by name. Grants,
//! owners and rating totals are to-one joins. Files are the only fan-out; the
//! count query leaves them out and otherwise shares the same joins and the
//! same predicate.

use sea_orm::DatabaseBackend;
use sea_orm::sea_query::{
    Alias, Cond, Condition, Expr, ExprTrait, Func, JoinType, LikeExpr, Order, Query,
    SelectStatement,
};
use unicode_normalization::UnicodeNormalization;

use aideon_catalog_core::{
    Audience, CatalogError, CatalogResult, ChainShape, FILE_COLUMNS, FileSelector, GetInput, Id,
    Level, LinkPolicy, ListInput, OWNER_COLUMNS, RowView, Scope, SortKey,
};

use crate::cursor::CountQuery;
use crate::db::{
    CatalogGrants, CatalogRatingTotals, CatalogRatings, CatalogUsers, col_name, entity_table,
};
use crate::store::{id_value, opt_id_value};

pub(crate) fn normalize_index_text(value: &str) -> String {
    value.trim().nfc().collect::<String>().to_lowercase()
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn c(table: &str, field: &str) -> (Alias, Alias) {
    (Alias::new(table.to_owned()), Alias::new(field.to_owned()))
}

fn grant_alias(level: &Level) -> String {
    format!("{}_g", level.prefix)
}

/// What a list or get call filters on, independent of paging.
#[derive(Clone, Debug, Default)]
pub struct ListFilter {
    pub audience: Audience,
    /// Normalized search text; `None` when the query was absent or blank.
    pub search: Option<String>,
    pub scope: Option<Scope>,
    pub root_id: Option<Id>,
    pub files: FileSelector,
    pub sort: SortKey,
}

impl ListFilter {
    pub fn from_list(input: &ListInput) -> Self {
        let search = input
            .query
            .as_deref()
            .map(normalize_index_text)
            .filter(|query| !query.is_empty());
        Self {
            audience: input.audience,
            search,
            scope: input.scope,
            root_id: None,
            files: input.files.clone(),
            sort: input.sort,
        }
    }

    pub fn by_id(input: &GetInput) -> Self {
        Self {
            audience: input.audience,
            root_id: Some(input.id),
            files: input.files.clone(),
            ..Self::default()
        }
    }
}

/// Value of the root sort column for one root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortValue {
    Created(i64),
    Name(String),
}

/// Position of a root in the row order; batches resume strictly after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootKey {
    pub sort: SortValue,
    pub id: Id,
}

pub struct ListPlan {
    backend: DatabaseBackend,
    shape: ChainShape,
    filter: ListFilter,
}

impl ListPlan {
    pub fn new(backend: DatabaseBackend, shape: ChainShape, filter: ListFilter) -> Self {
        Self {
            backend,
            shape,
            filter,
        }
    }

    pub fn shape(&self) -> ChainShape {
        self.shape
    }

    /// Ordered join rows: root sort key, root id, then each level's file id.
    pub fn rows(&self) -> SelectStatement {
        let mut select = self.joined();
        let levels = self.shape.levels();
        for level in levels {
            self.select_level(&mut select, level);
        }
        let root = self.shape.root();
        match self.filter.sort {
            SortKey::Newest => {
                select.order_by(c(root.prefix, "created_at"), Order::Desc);
            }
            SortKey::Name => {
                select.order_by(c(root.prefix, "name"), Order::Asc);
            }
        }
        select.order_by(c(root.prefix, "id"), Order::Asc);
        for level in levels {
            select.order_by(c(&level.files_prefix(), "id"), Order::Asc);
        }
        select
    }

    /// Row query restricted to roots ordered after `after`.
    pub fn rows_after(&self, after: Option<&RootKey>) -> SelectStatement {
        let mut select = self.rows();
        if let Some(key) = after {
            select.cond_where(self.beyond(key));
        }
        select
    }

    /// Every row of a single root, in row order.
    pub fn root_rows(&self, key: &RootKey) -> SelectStatement {
        let root = self.shape.root();
        let mut select = self.rows();
        select.and_where(Expr::col(c(root.prefix, "id")).eq(id_value(self.backend, key.id)));
        select
    }

    pub fn root_key<R: RowView + ?Sized>(&self, row: &R) -> CatalogResult<RootKey> {
        let root = self.shape.root();
        let id_column = root.column("id");
        let id = row
            .get_id(&id_column)?
            .ok_or_else(|| CatalogError::decode(&id_column, "root id is null"))?;
        let sort = match self.filter.sort {
            SortKey::Newest => {
                let column = root.column("created_at");
                let at = row
                    .get_i64(&column)?
                    .ok_or_else(|| CatalogError::decode(&column, "sort column is null"))?;
                SortValue::Created(at)
            }
            SortKey::Name => {
                let column = root.column("name");
                let name = row
                    .get_str(&column)?
                    .ok_or_else(|| CatalogError::decode(&column, "sort column is null"))?;
                SortValue::Name(name)
            }
        };
        Ok(RootKey { sort, id })
    }

    /// Roots strictly after `key` under the plan's ORDER BY.
    fn beyond(&self, key: &RootKey) -> Condition {
        let root = self.shape.root();
        let (past, tie) = match &key.sort {
            SortValue::Created(at) => (
                Expr::col(c(root.prefix, "created_at")).lt(*at),
                Expr::col(c(root.prefix, "created_at")).eq(*at),
            ),
            SortValue::Name(name) => (
                Expr::col(c(root.prefix, "name")).gt(name.clone()),
                Expr::col(c(root.prefix, "name")).eq(name.clone()),
            ),
        };
        Cond::any().add(past).add(
            Cond::all()
                .add(tie)
                .add(Expr::col(c(root.prefix, "id")).gt(id_value(self.backend, key.id))),
        )
    }

    pub fn count(&self) -> SelectStatement {
        let mut select = self.joined();
        let root = self.shape.root();
        select.expr_as(
            Func::count(Expr::col(c(root.prefix, "id"))),
            Alias::new(CountQuery::TOTAL),
        );
        select
    }

    /// Root table, nested chain joins, grant joins and the shared predicate.
    fn joined(&self) -> SelectStatement {
        let levels = self.shape.levels();
        let root = self.shape.root();
        let mut select = Query::select()
            .from_as(entity_table(root.kind), Alias::new(root.prefix))
            .to_owned();
        for (depth, level) in levels.iter().enumerate() {
            if let (Some(via), Some(parent)) = (level.via, depth.checked_sub(1)) {
                let parent = &levels[parent];
                select.join_as(
                    JoinType::LeftJoin,
                    entity_table(level.kind),
                    Alias::new(level.prefix),
                    Expr::col(c(level.prefix, "id")).equals(c(parent.prefix, via.foreign_key())),
                );
            }
            let grants = grant_alias(level);
            select.join_as(
                JoinType::LeftJoin,
                CatalogGrants::Table,
                Alias::new(grants.clone()),
                Cond::all()
                    .add(
                        Expr::col(c(&grants, &col_name(CatalogGrants::EntityKind)))
                            .eq(level.kind.as_str()),
                    )
                    .add(
                        Expr::col(c(&grants, &col_name(CatalogGrants::EntityId)))
                            .equals(c(level.prefix, "id")),
                    )
                    .add(
                        Expr::col(c(&grants, &col_name(CatalogGrants::PrincipalId)))
                            .eq(opt_id_value(self.backend, self.filter.audience.principal())),
                    ),
            );
        }
        let predicate = self.predicate();
        if !predicate.is_empty() {
            select.cond_where(predicate);
        }
        select
    }

    fn predicate(&self) -> Condition {
        let root = self.shape.root();
        let mut cond = Cond::all();
        if !self.filter.audience.is_admin() {
            cond = cond.add(self.visible(root));
            for level in &self.shape.levels()[1..] {
                if level.policy == LinkPolicy::Require {
                    cond = cond.add(
                        Cond::any()
                            .add(Expr::col(c(level.prefix, "id")).is_null())
                            .add(self.visible(level)),
                    );
                }
            }
        }
        if let Some(search) = &self.filter.search {
            let pattern = format!("%{}%", escape_like(search));
            cond = cond.add(
                Cond::any()
                    .add(
                        Expr::col(c(root.prefix, "search_name"))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::col(c(root.prefix, "search_title"))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }
        if let Some(scope) = &self.filter.scope {
            cond = cond.add(
                Expr::col(c(root.prefix, scope.column())).eq(id_value(self.backend, scope.id())),
            );
        }
        if let Some(id) = self.filter.root_id {
            cond = cond.add(Expr::col(c(root.prefix, "id")).eq(id_value(self.backend, id)));
        }
        cond
    }

    /// `public OR granted OR owned` for one level.
    fn visible(&self, level: &Level) -> Condition {
        let mut cond = Cond::any().add(Expr::col(c(level.prefix, "public")).eq(true));
        if let Some(principal) = self.filter.audience.principal() {
            cond = cond
                .add(
                    Expr::col(c(&grant_alias(level), &col_name(CatalogGrants::PrincipalId)))
                        .is_not_null(),
                )
                .add(
                    Expr::col(c(level.prefix, "owner_id"))
                        .eq(id_value(self.backend, principal)),
                );
        }
        cond
    }

    fn select_level(&self, select: &mut SelectStatement, level: &Level) {
        let p = level.prefix;
        for field in level.kind.columns() {
            select.expr_as(Expr::col(c(p, field)), Alias::new(level.column(field)));
        }
        select.expr_as(
            Expr::col(c(&grant_alias(level), &col_name(CatalogGrants::PrincipalId))),
            Alias::new(level.column("grant")),
        );

        if level.files {
            let files = level.files_prefix();
            let mut on = Cond::all()
                .add(Expr::col(c(&files, "entity_kind")).eq(level.kind.as_str()))
                .add(Expr::col(c(&files, "entity_id")).equals(c(p, "id")));
            if let Some(platform) = &self.filter.files.platform {
                on = on.add(
                    Cond::any()
                        .add(Expr::col(c(&files, "platform")).is_null())
                        .add(Expr::col(c(&files, "platform")).eq(platform.as_str())),
                );
            }
            if let Some(deployment) = &self.filter.files.deployment {
                on = on.add(
                    Cond::any()
                        .add(Expr::col(c(&files, "deployment")).is_null())
                        .add(Expr::col(c(&files, "deployment")).eq(deployment.as_str())),
                );
            }
            select.join_as(
                JoinType::LeftJoin,
                crate::db::CatalogFiles::Table,
                Alias::new(files.clone()),
                on,
            );
            for field in FILE_COLUMNS {
                select.expr_as(
                    Expr::col(c(&files, field)),
                    Alias::new(format!("{files}_{field}")),
                );
            }
        }

        if level.owner {
            let owner = level.owner_prefix();
            select.join_as(
                JoinType::LeftJoin,
                CatalogUsers::Table,
                Alias::new(owner.clone()),
                Expr::col(c(&owner, "id")).equals(c(p, "owner_id")),
            );
            for field in OWNER_COLUMNS {
                select.expr_as(
                    Expr::col(c(&owner, field)),
                    Alias::new(format!("{owner}_{field}")),
                );
            }
        }

        if level.rating {
            let totals = format!("{p}_rt");
            let own = format!("{p}_ro");
            select.join_as(
                JoinType::LeftJoin,
                CatalogRatingTotals::Table,
                Alias::new(totals.clone()),
                Cond::all()
                    .add(Expr::col(c(&totals, "entity_kind")).eq(level.kind.as_str()))
                    .add(Expr::col(c(&totals, "entity_id")).equals(c(p, "id"))),
            );
            select.join_as(
                JoinType::LeftJoin,
                CatalogRatings::Table,
                Alias::new(own.clone()),
                Cond::all()
                    .add(Expr::col(c(&own, "entity_kind")).eq(level.kind.as_str()))
                    .add(Expr::col(c(&own, "entity_id")).equals(c(p, "id")))
                    .add(
                        Expr::col(c(&own, "principal_id"))
                            .eq(opt_id_value(self.backend, self.filter.audience.principal())),
                    ),
            );
            select.expr_as(
                Expr::col(c(&totals, "positive")),
                Alias::new(level.column("rating_positive")),
            );
            select.expr_as(
                Expr::col(c(&totals, "negative")),
                Alias::new(level.column("rating_negative")),
            );
            select.expr_as(
                Expr::col(c(&own, "value")),
                Alias::new(level.column("rating_own")),
            );
        }
    }
}
