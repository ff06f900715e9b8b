//! Forward-only row cursor over a fully ordered join, fetched in batches.

use std::collections::VecDeque;

use async_trait::async_trait;
use sea_orm::sea_query::SelectStatement;
use sea_orm::{DatabaseConnection, QueryResult};
use uuid::Uuid;

use aideon_catalog_core::{CatalogError, CatalogResult, Id, RootCounter, RowSource, RowView};

use crate::query::{ListPlan, RootKey};
use crate::store::query_all;

/// One join row as returned by the driver.
pub struct SqlRow(QueryResult);

impl SqlRow {
    fn decode_failure(column: &str, expected: &str) -> CatalogError {
        CatalogError::decode(column, format!("column missing or not {expected}"))
    }
}

impl RowView for SqlRow {
    fn get_id(&self, column: &str) -> CatalogResult<Option<Id>> {
        if let Ok(value) = self.0.try_get::<Option<String>>("", column) {
            return value
                .map(|value| {
                    Id::from_uuid_str(&value)
                        .map_err(|err| CatalogError::decode(column, err.to_string()))
                })
                .transpose();
        }
        if let Ok(value) = self.0.try_get::<Option<Uuid>>("", column) {
            return Ok(value.map(|value| Id::from_bytes(*value.as_bytes())));
        }
        if let Ok(value) = self.0.try_get::<Option<Vec<u8>>>("", column) {
            return value
                .map(|bytes| {
                    Id::from_slice(&bytes)
                        .ok_or_else(|| CatalogError::decode(column, "invalid id length"))
                })
                .transpose();
        }
        Err(Self::decode_failure(column, "an id"))
    }

    fn get_str(&self, column: &str) -> CatalogResult<Option<String>> {
        self.0
            .try_get::<Option<String>>("", column)
            .map_err(|err| CatalogError::decode(column, err.to_string()))
    }

    fn get_i64(&self, column: &str) -> CatalogResult<Option<i64>> {
        if let Ok(value) = self.0.try_get::<Option<i64>>("", column) {
            return Ok(value);
        }
        if let Ok(value) = self.0.try_get::<Option<i32>>("", column) {
            return Ok(value.map(i64::from));
        }
        Err(Self::decode_failure(column, "an integer"))
    }

    fn get_bool(&self, column: &str) -> CatalogResult<Option<bool>> {
        if let Ok(value) = self.0.try_get::<Option<bool>>("", column) {
            return Ok(value);
        }
        if let Ok(value) = self.0.try_get::<Option<i64>>("", column) {
            return Ok(value.map(|value| value != 0));
        }
        if let Ok(value) = self.0.try_get::<Option<i8>>("", column) {
            return Ok(value.map(|value| value != 0));
        }
        Err(Self::decode_failure(column, "a boolean"))
    }
}

/// Reads a list query in batches of roughly `batch_rows` rows. Each batch
/// resumes strictly after the last root handed out, keyed on the root's sort
/// value and id, and a root's rows are always taken from a single statement.
/// A write landing between batches cannot repeat a root or leave one with
/// part of its rows.
pub struct BatchedCursor {
    conn: DatabaseConnection,
    plan: ListPlan,
    root_id_column: String,
    batch_rows: u64,
    after: Option<RootKey>,
    buffer: VecDeque<SqlRow>,
    rows_read: u64,
    exhausted: bool,
    closed: bool,
}

impl BatchedCursor {
    pub fn new(conn: DatabaseConnection, plan: ListPlan, batch_rows: u64) -> Self {
        let root_id_column = plan.shape().root().column("id");
        Self {
            conn,
            plan,
            root_id_column,
            batch_rows: batch_rows.max(1),
            after: None,
            buffer: VecDeque::new(),
            rows_read: 0,
            exhausted: false,
            closed: false,
        }
    }

    async fn fetch_batch(&mut self) -> CatalogResult<()> {
        let mut select = self.plan.rows_after(self.after.as_ref());
        select.limit(self.batch_rows);
        let mut rows = fetch_rows(&self.conn, &select).await?;
        let fetched = rows.len() as u64;
        self.rows_read += fetched;
        let Some(last) = rows.last() else {
            self.exhausted = true;
            return Ok(());
        };
        if fetched < self.batch_rows {
            self.exhausted = true;
            self.buffer.extend(rows);
            return Ok(());
        }

        // The trailing root may continue past the limit; hold it back.
        let tail = self.plan.root_key(last)?;
        let mut split = rows.len();
        while split > 0 && rows[split - 1].get_id(&self.root_id_column)? == Some(tail.id) {
            split -= 1;
        }
        if split == 0 {
            let select = self.plan.root_rows(&tail);
            let whole = fetch_rows(&self.conn, &select).await?;
            log::debug!(
                "root {} spans more than {} rows; read {} rows on their own",
                tail.id,
                self.batch_rows,
                whole.len()
            );
            self.buffer.extend(whole);
            self.after = Some(tail);
            return Ok(());
        }
        rows.truncate(split);
        self.after = Some(self.plan.root_key(&rows[split - 1])?);
        log::debug!(
            "fetched {fetched} rows, kept {split} (batch of {})",
            self.batch_rows
        );
        self.buffer.extend(rows);
        Ok(())
    }
}

async fn fetch_rows(
    conn: &DatabaseConnection,
    select: &SelectStatement,
) -> CatalogResult<Vec<SqlRow>> {
    let rows = query_all(conn, select)
        .await
        .map_err(|err| CatalogError::source(err.to_string()))?;
    Ok(rows.into_iter().map(SqlRow).collect())
}

#[async_trait]
impl RowSource for BatchedCursor {
    type Row = SqlRow;

    async fn next_row(&mut self) -> CatalogResult<Option<SqlRow>> {
        if self.closed {
            return Err(CatalogError::source("cursor already closed"));
        }
        while self.buffer.is_empty() && !self.exhausted {
            self.fetch_batch().await?;
        }
        Ok(self.buffer.pop_front())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if !self.exhausted {
            log::debug!("cursor closed early after {} rows", self.rows_read);
        }
        self.buffer.clear();
    }
}

/// Runs a `COUNT` statement built from the same filter as the row query.
pub struct CountQuery {
    conn: DatabaseConnection,
    select: SelectStatement,
}

impl CountQuery {
    pub const TOTAL: &'static str = "total";

    pub fn new(conn: DatabaseConnection, select: SelectStatement) -> Self {
        Self { conn, select }
    }
}

#[async_trait]
impl RootCounter for CountQuery {
    async fn count_roots(&self) -> CatalogResult<u64> {
        let rows = query_all(&self.conn, &self.select)
            .await
            .map_err(|err| CatalogError::source(err.to_string()))?;
        let Some(row) = rows.into_iter().next() else {
            return Err(CatalogError::source("count query returned no rows"));
        };
        let total: i64 = row
            .try_get("", Self::TOTAL)
            .map_err(|err| CatalogError::decode(Self::TOTAL, err.to_string()))?;
        u64::try_from(total).map_err(|_| CatalogError::decode(Self::TOTAL, "negative count"))
    }
}
