//! In-process row source for callers that hold rows already, and for tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::decode::column;
use crate::{CatalogError, CatalogResult, Id, RootCounter, RowSource, RowView};

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Id(Id),
    Str(String),
    Int(i64),
    Bool(bool),
}

impl Cell {
    fn type_name(&self) -> &'static str {
        match self {
            Cell::Null => "null",
            Cell::Id(_) => "id",
            Cell::Str(_) => "text",
            Cell::Int(_) => "integer",
            Cell::Bool(_) => "boolean",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryRow {
    cells: BTreeMap<String, Cell>,
}

impl MemoryRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, cell: Cell) -> Self {
        self.cells.insert(name.into(), cell);
        self
    }

    /// Sets `{prefix}_{field}` to null for every field.
    pub fn with_nulls(mut self, prefix: &str, fields: &[&str]) -> Self {
        for field in fields {
            self.cells.insert(column(prefix, field), Cell::Null);
        }
        self
    }

    pub fn set(&mut self, name: impl Into<String>, cell: Cell) {
        self.cells.insert(name.into(), cell);
    }

    fn cell(&self, name: &str) -> CatalogResult<&Cell> {
        self.cells
            .get(name)
            .ok_or_else(|| CatalogError::decode(name, "column not present in row"))
    }

    fn mismatch(name: &str, expected: &str, found: &Cell) -> CatalogError {
        CatalogError::decode(
            name,
            format!("expected {expected}, found {}", found.type_name()),
        )
    }
}

impl RowView for MemoryRow {
    fn get_id(&self, name: &str) -> CatalogResult<Option<Id>> {
        match self.cell(name)? {
            Cell::Null => Ok(None),
            Cell::Id(id) => Ok(Some(*id)),
            Cell::Str(text) => Id::from_uuid_str(text)
                .map(Some)
                .map_err(|err| CatalogError::decode(name, err.to_string())),
            other => Err(Self::mismatch(name, "id", other)),
        }
    }

    fn get_str(&self, name: &str) -> CatalogResult<Option<String>> {
        match self.cell(name)? {
            Cell::Null => Ok(None),
            Cell::Str(text) => Ok(Some(text.clone())),
            other => Err(Self::mismatch(name, "text", other)),
        }
    }

    fn get_i64(&self, name: &str) -> CatalogResult<Option<i64>> {
        match self.cell(name)? {
            Cell::Null => Ok(None),
            Cell::Int(value) => Ok(Some(*value)),
            other => Err(Self::mismatch(name, "integer", other)),
        }
    }

    fn get_bool(&self, name: &str) -> CatalogResult<Option<bool>> {
        match self.cell(name)? {
            Cell::Null => Ok(None),
            Cell::Bool(value) => Ok(Some(*value)),
            Cell::Int(value) => Ok(Some(*value != 0)),
            other => Err(Self::mismatch(name, "boolean", other)),
        }
    }
}

/// Counters shared with the caller so reads and releases can be observed
/// after the source has been consumed.
#[derive(Debug, Default)]
pub struct SourceStats {
    rows_read: AtomicUsize,
    closes: AtomicUsize,
}

impl SourceStats {
    pub fn rows_read(&self) -> usize {
        self.rows_read.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct MemoryRowSource {
    rows: std::vec::IntoIter<MemoryRow>,
    stats: Arc<SourceStats>,
    fail_after: Option<usize>,
    closed: bool,
}

impl MemoryRowSource {
    pub fn new(rows: Vec<MemoryRow>) -> Self {
        Self {
            rows: rows.into_iter(),
            stats: Arc::new(SourceStats::default()),
            fail_after: None,
            closed: false,
        }
    }

    /// Fails with a source error once `rows` rows have been handed out.
    pub fn failing_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }

    pub fn stats(&self) -> Arc<SourceStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl RowSource for MemoryRowSource {
    type Row = MemoryRow;

    async fn next_row(&mut self) -> CatalogResult<Option<MemoryRow>> {
        if self.closed {
            return Err(CatalogError::source("row source already closed"));
        }
        if let Some(limit) = self.fail_after
            && self.stats.rows_read() >= limit
        {
            return Err(CatalogError::source("injected row source failure"));
        }
        let row = self.rows.next();
        if row.is_some() {
            self.stats.rows_read.fetch_add(1, Ordering::SeqCst);
        }
        Ok(row)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counts distinct non-null root ids over a fixed set of rows.
pub struct MemoryCounter {
    total: u64,
}

impl MemoryCounter {
    pub fn from_rows(rows: &[MemoryRow], root_id_column: &str) -> CatalogResult<Self> {
        let mut seen = HashSet::new();
        for row in rows {
            if let Some(id) = row.get_id(root_id_column)? {
                seen.insert(id);
            }
        }
        Ok(Self {
            total: seen.len() as u64,
        })
    }
}

#[async_trait]
impl RootCounter for MemoryCounter {
    async fn count_roots(&self) -> CatalogResult<u64> {
        Ok(self.total)
    }
}
