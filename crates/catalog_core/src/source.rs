use async_trait::async_trait;

use crate::{CatalogResult, RowView};

/// Forward-only cursor over the rows of one join query.
///
/// Rows belonging to one root must be contiguous. `close` releases the
/// underlying cursor and must tolerate repeated calls.
#[async_trait]
pub trait RowSource: Send {
    type Row: RowView + Send;

    async fn next_row(&mut self) -> CatalogResult<Option<Self::Row>>;

    fn close(&mut self);
}

/// Owns a row source for one materialization pass and releases it exactly
/// once, on whichever path the pass leaves by.
pub struct CursorGuard<S: RowSource> {
    source: S,
    released: bool,
}

impl<S: RowSource> CursorGuard<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            released: false,
        }
    }

    pub async fn next_row(&mut self) -> CatalogResult<Option<S::Row>> {
        if self.released {
            return Ok(None);
        }
        self.source.next_row().await
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.close();
        }
    }
}

impl<S: RowSource> Drop for CursorGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}
