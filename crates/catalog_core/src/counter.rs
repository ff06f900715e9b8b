use async_trait::async_trait;
use serde::Serialize;

use crate::chain::Node;
use crate::{CatalogResult, IntegrityAnomaly, Materializer, PaginationWindow, RowSource};

/// Counts every root matching a filter, ignoring offset and limit. Must use
/// the same filter and visibility predicate as the paired row query.
#[async_trait]
pub trait RootCounter: Send + Sync {
    async fn count_roots(&self) -> CatalogResult<u64>;
}

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
    pub anomalies: Vec<IntegrityAnomaly>,
}

impl<T> Page<T> {
    pub fn page_count(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.limit)
    }

    pub fn has_more(&self) -> bool {
        self.offset.saturating_add(self.items.len() as u64) < self.total
    }
}

/// Runs the windowed materialization and the total count side by side.
pub async fn fetch_page<N, S, C>(
    materializer: &Materializer,
    source: S,
    counter: &C,
    window: PaginationWindow,
) -> CatalogResult<Page<N>>
where
    N: Node,
    S: RowSource,
    C: RootCounter + ?Sized,
{
    let offset = window.offset();
    let limit = window.limit();
    let (materialized, total) = tokio::try_join!(
        materializer.materialize::<N, S>(source, window),
        counter.count_roots()
    )?;
    Ok(Page {
        items: materialized.items,
        total,
        offset,
        limit,
        anomalies: materialized.anomalies,
    })
}
