//! Turns a stream of denormalized join rows into distinct nested roots.
//!
//! Rows of one root are contiguous. The assembler creates a root on its first
//! row, fills nested levels the first time each is seen, and afterwards only
//! attaches deduplicated files. A root is complete once a row for a different
//! root arrives, or the stream ends; only complete roots reach the window.

use serde::Serialize;

use crate::chain::{ChainShape, Level, LinkPolicy, Node, Slot};
use crate::decode::decode_group;
use crate::{
    Audience, CatalogError, CatalogResult, ChildDeduplicator, CursorGuard, File, Id, Offer,
    PaginationWindow, RowSource, RowView, VisibilityFact, is_visible,
};

/// A nested id arrived on a row whose ancestor level id was null.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntegrityAnomaly {
    pub root_id: Id,
    pub level: &'static str,
    pub missing_ancestor: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowClass {
    /// Root id is null; nothing on this row can be attributed.
    Discard,
    SameRoot,
    NewRoot,
}

struct InProgress<N> {
    root: N,
    facts: Vec<VisibilityFact>,
    excluded: bool,
}

enum AssemblerState<N> {
    NoRoot,
    Building(InProgress<N>),
    Done,
}

/// Per-row view of the root being built, threaded through nested levels.
struct RowPass<'a, R: ?Sized> {
    row: &'a R,
    levels: &'static [Level],
    audience: &'a Audience,
    root_id: Id,
    dedup: &'a mut ChildDeduplicator,
    facts: &'a mut Vec<VisibilityFact>,
    excluded: &'a mut bool,
    anomalies: &'a mut Vec<IntegrityAnomaly>,
    log_anomalies: bool,
}

impl<R: RowView + ?Sized> RowPass<'_, R> {
    fn absorb_level<N: Node>(&mut self, node: &mut N, depth: usize) -> CatalogResult<()> {
        let levels = self.levels;
        let level = &levels[depth];
        if level.files
            && let Some(file) = decode_group::<File, R>(self.row, &level.files_prefix())?
        {
            self.dedup.attach(depth, node.files_mut(), file);
        }
        let Some(next) = levels.get(depth + 1) else {
            return Ok(());
        };
        let Some(relation) = next.via else {
            return Ok(());
        };
        match node.link(relation) {
            Some(slot) => self.fill_slot(slot, depth + 1),
            None => Ok(()),
        }
    }

    fn fill_slot(&mut self, slot: Slot<'_>, depth: usize) -> CatalogResult<()> {
        match slot {
            Slot::Portal(slot) => self.fill(slot, depth),
            Slot::World(slot) => self.fill(slot, depth),
            Slot::Package(slot) => self.fill(slot, depth),
        }
    }

    fn fill<N: Node>(&mut self, slot: &mut Option<Box<N>>, depth: usize) -> CatalogResult<()> {
        let levels = self.levels;
        let level = &levels[depth];
        let Some(id) = self.row.get_id(&level.column("id"))? else {
            return self.check_orphans(depth);
        };
        if slot.is_none() {
            let fact = VisibilityFact::decode(self.row, level.prefix, self.audience)?;
            let mut chain = self.facts[..depth.min(self.facts.len())].to_vec();
            chain.push(fact);
            if !is_visible(&chain) {
                if level.policy == LinkPolicy::Require {
                    *self.excluded = true;
                }
                return Ok(());
            }
            let Some(head) = N::decode_head(self.row, level)? else {
                return Ok(());
            };
            self.facts.truncate(depth);
            self.facts.push(fact);
            *slot = Some(Box::new(head));
        }
        let Some(node) = slot.as_deref_mut() else {
            return Ok(());
        };
        if node.id() != id {
            log::debug!(
                "root {} carries a second {} id {id}; keeping {}",
                self.root_id,
                level.prefix,
                node.id()
            );
            return Ok(());
        }
        self.absorb_level(node, depth)
    }

    /// A null id at `depth` with a non-null id further down the chain.
    fn check_orphans(&mut self, depth: usize) -> CatalogResult<()> {
        let levels = self.levels;
        let missing = &levels[depth];
        for deeper in &levels[depth + 1..] {
            if self.row.get_id(&deeper.column("id"))?.is_none() {
                continue;
            }
            let anomaly = IntegrityAnomaly {
                root_id: self.root_id,
                level: deeper.prefix,
                missing_ancestor: missing.prefix,
            };
            if !self.anomalies.contains(&anomaly) {
                if self.log_anomalies {
                    log::warn!(
                        "integrity anomaly under root {}: '{}' present without '{}'",
                        anomaly.root_id,
                        anomaly.level,
                        anomaly.missing_ancestor
                    );
                }
                self.anomalies.push(anomaly);
            }
            break;
        }
        Ok(())
    }
}

/// Row-by-row state machine for one materialization pass.
pub struct Assembler<N: Node> {
    shape: ChainShape,
    audience: Audience,
    root_id_column: String,
    state: AssemblerState<N>,
    dedup: ChildDeduplicator,
    anomalies: Vec<IntegrityAnomaly>,
    log_anomalies: bool,
}

impl<N: Node> Assembler<N> {
    pub fn new(shape: ChainShape, audience: Audience) -> CatalogResult<Self> {
        if shape.root().kind != N::KIND {
            return Err(CatalogError::invalid(format!(
                "chain shape {shape:?} does not produce {} roots",
                N::KIND.as_str()
            )));
        }
        Ok(Self {
            shape,
            audience,
            root_id_column: shape.root().column("id"),
            state: AssemblerState::NoRoot,
            dedup: ChildDeduplicator::new(),
            anomalies: Vec::new(),
            log_anomalies: true,
        })
    }

    pub fn log_anomalies(mut self, enabled: bool) -> Self {
        self.log_anomalies = enabled;
        self
    }

    pub fn classify<R: RowView + ?Sized>(&self, row: &R) -> CatalogResult<RowClass> {
        let Some(id) = row.get_id(&self.root_id_column)? else {
            return Ok(RowClass::Discard);
        };
        match &self.state {
            AssemblerState::Building(current) if current.root.id() == id => Ok(RowClass::SameRoot),
            AssemblerState::Done => Err(CatalogError::invalid("assembler already finished")),
            _ => Ok(RowClass::NewRoot),
        }
    }

    /// Hands back the root being built, if it survived visibility checks.
    pub fn take_complete(&mut self) -> Option<N> {
        match std::mem::replace(&mut self.state, AssemblerState::NoRoot) {
            AssemblerState::Building(done) => {
                self.dedup.reset();
                if done.excluded {
                    log::debug!("root {} dropped by chain visibility", done.root.id());
                    None
                } else {
                    Some(done.root)
                }
            }
            AssemblerState::Done => {
                self.state = AssemblerState::Done;
                None
            }
            AssemblerState::NoRoot => None,
        }
    }

    /// Starts a root from its first row. The previous root must have been
    /// taken with [`Assembler::take_complete`].
    pub fn begin<R: RowView + ?Sized>(&mut self, row: &R) -> CatalogResult<()> {
        let level = self.shape.root();
        let Some(root) = N::decode_head(row, level)? else {
            return Ok(());
        };
        let fact = VisibilityFact::decode(row, level.prefix, &self.audience)?;
        self.state = AssemblerState::Building(InProgress {
            root,
            excluded: !is_visible(&[fact]),
            facts: vec![fact],
        });
        self.absorb(row)
    }

    /// Merges a further row of the current root.
    pub fn absorb<R: RowView + ?Sized>(&mut self, row: &R) -> CatalogResult<()> {
        let AssemblerState::Building(current) = &mut self.state else {
            return Ok(());
        };
        if current.excluded {
            return Ok(());
        }
        let mut pass = RowPass {
            row,
            levels: self.shape.levels(),
            audience: &self.audience,
            root_id: current.root.id(),
            dedup: &mut self.dedup,
            facts: &mut current.facts,
            excluded: &mut current.excluded,
            anomalies: &mut self.anomalies,
            log_anomalies: self.log_anomalies,
        };
        pass.absorb_level(&mut current.root, 0)
    }

    /// End of stream: returns the last root and stops accepting rows.
    pub fn finish(&mut self) -> Option<N> {
        let last = self.take_complete();
        self.state = AssemblerState::Done;
        last
    }

    pub fn anomalies(&self) -> &[IntegrityAnomaly] {
        &self.anomalies
    }

    pub fn into_anomalies(self) -> Vec<IntegrityAnomaly> {
        self.anomalies
    }
}

#[derive(Clone, Debug)]
pub struct Materialized<N> {
    pub items: Vec<N>,
    pub anomalies: Vec<IntegrityAnomaly>,
}

/// Generic materializer, parameterized by the chain shape a query joins.
#[derive(Clone, Debug)]
pub struct Materializer {
    shape: ChainShape,
    audience: Audience,
    log_anomalies: bool,
}

impl Materializer {
    pub fn new(shape: ChainShape, audience: Audience) -> Self {
        Self {
            shape,
            audience,
            log_anomalies: true,
        }
    }

    pub fn log_anomalies(mut self, enabled: bool) -> Self {
        self.log_anomalies = enabled;
        self
    }

    pub fn shape(&self) -> ChainShape {
        self.shape
    }

    pub fn audience(&self) -> &Audience {
        &self.audience
    }

    pub async fn materialize<N, S>(
        &self,
        source: S,
        mut window: PaginationWindow,
    ) -> CatalogResult<Materialized<N>>
    where
        N: Node,
        S: RowSource,
    {
        let mut cursor = CursorGuard::new(source);
        let mut assembler =
            Assembler::<N>::new(self.shape, self.audience)?.log_anomalies(self.log_anomalies);
        let mut items = Vec::new();
        if window.limit() == 0 || window.is_full() {
            cursor.release();
            return Ok(Materialized {
                items,
                anomalies: Vec::new(),
            });
        }

        while let Some(row) = cursor.next_row().await? {
            match assembler.classify(&row)? {
                RowClass::Discard => {}
                RowClass::SameRoot => assembler.absorb(&row)?,
                RowClass::NewRoot => {
                    if let Some(root) = assembler.take_complete()
                        && window.offer(root.id()) == Offer::Accept
                    {
                        items.push(root);
                        if window.is_full() {
                            log::debug!("window full after {} roots; closing cursor", items.len());
                            break;
                        }
                    }
                    assembler.begin(&row)?;
                }
            }
        }
        if !window.is_full()
            && let Some(root) = assembler.finish()
            && window.offer(root.id()) == Offer::Accept
        {
            items.push(root);
        }
        cursor.release();
        Ok(Materialized {
            items,
            anomalies: assembler.into_anomalies(),
        })
    }
}
