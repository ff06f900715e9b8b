pub mod api;
pub mod assemble;
pub mod chain;
pub mod counter;
pub mod decode;
pub mod dedup;
pub mod error;
pub mod ids;
pub mod memory;
pub mod model;
pub mod source;
pub mod visibility;
pub mod window;

pub use api::*;
pub use assemble::{Assembler, IntegrityAnomaly, Materialized, Materializer, RowClass};
pub use chain::{ChainShape, Level, LinkPolicy, Node, Relation, Slot};
pub use counter::{Page, RootCounter, fetch_page};
pub use decode::{DecodeGroup, RowView, column, decode_group};
pub use dedup::ChildDeduplicator;
pub use error::{CatalogError, CatalogResult};
pub use ids::*;
pub use model::*;
pub use source::{CursorGuard, RowSource};
pub use visibility::{Audience, VisibilityFact, is_visible};
pub use window::{Offer, PaginationWindow};
