//! Core abstractions shared by every reconciliation step.
//!
//! - [`kind`]: entity kinds and their table/collection dispatch
//! - [`value`]: store-neutral field values
//! - [`record`]: records, identifiers and ID sets
//! - [`traits`]: collaborator traits for the relational and document stores
//!
//! The engine depends only on these types; drivers translate to and from them.

pub mod kind;
pub mod record;
pub mod traits;
pub mod value;

pub use kind::CatalogEntityKind;
pub use record::{index_by_id, EntityId, IdSet, NormalizedId, Record, ID_FIELD};
pub use traits::{
    Condition, DocumentFilter, DocumentStore, FindOptions, RelationalExecutor, SqlParam,
};
pub use value::FieldValue;
