//! MongoDB driver for the search index.
//!
//! This module is only available when the `mongodb` feature is enabled
//! (on by default).

mod convert;
mod store;

pub use convert::{bson_to_value, filter_to_document, value_to_bson};
pub use store::MongoDocumentStore;
