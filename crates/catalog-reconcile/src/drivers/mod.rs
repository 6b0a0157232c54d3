//! Store driver implementations.
//!
//! Each driver implements one of the collaborator traits from
//! [`crate::core::traits`]:
//!
//! - [`mysql`]: [`RelationalExecutor`](crate::core::RelationalExecutor) over SQLx
//! - [`mongo`]: [`DocumentStore`](crate::core::DocumentStore) over the MongoDB driver
//!
//! Both are gated behind feature flags so the engine can be built and tested
//! without either client library.

#[cfg(feature = "mongodb")]
pub mod mongo;
#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "mongodb")]
pub use mongo::MongoDocumentStore;
#[cfg(feature = "mysql")]
pub use mysql::MysqlExecutor;
