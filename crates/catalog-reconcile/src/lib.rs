//! # catalog-reconcile
//!
//! Consistency checker between a relational catalog database (MySQL) and the
//! search index derived from it (MongoDB).
//!
//! For each entity kind (series, product) the library can:
//!
//! - **Compare live ID sets** of both stores using keyset pagination
//! - **Spot-check** `last_modified_time` for every live catalog ID
//! - **Re-derive index documents** through the catalog ETL query and diff
//!   them field by field against what the index currently holds
//!
//! Results are reported, never repaired.
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_reconcile::{CatalogEntityKind, Config, Reconciler};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> catalog_reconcile::Result<()> {
//! let config = Config::load("config.yaml")?.with_auto_tuning();
//! let reconciler = Reconciler::connect(&config).await?;
//! let cutoff = chrono::Utc::now().timestamp();
//! let outcome = reconciler
//!     .run_id_reconciliation(CatalogEntityKind::Series, cutoff, &CancellationToken::new())
//!     .await?;
//! println!("{} IDs only in the catalog", outcome.report.only_in_relational.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod etl;
pub mod fetch;
pub mod orchestrator;
pub mod pagination;
pub mod query;
pub mod report;
pub mod verify;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::{Config, DocumentConfig, DocumentKeyType, ReconcileConfig, RelationalConfig};
pub use core::{
    CatalogEntityKind, DocumentFilter, DocumentStore, EntityId, FieldValue, IdSet, Record,
    RelationalExecutor,
};
pub use error::{ReconcileError, Result};
pub use etl::EtlTransform;
pub use orchestrator::{HealthCheckResult, ReconcileSettings, ReconciliationOutcome, Reconciler};
pub use pagination::{PageSource, PaginationCursor};
pub use report::{FileReportSink, NoOpReportSink, ReportSink};
pub use verify::{FieldDiff, MismatchReport, RecordDiff, ValueDiff};
