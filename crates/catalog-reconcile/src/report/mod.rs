//! Report sinks for reconciliation results.
//!
//! The [`ReportSink`] trait decouples persistence from the reconciler, which
//! holds an `Arc<dyn ReportSink>` without knowing where reports end up:
//!
//! - [`FileReportSink`]: append-only text files in a report directory
//! - [`NoOpReportSink`]: discards everything (dry runs)

mod file;
mod noop;

pub use file::{render_field_diffs, render_mismatch, FileReportSink};
pub use noop::NoOpReportSink;

use async_trait::async_trait;

use crate::core::CatalogEntityKind;
use crate::error::Result;
use crate::verify::{FieldDiff, MismatchReport};

/// Destination for reconciliation reports.
///
/// Implementations must be `Send + Sync`; the reconciler shares one sink
/// across entity kinds.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Persist the ID-set comparison for one entity kind.
    async fn emit_mismatch(&self, report: &MismatchReport) -> Result<()>;

    /// Persist the spot-check differences for one entity kind.
    ///
    /// Called even when `diffs` is empty so every run leaves a trace.
    async fn emit_field_diffs(&self, kind: CatalogEntityKind, diffs: &[FieldDiff]) -> Result<()>;

    /// Sink name for logging.
    fn sink_type(&self) -> &'static str;
}
