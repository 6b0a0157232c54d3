//! Report sink that persists nothing.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::warn;

use super::ReportSink;
use crate::core::CatalogEntityKind;
use crate::error::Result;
use crate::verify::{FieldDiff, MismatchReport};

/// Discards reports. Logs a warning on first use.
pub struct NoOpReportSink {
    warned: AtomicBool,
}

impl NoOpReportSink {
    pub fn new() -> Self {
        Self {
            warned: AtomicBool::new(false),
        }
    }

    fn warn_once(&self) {
        if !self.warned.swap(true, Ordering::SeqCst) {
            warn!("Using no-op report sink: mismatch reports will not be written");
        }
    }
}

impl Default for NoOpReportSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportSink for NoOpReportSink {
    async fn emit_mismatch(&self, _report: &MismatchReport) -> Result<()> {
        self.warn_once();
        Ok(())
    }

    async fn emit_field_diffs(&self, _kind: CatalogEntityKind, _diffs: &[FieldDiff]) -> Result<()> {
        self.warn_once();
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "noop"
    }
}
