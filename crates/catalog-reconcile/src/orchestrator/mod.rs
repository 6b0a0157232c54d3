//! Reconciliation orchestrator - main workflow coordinator.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, DocumentKeyType};
use crate::core::{
    index_by_id, CatalogEntityKind, DocumentFilter, DocumentStore, EntityId, FindOptions,
    RelationalExecutor, ID_FIELD,
};
use crate::error::{ReconcileError, Result};
use crate::etl::EtlTransform;
use crate::fetch::{fetch_document_ids, fetch_relational_ids};
use crate::report::ReportSink;
use crate::verify::{diff, reconcile, FieldDiff, FieldSpotChecker, MismatchReport, RecordDiff};

/// Tuning knobs for a [`Reconciler`].
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// Keys per pagination request.
    pub batch_size: usize,
    /// Concurrent spot-check lookups.
    pub spot_check_workers: usize,
    /// Type of `_id` in the search index.
    pub key_type: DocumentKeyType,
}

impl ReconcileSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.reconcile.batch_size,
            spot_check_workers: config.reconcile.get_spot_check_workers(),
            key_type: config.document.id_type,
        }
    }
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            batch_size: 5000,
            spot_check_workers: 8,
            key_type: DocumentKeyType::Int,
        }
    }
}

/// Coordinates fetchers, comparison passes and report persistence.
pub struct Reconciler {
    relational: Arc<dyn RelationalExecutor>,
    document: Arc<dyn DocumentStore>,
    sink: Arc<dyn ReportSink>,
    settings: ReconcileSettings,
}

/// Result of one ID reconciliation run for one entity kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    /// Unique run identifier.
    pub run_id: String,

    pub entity_kind: CatalogEntityKind,

    /// Liveness cutoff (Unix seconds) the ID sets were fetched with.
    pub cutoff: i64,

    /// ID-set comparison.
    pub report: MismatchReport,

    /// `last_modified_time` differences, sorted by entity ID.
    pub field_diffs: Vec<FieldDiff>,

    pub started_at: DateTime<Utc>,

    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,
}

impl ReconciliationOutcome {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Connectivity of both stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub relational_connected: bool,
    pub relational_latency_ms: u64,
    pub relational_error: Option<String>,
    pub document_connected: bool,
    pub document_latency_ms: u64,
    pub document_error: Option<String>,
}

impl Reconciler {
    /// Create a reconciler over existing store handles.
    pub fn new(
        relational: Arc<dyn RelationalExecutor>,
        document: Arc<dyn DocumentStore>,
        sink: Arc<dyn ReportSink>,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            relational,
            document,
            sink,
            settings,
        }
    }

    /// Connect to both stores and write reports under `config.reconcile.report_dir`.
    #[cfg(all(feature = "mysql", feature = "mongodb"))]
    pub async fn connect(config: &Config) -> Result<Self> {
        use crate::drivers::{MongoDocumentStore, MysqlExecutor};
        use crate::report::FileReportSink;

        let (relational, document) = tokio::try_join!(
            MysqlExecutor::new(
                &config.relational,
                config.reconcile.get_max_relational_connections()
            ),
            MongoDocumentStore::new(
                &config.document,
                config.reconcile.get_max_document_connections()
            ),
        )?;

        Ok(Self::new(
            Arc::new(relational),
            Arc::new(document),
            Arc::new(FileReportSink::new(config.reconcile.report_dir.clone())),
            ReconcileSettings::from_config(config),
        ))
    }

    /// Replace the report sink.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    /// Compare the live ID sets of both stores, persist the report, then
    /// spot-check `last_modified_time` for every relational ID.
    ///
    /// Cancellation is observed between steps only; an in-flight fetch runs
    /// to completion first.
    pub async fn run_id_reconciliation(
        &self,
        kind: CatalogEntityKind,
        cutoff: i64,
        cancel: &CancellationToken,
    ) -> Result<ReconciliationOutcome> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting {} reconciliation run {} (cutoff {})", kind, run_id, cutoff);

        check_cancelled(cancel)?;

        // Phase 1: Fetch both live ID sets
        info!("Phase 1: Fetching live {} IDs from both stores", kind);
        let batch_size = self.settings.batch_size;
        let (relational_ids, document_ids) = tokio::try_join!(
            fetch_relational_ids(self.relational.as_ref(), kind, cutoff, batch_size),
            fetch_document_ids(self.document.as_ref(), kind, cutoff, batch_size),
        )?;

        // Phase 2: Compare and persist
        check_cancelled(cancel)?;
        info!("Phase 2: Comparing ID sets");
        let report = reconcile(kind, &relational_ids, &document_ids);
        if !report.is_clean() {
            warn!(
                "{}: {} IDs differ between stores",
                kind,
                report.mismatch_count()
            );
        }
        self.sink.emit_mismatch(&report).await?;

        // Phase 3: Spot-check last_modified_time
        check_cancelled(cancel)?;
        info!("Phase 3: Spot-checking {} IDs", relational_ids.len());
        let checker = FieldSpotChecker::new(
            self.relational.as_ref(),
            self.document.as_ref(),
            self.settings.key_type,
            self.settings.spot_check_workers,
        );
        let field_diffs = checker.check(kind, &relational_ids).await;
        if !field_diffs.is_empty() {
            warn!("{}: {} IDs with last_modified_time drift", kind, field_diffs.len());
        }

        check_cancelled(cancel)?;
        self.sink.emit_field_diffs(kind, &field_diffs).await?;

        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        info!(
            "{} reconciliation {} complete: {} relational, {} document, {} only in relational, \
             {} only in document, {} drifted in {:.1}s",
            kind,
            run_id,
            report.relational_count,
            report.document_count,
            report.only_in_relational.len(),
            report.only_in_document.len(),
            field_diffs.len(),
            duration_seconds
        );

        Ok(ReconciliationOutcome {
            run_id,
            entity_kind: kind,
            cutoff,
            report,
            field_diffs,
            started_at,
            completed_at,
            duration_seconds,
        })
    }

    /// Denormalize `ids` from the catalog and diff them against the indexed
    /// documents with the same IDs.
    pub async fn run_record_diff(
        &self,
        kind: CatalogEntityKind,
        ids: &[EntityId],
    ) -> Result<RecordDiff> {
        if ids.is_empty() {
            return Ok(RecordDiff::new());
        }

        let expected = EtlTransform::new(self.relational.as_ref())
            .transform(kind, ids)
            .await?;

        let keys = ids
            .iter()
            .map(|id| self.settings.key_type.key_for(&id.to_string()))
            .collect::<Result<Vec<_>>>()?;
        let filter = DocumentFilter::new().where_in(ID_FIELD, keys);
        let indexed = self
            .document
            .find(kind.collection(), &filter, &FindOptions::default())
            .await?;

        let result = diff(&index_by_id(expected), &index_by_id(indexed));

        for (id, fields) in &result {
            for (field, values) in fields {
                error!(
                    "{} {} field {} differs: relational={:?} document={:?}",
                    kind, id, field, values.left, values.right
                );
            }
        }
        info!(
            "{}: {} of {} IDs differ after ETL",
            kind,
            result.len(),
            ids.len()
        );

        Ok(result)
    }

    /// Ping both stores and report latency.
    pub async fn health_check(&self) -> Result<HealthCheckResult> {
        let (relational, document) = tokio::join!(
            timed(self.relational.ping()),
            timed(self.document.ping()),
        );

        let result = HealthCheckResult {
            healthy: relational.1.is_ok() && document.1.is_ok(),
            relational_connected: relational.1.is_ok(),
            relational_latency_ms: relational.0,
            relational_error: relational.1.err().map(|e| e.to_string()),
            document_connected: document.1.is_ok(),
            document_latency_ms: document.0,
            document_error: document.1.err().map(|e| e.to_string()),
        };

        info!(
            "Health check: relational {} ({}ms), document {} ({}ms)",
            self.relational.store_type(),
            result.relational_latency_ms,
            self.document.store_type(),
            result.document_latency_ms
        );

        Ok(result)
    }

    /// Release both store connections.
    pub async fn close(&self) {
        tokio::join!(self.relational.close(), self.document.close());
        info!(
            "Closed {} and {} connections",
            self.relational.store_type(),
            self.document.store_type()
        );
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        warn!("Cancellation requested, stopping between steps");
        return Err(ReconcileError::Cancelled);
    }
    Ok(())
}

async fn timed<F>(fut: F) -> (u64, Result<()>)
where
    F: std::future::Future<Output = Result<()>>,
{
    let start = Instant::now();
    let result = fut.await;
    (start.elapsed().as_millis() as u64, result)
}
