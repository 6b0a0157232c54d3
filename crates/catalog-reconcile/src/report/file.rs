//! Append-only text reports.
//!
//! Two files per entity kind live in the report directory:
//! `{kind}_id_mismatch.txt` and `{kind}_last_modified_time_mismatch.txt`.
//! Each run appends one block headed by its UTC timestamp.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::ReportSink;
use crate::core::{CatalogEntityKind, FieldValue, IdSet};
use crate::error::Result;
use crate::verify::{FieldDiff, MismatchReport, LAST_MODIFIED_FIELD};

/// Writes reports as text files under a directory.
pub struct FileReportSink {
    dir: PathBuf,
}

impl FileReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the ID mismatch report for `kind`.
    pub fn mismatch_path(&self, kind: CatalogEntityKind) -> PathBuf {
        self.dir.join(format!("{}_id_mismatch.txt", kind))
    }

    /// Path of the `last_modified_time` report for `kind`.
    pub fn field_diff_path(&self, kind: CatalogEntityKind) -> PathBuf {
        self.dir
            .join(format!("{}_{}_mismatch.txt", kind, LAST_MODIFIED_FIELD))
    }

    async fn append(&self, path: &Path, block: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(block.as_bytes()).await?;
        file.flush().await?;
        debug!("Appended {} bytes to {}", block.len(), path.display());
        Ok(())
    }
}

#[async_trait]
impl ReportSink for FileReportSink {
    async fn emit_mismatch(&self, report: &MismatchReport) -> Result<()> {
        let block = render_mismatch(report, Utc::now());
        self.append(&self.mismatch_path(report.entity_kind), &block)
            .await
    }

    async fn emit_field_diffs(&self, kind: CatalogEntityKind, diffs: &[FieldDiff]) -> Result<()> {
        let block = render_field_diffs(diffs, Utc::now());
        self.append(&self.field_diff_path(kind), &block).await
    }

    fn sink_type(&self) -> &'static str {
        "file"
    }
}

fn header(at: DateTime<Utc>) -> String {
    format!("=== {} ===\n", at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn write_ids(out: &mut String, ids: &IdSet) {
    for id in ids {
        let _ = writeln!(out, "{}", id);
    }
}

/// Text block for an ID mismatch report.
pub fn render_mismatch(report: &MismatchReport, at: DateTime<Utc>) -> String {
    let mut out = header(at);
    let _ = writeln!(out, "relational ids count: {}", report.relational_count);
    let _ = writeln!(out, "document ids count: {}", report.document_count);
    let _ = writeln!(
        out,
        "relational ids not in document count: {}",
        report.only_in_relational.len()
    );
    write_ids(&mut out, &report.only_in_relational);
    let _ = writeln!(
        out,
        "document ids not in relational count: {}",
        report.only_in_document.len()
    );
    write_ids(&mut out, &report.only_in_document);
    out.push('\n');
    out
}

fn side(value: &Option<FieldValue>) -> String {
    value
        .as_ref()
        .map_or_else(|| "<absent>".to_string(), ToString::to_string)
}

/// Text block for spot-check differences, one ID per line with both values.
pub fn render_field_diffs(diffs: &[FieldDiff], at: DateTime<Utc>) -> String {
    let mut out = header(at);
    let _ = writeln!(out, "mismatch count: {}", diffs.len());
    for diff in diffs {
        let _ = writeln!(
            out,
            "{} relational={} document={}",
            diff.entity_id,
            side(&diff.relational_value),
            side(&diff.document_value)
        );
    }
    out.push('\n');
    out
}
