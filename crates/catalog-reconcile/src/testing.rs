//! In-memory fakes of both stores and the report sink.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::{
    CatalogEntityKind, DocumentFilter, DocumentStore, FieldValue, FindOptions, Record,
    RelationalExecutor, SqlParam, ID_FIELD,
};
use crate::error::{ReconcileError, Result};
use crate::query::{audit_projection_query, etl_id_list_count, etl_query, live_id_page_query};
use crate::report::ReportSink;
use crate::verify::{FieldDiff, MismatchReport, LAST_MODIFIED_FIELD};

/// A catalog row keyed by `_id`; [`FakeCatalogDb::with_row`] renames the key
/// to the kind's ID column.
pub fn catalog_row(id: i64, is_deleted: i64, schedule_end_time: i64, modified: i64) -> Record {
    let mut row = Record::new();
    row.insert(ID_FIELD.into(), FieldValue::Int(id));
    row.insert("is_deleted".into(), FieldValue::Int(is_deleted));
    row.insert("schedule_end_time".into(), FieldValue::Int(schedule_end_time));
    row.insert(LAST_MODIFIED_FIELD.into(), FieldValue::Int(modified));
    row
}

/// An indexed document.
pub fn index_doc(id: FieldValue, is_deleted: i64, schedule_end_time: i64, modified: i64) -> Record {
    let mut doc = Record::new();
    doc.insert(ID_FIELD.into(), id);
    doc.insert("is_deleted".into(), FieldValue::Int(is_deleted));
    doc.insert("schedule_end_time".into(), FieldValue::Int(schedule_end_time));
    doc.insert(LAST_MODIFIED_FIELD.into(), FieldValue::Int(modified));
    doc
}

fn int_param(param: &SqlParam) -> Option<i64> {
    match param {
        SqlParam::Int(v) => Some(*v),
        SqlParam::Text(s) => s.parse().ok(),
    }
}

/// Catalog database that answers the statements built in `crate::query`.
#[derive(Default)]
pub struct FakeCatalogDb {
    rows: BTreeMap<CatalogEntityKind, Vec<Record>>,
    etl_rows: BTreeMap<CatalogEntityKind, Vec<Record>>,
    unavailable: bool,
    statements: Mutex<Vec<(String, Vec<SqlParam>)>>,
    closed: AtomicBool,
}

impl FakeCatalogDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row(mut self, kind: CatalogEntityKind, mut row: Record) -> Self {
        if let Some(id) = row.remove(ID_FIELD) {
            row.insert(kind.id_column().to_string(), id);
        }
        self.rows.entry(kind).or_default().push(row);
        self
    }

    /// Rows returned by the ETL statement, before normalization.
    pub fn with_etl_rows(mut self, kind: CatalogEntityKind, rows: Vec<Record>) -> Self {
        self.etl_rows.entry(kind).or_default().extend(rows);
        self
    }

    /// Fail every statement as a transport error.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn statements_executed(&self) -> usize {
        self.statements.lock().unwrap().len()
    }

    pub fn last_statement(&self) -> Option<(String, Vec<SqlParam>)> {
        self.statements.lock().unwrap().last().cloned()
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap()
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn id_of(kind: CatalogEntityKind, row: &Record) -> i64 {
        row.get(kind.id_column())
            .and_then(FieldValue::as_i64)
            .unwrap_or_default()
    }

    fn page(&self, kind: CatalogEntityKind, params: &[SqlParam]) -> Vec<Record> {
        let ints: Vec<i64> = params.iter().filter_map(int_param).collect();
        let (after, cutoff, limit) = match ints.as_slice() {
            [after, cutoff, limit] => (Some(*after), *cutoff, *limit as usize),
            [cutoff, limit] => (None, *cutoff, *limit as usize),
            _ => panic!("unexpected page params {:?}", params),
        };

        let mut ids: Vec<i64> = self
            .rows
            .get(&kind)
            .into_iter()
            .flatten()
            .filter(|row| row.get("is_deleted").and_then(FieldValue::as_i64) == Some(0))
            .filter(|row| {
                row.get("schedule_end_time")
                    .and_then(FieldValue::as_i64)
                    .map_or(false, |end| end > cutoff)
            })
            .map(|row| Self::id_of(kind, row))
            .filter(|id| after.map_or(true, |a| *id > a))
            .collect();
        ids.sort_unstable();
        ids.truncate(limit);

        ids.into_iter()
            .map(|id| {
                let mut record = Record::new();
                record.insert(kind.id_column().to_string(), FieldValue::Int(id));
                record
            })
            .collect()
    }

    fn audit(&self, kind: CatalogEntityKind, params: &[SqlParam]) -> Vec<Record> {
        let id = params.first().and_then(int_param);
        self.rows
            .get(&kind)
            .into_iter()
            .flatten()
            .filter(|row| Some(Self::id_of(kind, row)) == id)
            .map(|row| {
                row.iter()
                    .filter(|(k, _)| k.as_str() == kind.id_column() || k.as_str() == LAST_MODIFIED_FIELD)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .collect()
    }

    fn etl(&self, kind: CatalogEntityKind, params: &[SqlParam]) -> Vec<Record> {
        let per_list = params.len() / etl_id_list_count(kind);
        let ids: Vec<i64> = params[..per_list].iter().filter_map(int_param).collect();
        self.etl_rows
            .get(&kind)
            .into_iter()
            .flatten()
            .filter(|row| {
                row.get(ID_FIELD)
                    .and_then(FieldValue::as_i64)
                    .map_or(false, |id| ids.contains(&id))
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RelationalExecutor for FakeCatalogDb {
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Record>> {
        self.statements
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));

        if self.unavailable {
            return Err(ReconcileError::store_unavailable("relational", "connection refused"));
        }

        for kind in CatalogEntityKind::ALL {
            if sql == live_id_page_query(kind, false) || sql == live_id_page_query(kind, true) {
                return Ok(self.page(kind, params));
            }
            if sql == audit_projection_query(kind) {
                return Ok(self.audit(kind, params));
            }
            let lists = etl_id_list_count(kind);
            if params.len() % lists == 0 && sql == etl_query(kind, params.len() / lists) {
                return Ok(self.etl(kind, params));
            }
        }

        Err(ReconcileError::query_failed("relational", format!("unrecognized statement: {}", sql)))
    }

    async fn ping(&self) -> Result<()> {
        if self.unavailable {
            return Err(ReconcileError::store_unavailable("relational", "connection refused"));
        }
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "fake-mysql"
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Search index evaluating filters with [`DocumentFilter::matches`].
#[derive(Default)]
pub struct FakeSearchIndex {
    collections: BTreeMap<String, Vec<Record>>,
    unavailable: bool,
    closed: AtomicBool,
}

impl FakeSearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doc(mut self, collection: &str, doc: Record) -> Self {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(doc);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.unavailable {
            return Err(ReconcileError::store_unavailable("document", "server selection timeout"));
        }
        Ok(())
    }

    fn project<S: AsRef<str>>(doc: &Record, fields: Option<&[S]>) -> Record {
        match fields {
            None => doc.clone(),
            Some(fields) => doc
                .iter()
                .filter(|(k, _)| {
                    k.as_str() == ID_FIELD || fields.iter().any(|f| f.as_ref() == k.as_str())
                })
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl DocumentStore for FakeSearchIndex {
    async fn find(
        &self,
        collection: &str,
        filter: &DocumentFilter,
        options: &FindOptions,
    ) -> Result<Vec<Record>> {
        self.check()?;

        let mut docs: Vec<&Record> = self
            .collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter(|doc| filter.matches(doc))
            .collect();

        if let Some(field) = &options.sort_ascending_by {
            docs.sort_by(|a, b| {
                let null = FieldValue::Null;
                a.get(field).unwrap_or(&null).cmp(b.get(field).unwrap_or(&null))
            });
        }
        if let Some(limit) = options.limit {
            docs.truncate(limit);
        }

        Ok(docs
            .into_iter()
            .map(|doc| Self::project(doc, options.projection.as_deref()))
            .collect())
    }

    async fn find_one(
        &self,
        collection: &str,
        key: &FieldValue,
        projection: Option<&[&str]>,
    ) -> Result<Option<Record>> {
        self.check()?;

        Ok(self
            .collections
            .get(collection)
            .into_iter()
            .flatten()
            .find(|doc| match (doc.get(ID_FIELD), key) {
                // Mongo matches numeric types across representations but
                // never a number against a string.
                (Some(FieldValue::Text(a)), FieldValue::Text(b)) => a == b,
                (Some(FieldValue::Text(_)), _) | (Some(_), FieldValue::Text(_)) => false,
                (Some(id), key) => id == key,
                (None, _) => false,
            })
            .map(|doc| Self::project(doc, projection)))
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }

    fn store_type(&self) -> &'static str {
        "fake-mongodb"
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Sink that keeps every emitted report in memory.
#[derive(Default)]
pub struct MemoryReportSink {
    mismatches: Mutex<Vec<MismatchReport>>,
    field_diffs: Mutex<Vec<(CatalogEntityKind, Vec<FieldDiff>)>>,
}

impl MemoryReportSink {
    pub fn mismatches(&self) -> Vec<MismatchReport> {
        self.mismatches.lock().unwrap().clone()
    }

    pub fn field_diffs(&self) -> Vec<(CatalogEntityKind, Vec<FieldDiff>)> {
        self.field_diffs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn emit_mismatch(&self, report: &MismatchReport) -> Result<()> {
        self.mismatches.lock().unwrap().push(report.clone());
        Ok(())
    }

    async fn emit_field_diffs(&self, kind: CatalogEntityKind, diffs: &[FieldDiff]) -> Result<()> {
        self.field_diffs.lock().unwrap().push((kind, diffs.to_vec()));
        Ok(())
    }

    fn sink_type(&self) -> &'static str {
        "memory"
    }
}
