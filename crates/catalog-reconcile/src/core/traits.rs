//! Collaborator traits for the two stores.
//!
//! The engine never talks to a driver directly:
//!
//! - [`RelationalExecutor`]: parameterized SQL against the catalog database
//! - [`DocumentStore`]: filtered finds and keyed lookups against the search index
//!
//! Driver implementations live in `crate::drivers`; tests use in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;

use super::record::Record;
use super::value::FieldValue;

/// Bound parameter for a relational statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Text(String),
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

/// Execute SQL against the relational system-of-record.
///
/// Rows come back as [`Record`]s keyed by column label. Transport failures
/// must surface as `StoreUnavailable`, everything else as `QueryFailed`.
#[async_trait]
pub trait RelationalExecutor: Send + Sync {
    /// Run a statement with `?` placeholders bound positionally from `params`.
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Record>>;

    /// Cheap round trip used by health checks.
    async fn ping(&self) -> Result<()>;

    /// Driver name for logging.
    fn store_type(&self) -> &'static str;

    /// Close the connection pool.
    async fn close(&self);
}

/// A single predicate in a document filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field == value`
    Eq(String, FieldValue),
    /// `field > value`
    Gt(String, FieldValue),
    /// `field` equals any of the values
    In(String, Vec<FieldValue>),
}

/// Conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    pub conditions: Vec<Condition>,
}

impl DocumentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.conditions.push(Condition::Eq(field.into(), value.into()));
        self
    }

    pub fn where_gt(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.conditions.push(Condition::Gt(field.into(), value.into()));
        self
    }

    pub fn where_in(mut self, field: impl Into<String>, values: Vec<FieldValue>) -> Self {
        self.conditions.push(Condition::In(field.into(), values));
        self
    }

    /// Evaluate the filter against a record. Missing fields never match.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, value) => record.get(field) == Some(value),
            Condition::Gt(field, value) => record
                .get(field)
                .map(|v| !v.is_null() && v > value)
                .unwrap_or(false),
            Condition::In(field, values) => record
                .get(field)
                .map(|v| values.contains(v))
                .unwrap_or(false),
        })
    }
}

/// Options for [`DocumentStore::find`].
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Fields to return. `None` returns whole documents.
    pub projection: Option<Vec<String>>,
    /// Field to sort ascending by.
    pub sort_ascending_by: Option<String>,
    /// Maximum number of documents.
    pub limit: Option<usize>,
}

/// Read access to the document-oriented search index.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find documents in `collection` matching `filter`.
    async fn find(
        &self,
        collection: &str,
        filter: &DocumentFilter,
        options: &FindOptions,
    ) -> Result<Vec<Record>>;

    /// Fetch a single document by `_id`. Absence is `Ok(None)`, not an error.
    async fn find_one(
        &self,
        collection: &str,
        key: &FieldValue,
        projection: Option<&[&str]>,
    ) -> Result<Option<Record>>;

    /// Cheap round trip used by health checks.
    async fn ping(&self) -> Result<()>;

    /// Driver name for logging.
    fn store_type(&self) -> &'static str;

    /// Shut the client down, waiting for in-flight operations.
    async fn close(&self);
}
