//! `last_modified_time` spot check for IDs live in the catalog.
//!
//! Each ID costs one relational and one document round trip; IDs are checked
//! through a bounded fan-out and the results collected from the stream.

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::config::DocumentKeyType;
use crate::core::{
    CatalogEntityKind, DocumentStore, EntityId, FieldValue, IdSet, RelationalExecutor, SqlParam,
    ID_FIELD,
};
use crate::error::{ReconcileError, Result};
use crate::query::audit_projection_query;

use super::types::FieldDiff;

/// Field compared by the spot check.
pub const LAST_MODIFIED_FIELD: &str = "last_modified_time";

/// Compares `last_modified_time` per ID across both stores.
pub struct FieldSpotChecker<'a> {
    relational: &'a dyn RelationalExecutor,
    document: &'a dyn DocumentStore,
    key_type: DocumentKeyType,
    workers: usize,
}

impl<'a> FieldSpotChecker<'a> {
    pub fn new(
        relational: &'a dyn RelationalExecutor,
        document: &'a dyn DocumentStore,
        key_type: DocumentKeyType,
        workers: usize,
    ) -> Self {
        Self {
            relational,
            document,
            key_type,
            workers: workers.max(1),
        }
    }

    /// Check every ID in `ids`, returning differences sorted by entity ID.
    ///
    /// IDs missing from either store are skipped. A failure on one ID is
    /// logged and does not affect the others.
    pub async fn check(&self, kind: CatalogEntityKind, ids: &IdSet) -> Vec<FieldDiff> {
        let mut diffs: Vec<FieldDiff> = stream::iter(ids.iter())
            .map(|id| async move {
                match self.check_one(kind, id).await {
                    Ok(diff) => diff,
                    Err(e) => {
                        warn!("{} {}: spot check skipped: {}", kind, id, e);
                        None
                    }
                }
            })
            .buffer_unordered(self.workers)
            .filter_map(futures::future::ready)
            .collect()
            .await;

        diffs.sort_by_key(|d| (d.entity_id.parse::<EntityId>().ok(), d.entity_id.clone()));
        debug!("{}: {} of {} IDs drifted", kind, diffs.len(), ids.len());
        diffs
    }

    async fn check_one(&self, kind: CatalogEntityKind, id: &str) -> Result<Option<FieldDiff>> {
        let entity_id: EntityId = id.parse().map_err(|_| {
            ReconcileError::query_failed("relational", format!("non-integer {} id {:?}", kind, id))
        })?;

        let rows = self
            .relational
            .execute(&audit_projection_query(kind), &[SqlParam::Int(entity_id)])
            .await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        let key = self.key_type.key_for(id)?;
        let projection = [ID_FIELD, LAST_MODIFIED_FIELD];
        let Some(doc) = self
            .document
            .find_one(kind.collection(), &key, Some(&projection[..]))
            .await?
        else {
            return Ok(None);
        };

        let relational_value = present(row.get(LAST_MODIFIED_FIELD));
        let document_value = present(doc.get(LAST_MODIFIED_FIELD));
        if relational_value == document_value {
            return Ok(None);
        }

        Ok(Some(FieldDiff {
            entity_id: id.to_string(),
            field: LAST_MODIFIED_FIELD.to_string(),
            relational_value,
            document_value,
        }))
    }
}

fn present(value: Option<&FieldValue>) -> Option<FieldValue> {
    value.filter(|v| !v.is_null()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Record;
    use crate::testing::{catalog_row, index_doc, FakeCatalogDb, FakeSearchIndex};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks how many audit queries are running at once.
    struct InFlightCounter {
        inner: FakeCatalogDb,
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl RelationalExecutor for InFlightCounter {
        async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Record>> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            let rows = self.inner.execute(sql, params).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            rows
        }

        async fn ping(&self) -> Result<()> {
            self.inner.ping().await
        }

        fn store_type(&self) -> &'static str {
            "counting"
        }

        async fn close(&self) {}
    }

    fn ids(values: &[&str]) -> IdSet {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_reports_only_drifted_ids() {
        let db = FakeCatalogDb::new()
            .with_row(CatalogEntityKind::Series, catalog_row(1, 0, 500, 10))
            .with_row(CatalogEntityKind::Series, catalog_row(2, 0, 500, 20))
            .with_row(CatalogEntityKind::Series, catalog_row(10, 0, 500, 30));
        let index = FakeSearchIndex::new()
            .with_doc("series", index_doc(FieldValue::Int(1), 0, 500, 10))
            .with_doc("series", index_doc(FieldValue::Int(2), 0, 500, 21))
            .with_doc("series", index_doc(FieldValue::Int(10), 0, 500, 31));

        let checker = FieldSpotChecker::new(&db, &index, DocumentKeyType::Int, 4);
        let diffs = checker
            .check(CatalogEntityKind::Series, &ids(&["1", "2", "10"]))
            .await;

        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].entity_id, "2");
        assert_eq!(diffs[0].relational_value, Some(FieldValue::Int(20)));
        assert_eq!(diffs[0].document_value, Some(FieldValue::Int(21)));
        assert_eq!(diffs[1].entity_id, "10");
        assert_eq!(diffs[1].field, LAST_MODIFIED_FIELD);
    }

    #[tokio::test]
    async fn test_missing_on_either_side_is_skipped() {
        let db = FakeCatalogDb::new()
            .with_row(CatalogEntityKind::Product, catalog_row(1, 0, 500, 10));
        let index = FakeSearchIndex::new()
            .with_doc("product", index_doc(FieldValue::Int(2), 0, 500, 99));

        let checker = FieldSpotChecker::new(&db, &index, DocumentKeyType::Int, 2);
        let diffs = checker
            .check(CatalogEntityKind::Product, &ids(&["1", "2"]))
            .await;
        assert!(diffs.is_empty());
    }

    #[tokio::test]
    async fn test_string_keys_are_looked_up_as_text() {
        let db = FakeCatalogDb::new()
            .with_row(CatalogEntityKind::Series, catalog_row(5, 0, 500, 10));
        let index = FakeSearchIndex::new()
            .with_doc("series", index_doc(FieldValue::from("5"), 0, 500, 11));

        let as_int = FieldSpotChecker::new(&db, &index, DocumentKeyType::Int, 1);
        assert!(as_int.check(CatalogEntityKind::Series, &ids(&["5"])).await.is_empty());

        let as_text = FieldSpotChecker::new(&db, &index, DocumentKeyType::String, 1);
        let diffs = as_text.check(CatalogEntityKind::Series, &ids(&["5"])).await;
        assert_eq!(diffs.len(), 1);
    }

    #[tokio::test]
    async fn test_per_id_failure_is_isolated() {
        let db = FakeCatalogDb::new()
            .with_row(CatalogEntityKind::Series, catalog_row(1, 0, 500, 10));
        let index = FakeSearchIndex::new()
            .with_doc("series", index_doc(FieldValue::Int(1), 0, 500, 11));

        let checker = FieldSpotChecker::new(&db, &index, DocumentKeyType::Int, 2);
        let diffs = checker
            .check(CatalogEntityKind::Series, &ids(&["1", "not-a-number"]))
            .await;
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].entity_id, "1");
    }

    #[tokio::test]
    async fn test_fan_out_is_bounded_by_workers() {
        let db = (1..=12).fold(FakeCatalogDb::new(), |db, id| {
            db.with_row(CatalogEntityKind::Series, catalog_row(id, 0, 500, 10))
        });
        let db = InFlightCounter {
            inner: db,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };
        let index = (1..=12).fold(FakeSearchIndex::new(), |index, id| {
            index.with_doc("series", index_doc(FieldValue::Int(id), 0, 500, 11))
        });
        let all: IdSet = (1..=12).map(|id: i64| id.to_string()).collect();

        let checker = FieldSpotChecker::new(&db, &index, DocumentKeyType::Int, 3);
        let diffs = checker.check(CatalogEntityKind::Series, &all).await;

        assert_eq!(diffs.len(), 12);
        assert_eq!(db.peak.load(Ordering::SeqCst), 3);
        assert_eq!(db.current.load(Ordering::SeqCst), 0);
    }
}
