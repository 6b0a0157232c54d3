//! Live ID set fetchers for both stores.
//!
//! Both fetchers apply the same liveness predicate
//! (`is_deleted = 0 AND schedule_end_time > cutoff`) and walk the key space
//! with a [`PaginationCursor`](crate::pagination::PaginationCursor). The
//! resulting set reflects each page's read time, not a single snapshot.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::{
    CatalogEntityKind, DocumentFilter, DocumentStore, EntityId, FieldValue, FindOptions, IdSet,
    NormalizedId, RelationalExecutor, ID_FIELD,
};
use crate::error::{ReconcileError, Result};
use crate::pagination::{collect_all, PageSource};
use crate::query::{live_id_page_params, live_id_page_query};

/// Pages live IDs out of the catalog database.
pub struct RelationalIdFetcher<'a> {
    executor: &'a dyn RelationalExecutor,
    kind: CatalogEntityKind,
    cutoff: i64,
}

impl<'a> RelationalIdFetcher<'a> {
    pub fn new(executor: &'a dyn RelationalExecutor, kind: CatalogEntityKind, cutoff: i64) -> Self {
        Self {
            executor,
            kind,
            cutoff,
        }
    }
}

#[async_trait]
impl PageSource for RelationalIdFetcher<'_> {
    type Key = EntityId;

    fn store_name(&self) -> &'static str {
        "relational"
    }

    async fn fetch_page(&self, after: Option<&EntityId>, limit: usize) -> Result<Vec<EntityId>> {
        let sql = live_id_page_query(self.kind, after.is_some());
        let params = live_id_page_params(after.copied(), self.cutoff, limit);
        let rows = self.executor.execute(&sql, &params).await?;

        let id_column = self.kind.id_column();
        rows.iter()
            .map(|row| {
                row.get(id_column)
                    .and_then(FieldValue::as_i64)
                    .ok_or_else(|| {
                        ReconcileError::query_failed(
                            "relational",
                            format!("{} row without integer {}", self.kind, id_column),
                        )
                    })
            })
            .collect()
    }
}

/// Pages live IDs out of the search index.
///
/// Keys stay in their native BSON-derived form while paging so the `_id > ?`
/// comparison happens in the store's own type.
pub struct DocumentIdFetcher<'a> {
    store: &'a dyn DocumentStore,
    kind: CatalogEntityKind,
    cutoff: i64,
}

impl<'a> DocumentIdFetcher<'a> {
    pub fn new(store: &'a dyn DocumentStore, kind: CatalogEntityKind, cutoff: i64) -> Self {
        Self {
            store,
            kind,
            cutoff,
        }
    }
}

#[async_trait]
impl PageSource for DocumentIdFetcher<'_> {
    type Key = FieldValue;

    fn store_name(&self) -> &'static str {
        "document"
    }

    async fn fetch_page(&self, after: Option<&FieldValue>, limit: usize) -> Result<Vec<FieldValue>> {
        let mut filter = DocumentFilter::new()
            .where_eq("is_deleted", 0i64)
            .where_gt("schedule_end_time", self.cutoff);
        if let Some(after) = after {
            filter = filter.where_gt(ID_FIELD, after.clone());
        }

        let options = FindOptions {
            projection: Some(vec![ID_FIELD.to_string()]),
            sort_ascending_by: Some(ID_FIELD.to_string()),
            limit: Some(limit),
        };

        let docs = self
            .store
            .find(self.kind.collection(), &filter, &options)
            .await?;

        docs.into_iter()
            .map(|mut doc| {
                doc.remove(ID_FIELD).ok_or_else(|| {
                    ReconcileError::query_failed(
                        "document",
                        format!("{} document without {}", self.kind, ID_FIELD),
                    )
                })
            })
            .collect()
    }
}

/// Drain a fetcher into a string-normalized ID set.
///
/// Any page failure aborts the whole fetch: a partial set would turn every
/// unread ID into a false mismatch.
pub async fn fetch_id_set<S>(source: &S, batch_size: usize) -> Result<IdSet>
where
    S: PageSource + ?Sized,
    S::Key: NormalizedId,
{
    let (keys, calls) = collect_all(source, batch_size).await?;
    let ids: IdSet = keys.iter().map(NormalizedId::normalized_id).collect();

    debug!(
        "{}: {} keys over {} page requests",
        source.store_name(),
        keys.len(),
        calls
    );
    if ids.len() != keys.len() {
        info!(
            "{}: {} keys collapsed to {} normalized IDs",
            source.store_name(),
            keys.len(),
            ids.len()
        );
    }

    Ok(ids)
}

/// Live ID set of `kind` in the catalog database.
pub async fn fetch_relational_ids(
    executor: &dyn RelationalExecutor,
    kind: CatalogEntityKind,
    cutoff: i64,
    batch_size: usize,
) -> Result<IdSet> {
    let fetcher = RelationalIdFetcher::new(executor, kind, cutoff);
    let ids = fetch_id_set(&fetcher, batch_size).await?;
    info!("{}: {} live IDs in relational store", kind, ids.len());
    Ok(ids)
}

/// Live ID set of `kind` in the search index.
pub async fn fetch_document_ids(
    store: &dyn DocumentStore,
    kind: CatalogEntityKind,
    cutoff: i64,
    batch_size: usize,
) -> Result<IdSet> {
    let fetcher = DocumentIdFetcher::new(store, kind, cutoff);
    let ids = fetch_id_set(&fetcher, batch_size).await?;
    info!("{}: {} live IDs in document store", kind, ids.len());
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{catalog_row, index_doc, FakeCatalogDb, FakeSearchIndex};

    #[tokio::test]
    async fn test_relational_ids_respect_liveness() {
        let db = FakeCatalogDb::new()
            .with_row(CatalogEntityKind::Series, catalog_row(1, 0, 200, 10))
            .with_row(CatalogEntityKind::Series, catalog_row(2, 1, 200, 10))
            .with_row(CatalogEntityKind::Series, catalog_row(3, 0, 100, 10))
            .with_row(CatalogEntityKind::Series, catalog_row(4, 0, 101, 10));

        let ids = fetch_relational_ids(&db, CatalogEntityKind::Series, 100, 2)
            .await
            .unwrap();
        assert_eq!(ids, IdSet::from(["1".to_string(), "4".to_string()]));
    }

    #[tokio::test]
    async fn test_relational_fetch_pages_until_empty() {
        let mut db = FakeCatalogDb::new();
        for id in [1, 3, 5, 7] {
            db = db.with_row(CatalogEntityKind::Product, catalog_row(id, 0, 500, 1));
        }

        let ids = fetch_relational_ids(&db, CatalogEntityKind::Product, 0, 2)
            .await
            .unwrap();
        assert_eq!(ids.len(), 4);
        assert_eq!(db.statements_executed(), 3);
    }

    #[tokio::test]
    async fn test_document_ids_normalize_mixed_key_types() {
        let index = FakeSearchIndex::new()
            .with_doc("series", index_doc(FieldValue::Int(101), 0, 500, 1))
            .with_doc("series", index_doc(FieldValue::Float(102.0), 0, 500, 1))
            .with_doc("series", index_doc(FieldValue::Int(103), 1, 500, 1))
            .with_doc("series", index_doc(FieldValue::Int(104), 0, 5, 1));

        let ids = fetch_document_ids(&index, CatalogEntityKind::Series, 10, 1)
            .await
            .unwrap();
        assert_eq!(ids, IdSet::from(["101".to_string(), "102".to_string()]));
    }

    #[tokio::test]
    async fn test_store_failure_aborts_fetch() {
        let db = FakeCatalogDb::new()
            .with_row(CatalogEntityKind::Series, catalog_row(1, 0, 200, 10))
            .unavailable();

        let err = fetch_relational_ids(&db, CatalogEntityKind::Series, 0, 10)
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
