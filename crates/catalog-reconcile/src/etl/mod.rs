//! Denormalizing transform from the catalog database into index-shaped records.
//!
//! One statement per call joins the base table with its relation tables and
//! aggregates each relation into comma-joined text; [`normalize`] then turns
//! those into string sets.

pub mod normalize;

pub use normalize::{normalize_record, split_delimited};

use tracing::debug;

use crate::core::{CatalogEntityKind, EntityId, Record, RelationalExecutor};
use crate::error::Result;
use crate::query::{etl_params, etl_query};

/// Builds index-shaped records for a list of entity IDs.
pub struct EtlTransform<'a> {
    executor: &'a dyn RelationalExecutor,
}

impl<'a> EtlTransform<'a> {
    pub fn new(executor: &'a dyn RelationalExecutor) -> Self {
        Self { executor }
    }

    /// Denormalize `ids` of `kind`. Only live entities come back; IDs that are
    /// deleted or expired are silently absent from the result.
    pub async fn transform(&self, kind: CatalogEntityKind, ids: &[EntityId]) -> Result<Vec<Record>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = etl_query(kind, ids.len());
        let params = etl_params(kind, ids);
        let mut records = self.executor.execute(&sql, &params).await?;

        for record in &mut records {
            normalize_record(kind, record);
        }

        debug!("{}: ETL produced {} records for {} ids", kind, records.len(), ids.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldValue, ID_FIELD};
    use crate::testing::FakeCatalogDb;

    #[tokio::test]
    async fn test_empty_input_does_not_query() {
        let db = FakeCatalogDb::new();
        let records = EtlTransform::new(&db)
            .transform(CatalogEntityKind::Series, &[])
            .await
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(db.statements_executed(), 0);
    }

    #[tokio::test]
    async fn test_single_statement_with_bound_ids() {
        let mut row = Record::new();
        row.insert(ID_FIELD.into(), FieldValue::Int(7));
        row.insert("keyword".into(), FieldValue::from("Drama, drama ,Thriller"));
        row.insert("guest_tag_names".into(), FieldValue::Null);
        let db = FakeCatalogDb::new().with_etl_rows(CatalogEntityKind::Product, vec![row]);

        let records = EtlTransform::new(&db)
            .transform(CatalogEntityKind::Product, &[7, 8])
            .await
            .unwrap();

        assert_eq!(db.statements_executed(), 1);
        let (sql, params) = db.last_statement().unwrap();
        assert_eq!(sql.matches('?').count(), 8);
        assert_eq!(params.len(), 8);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["keyword"], FieldValue::from(vec!["drama", "thriller"]));
        assert!(!records[0].contains_key("guest_tag_names"));
    }
}
