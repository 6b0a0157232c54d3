//! Catalog entity kinds and their per-store naming.
//!
//! Everything that differs between series and products (table, collection,
//! key column, delimited fields) is resolved here through a match on the enum,
//! never by building names from strings at runtime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// Entity kinds that exist in both the catalog database and the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogEntityKind {
    Series,
    Product,
}

impl CatalogEntityKind {
    /// All kinds, in the order a full run processes them.
    pub const ALL: [CatalogEntityKind; 2] = [CatalogEntityKind::Series, CatalogEntityKind::Product];

    /// Lower-case name used in logs, report file names and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogEntityKind::Series => "series",
            CatalogEntityKind::Product => "product",
        }
    }

    /// Base table in the catalog database.
    pub fn table(&self) -> &'static str {
        match self {
            CatalogEntityKind::Series => "series",
            CatalogEntityKind::Product => "product",
        }
    }

    /// Primary key column of the base table.
    pub fn id_column(&self) -> &'static str {
        match self {
            CatalogEntityKind::Series => "series_id",
            CatalogEntityKind::Product => "product_id",
        }
    }

    /// Collection in the search index.
    pub fn collection(&self) -> &'static str {
        match self {
            CatalogEntityKind::Series => "series",
            CatalogEntityKind::Product => "product",
        }
    }

    /// Fields the ETL query returns as comma-joined text and the index
    /// stores as string sets.
    pub fn delimited_fields(&self) -> &'static [&'static str] {
        match self {
            CatalogEntityKind::Series => &["keyword", "actor_names", "alternative_names", "tag_names"],
            CatalogEntityKind::Product => &["keyword", "guest_tag_names"],
        }
    }
}

impl fmt::Display for CatalogEntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogEntityKind {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "series" => Ok(CatalogEntityKind::Series),
            "product" => Ok(CatalogEntityKind::Product),
            other => Err(ReconcileError::Config(format!(
                "unknown entity kind '{}', expected 'series' or 'product'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for kind in CatalogEntityKind::ALL {
            assert_eq!(kind.as_str().parse::<CatalogEntityKind>().unwrap(), kind);
        }
        assert_eq!(" Series ".parse::<CatalogEntityKind>().unwrap(), CatalogEntityKind::Series);
    }

    #[test]
    fn test_unknown_kind_is_config_error() {
        let err = "tag_actor".parse::<CatalogEntityKind>().unwrap_err();
        assert!(matches!(err, ReconcileError::Config(_)));
    }

    #[test]
    fn test_delimited_fields() {
        assert_eq!(CatalogEntityKind::Series.delimited_fields().len(), 4);
        assert_eq!(
            CatalogEntityKind::Product.delimited_fields(),
            &["keyword", "guest_tag_names"]
        );
    }
}
