//! Post-fetch normalization of denormalized rows.

use crate::core::{CatalogEntityKind, FieldValue, Record};

/// Split comma-joined text into a sorted, deduplicated, lower-cased token list.
///
/// Returns `None` when no non-blank token remains, so callers can leave the
/// field absent instead of storing an empty set.
pub fn split_delimited(text: &str) -> Option<Vec<String>> {
    let mut tokens: Vec<String> = text
        .split(',')
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect();
    tokens.sort();
    tokens.dedup();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens)
    }
}

/// Normalize one ETL row in place.
///
/// Delimited fields of `kind` become string lists. A delimited field that is
/// null, non-text or blank is removed. Other null columns are kept as null so
/// they compare equal to an absent document field.
pub fn normalize_record(kind: CatalogEntityKind, record: &mut Record) {
    for field in kind.delimited_fields() {
        let split = match record.get(*field) {
            Some(FieldValue::Text(text)) => split_delimited(text),
            Some(FieldValue::List(items)) => {
                let joined: Vec<&str> = items.iter().filter_map(FieldValue::as_str).collect();
                split_delimited(&joined.join(","))
            }
            _ => None,
        };

        match split {
            Some(tokens) => {
                record.insert(
                    (*field).to_string(),
                    FieldValue::List(tokens.into_iter().map(FieldValue::Text).collect()),
                );
            }
            None => {
                record.remove(*field);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lowercases_trims_and_dedups() {
        assert_eq!(
            split_delimited("Drama, drama ,Thriller"),
            Some(vec!["drama".to_string(), "thriller".to_string()])
        );
    }

    #[test]
    fn test_split_blank_is_none() {
        assert_eq!(split_delimited(""), None);
        assert_eq!(split_delimited(" , ,"), None);
    }

    #[test]
    fn test_normalize_absent_not_empty() {
        let mut record = Record::new();
        record.insert("keyword".into(), FieldValue::Null);
        record.insert("tag_names".into(), FieldValue::from("  "));
        record.insert("actor_names".into(), FieldValue::from("B,a"));
        record.insert("name".into(), FieldValue::from("Keep Me"));

        normalize_record(CatalogEntityKind::Series, &mut record);

        assert!(!record.contains_key("keyword"));
        assert!(!record.contains_key("tag_names"));
        assert!(!record.contains_key("alternative_names"));
        assert_eq!(record["actor_names"], FieldValue::from(vec!["a", "b"]));
        assert_eq!(record["name"], FieldValue::from("Keep Me"));
    }

    #[test]
    fn test_product_fields() {
        let mut record = Record::new();
        record.insert("guest_tag_names".into(), FieldValue::from("Host,Guest,host"));
        record.insert("tag_names".into(), FieldValue::from("Not,Split"));

        normalize_record(CatalogEntityKind::Product, &mut record);

        assert_eq!(record["guest_tag_names"], FieldValue::from(vec!["guest", "host"]));
        assert_eq!(record["tag_names"], FieldValue::from("Not,Split"));
    }
}
