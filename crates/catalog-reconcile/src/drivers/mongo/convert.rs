//! BSON conversions for the search index.

use mongodb::bson::{self, doc, Bson, Document};

use crate::core::{Condition, DocumentFilter, FieldValue, Record};

/// Convert a BSON value into a store-neutral field value.
pub fn bson_to_value(value: Bson) -> FieldValue {
    match value {
        Bson::Null | Bson::Undefined => FieldValue::Null,
        Bson::Boolean(v) => FieldValue::Bool(v),
        Bson::Int32(v) => FieldValue::Int(v as i64),
        Bson::Int64(v) => FieldValue::Int(v),
        Bson::Double(v) => FieldValue::Float(v),
        Bson::String(v) => FieldValue::Text(v),
        Bson::Array(items) => FieldValue::List(items.into_iter().map(bson_to_value).collect()),
        Bson::Document(doc) => FieldValue::Map(document_to_record(doc)),
        Bson::ObjectId(oid) => FieldValue::Text(oid.to_hex()),
        Bson::DateTime(dt) => chrono::DateTime::from_timestamp_millis(dt.timestamp_millis())
            .map(|utc| FieldValue::DateTime(utc.naive_utc()))
            .unwrap_or(FieldValue::Int(dt.timestamp_millis())),
        other => FieldValue::Text(other.to_string()),
    }
}

/// Convert a field value into BSON for filters.
pub fn value_to_bson(value: &FieldValue) -> Bson {
    match value {
        FieldValue::Null => Bson::Null,
        FieldValue::Bool(v) => Bson::Boolean(*v),
        FieldValue::Int(v) => Bson::Int64(*v),
        FieldValue::Float(v) => Bson::Double(*v),
        FieldValue::Text(v) => Bson::String(v.clone()),
        FieldValue::DateTime(v) => {
            Bson::DateTime(bson::DateTime::from_millis(v.and_utc().timestamp_millis()))
        }
        FieldValue::List(items) => Bson::Array(items.iter().map(value_to_bson).collect()),
        FieldValue::Map(map) => Bson::Document(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_bson(v)))
                .collect(),
        ),
    }
}

pub fn document_to_record(doc: Document) -> Record {
    doc.into_iter()
        .map(|(k, v)| (k, bson_to_value(v)))
        .collect()
}

/// Translate a filter into a MongoDB query document.
///
/// Conditions on the same field are merged into one operator document so a
/// later condition never overwrites an earlier one.
pub fn filter_to_document(filter: &DocumentFilter) -> Document {
    let mut query = Document::new();

    for condition in &filter.conditions {
        let (field, operator, operand) = match condition {
            Condition::Eq(field, value) => (field, "$eq", value_to_bson(value)),
            Condition::Gt(field, value) => (field, "$gt", value_to_bson(value)),
            Condition::In(field, values) => (
                field,
                "$in",
                Bson::Array(values.iter().map(value_to_bson).collect()),
            ),
        };

        match query.get_mut(field) {
            Some(Bson::Document(ops)) => {
                ops.insert(operator, operand);
            }
            _ => {
                query.insert(field.clone(), doc! { operator: operand });
            }
        }
    }

    query
}

/// Inclusion projection for the given fields.
pub fn projection_document<S: AsRef<str>>(fields: &[S]) -> Document {
    fields
        .iter()
        .map(|f| (f.as_ref().to_string(), Bson::Int32(1)))
        .collect()
}
