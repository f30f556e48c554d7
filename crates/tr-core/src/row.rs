//! Row shapes and the record normalizer
//!
//! A raw row may support keyed lookup (maps), named field access (records)
//! or positional iteration (sequences). The normalizer tries those
//! capabilities in that order and turns the row into a positional record
//! aligned to the table headers.

use crate::table::CellValue;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use thiserror::Error;

/// Why a single row could not be normalized
#[derive(Debug, Error)]
pub enum RowError {
    /// The row exposes none of the supported capabilities
    #[error("record must be a map, a record or a sequence: actual={0}")]
    Unsupported(String),

    /// A positional row does not line up with the headers
    #[error("record has {actual} values but there are {expected} headers")]
    LengthMismatch { expected: usize, actual: usize },

    /// A keyed row cannot be stored without headers to order it by
    #[error("keyed record requires header names")]
    KeyedWithoutHeaders,

    /// A record struct could not be serialized into fields
    #[error("failed to read record fields: {0}")]
    Fields(#[from] serde_json::Error),
}

/// Lookup by column name
pub trait KeyedRow {
    fn value(&self, key: &str) -> Option<CellValue>;
}

impl<S: BuildHasher> KeyedRow for HashMap<String, CellValue, S> {
    fn value(&self, key: &str) -> Option<CellValue> {
        self.get(key).cloned()
    }
}

impl KeyedRow for BTreeMap<String, CellValue> {
    fn value(&self, key: &str) -> Option<CellValue> {
        self.get(key).cloned()
    }
}

impl KeyedRow for serde_json::Map<String, serde_json::Value> {
    fn value(&self, key: &str) -> Option<CellValue> {
        self.get(key).map(CellValue::from)
    }
}

/// Capabilities a raw row may expose.
///
/// Every capability defaults to "not supported"; implementors override the ones
/// that apply.
pub trait RowLike {
    /// Keyed lookup (map-like rows)
    fn as_keyed(&self) -> Option<&dyn KeyedRow> {
        None
    }

    /// Named fields (record-like rows)
    fn to_fields(&self) -> Option<Vec<(String, CellValue)>> {
        None
    }

    /// Values in order (sequence-like rows)
    fn to_positional(&self) -> Option<Vec<CellValue>> {
        None
    }

    /// A lone value
    fn as_scalar(&self) -> Option<CellValue> {
        None
    }

    /// Short rendering used in error messages
    fn describe(&self) -> String {
        "<unsupported row>".to_string()
    }
}

impl<T: RowLike + ?Sized> RowLike for &T {
    fn as_keyed(&self) -> Option<&dyn KeyedRow> {
        (**self).as_keyed()
    }

    fn to_fields(&self) -> Option<Vec<(String, CellValue)>> {
        (**self).to_fields()
    }

    fn to_positional(&self) -> Option<Vec<CellValue>> {
        (**self).to_positional()
    }

    fn as_scalar(&self) -> Option<CellValue> {
        (**self).as_scalar()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<S: BuildHasher> RowLike for HashMap<String, CellValue, S> {
    fn as_keyed(&self) -> Option<&dyn KeyedRow> {
        Some(self)
    }
}

impl RowLike for BTreeMap<String, CellValue> {
    fn as_keyed(&self) -> Option<&dyn KeyedRow> {
        Some(self)
    }
}

impl RowLike for Vec<CellValue> {
    fn to_positional(&self) -> Option<Vec<CellValue>> {
        Some(self.clone())
    }
}

impl RowLike for [CellValue] {
    fn to_positional(&self) -> Option<Vec<CellValue>> {
        Some(self.to_vec())
    }
}

impl RowLike for CellValue {
    fn as_scalar(&self) -> Option<CellValue> {
        Some(self.clone())
    }

    fn describe(&self) -> String {
        format!("{:?}", self)
    }
}

impl RowLike for serde_json::Value {
    fn as_keyed(&self) -> Option<&dyn KeyedRow> {
        match self {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        }
    }

    fn to_positional(&self) -> Option<Vec<CellValue>> {
        match self {
            serde_json::Value::Array(items) => Some(items.iter().map(CellValue::from).collect()),
            _ => None,
        }
    }

    fn as_scalar(&self) -> Option<CellValue> {
        match self {
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
            other => Some(CellValue::from(other)),
        }
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

/// A raw row as produced by the loaders, tagged with its capability
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    /// Map-like row
    Keyed(BTreeMap<String, CellValue>),
    /// Record-like row with named fields
    Fields(Vec<(String, CellValue)>),
    /// Plain sequence of values
    Positional(Vec<CellValue>),
    /// A lone value; only stored when the table has no headers
    Scalar(CellValue),
}

impl RawRow {
    /// Read the named fields of any serializable record struct
    pub fn from_record<T: Serialize>(record: &T) -> Result<Self, RowError> {
        Ok(match serde_json::to_value(record)? {
            serde_json::Value::Object(map) => RawRow::Fields(
                map.into_iter()
                    .map(|(k, v)| (k, CellValue::from(v)))
                    .collect(),
            ),
            other => Self::from(other),
        })
    }
}

impl From<serde_json::Value> for RawRow {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => RawRow::Keyed(
                map.into_iter()
                    .map(|(k, v)| (k, CellValue::from(v)))
                    .collect(),
            ),
            serde_json::Value::Array(items) => {
                RawRow::Positional(items.into_iter().map(CellValue::from).collect())
            }
            other => RawRow::Scalar(CellValue::from(other)),
        }
    }
}

impl From<Vec<CellValue>> for RawRow {
    fn from(values: Vec<CellValue>) -> Self {
        RawRow::Positional(values)
    }
}

impl RowLike for RawRow {
    fn as_keyed(&self) -> Option<&dyn KeyedRow> {
        match self {
            RawRow::Keyed(map) => Some(map),
            _ => None,
        }
    }

    fn to_fields(&self) -> Option<Vec<(String, CellValue)>> {
        match self {
            RawRow::Fields(fields) => Some(fields.clone()),
            _ => None,
        }
    }

    fn to_positional(&self) -> Option<Vec<CellValue>> {
        match self {
            RawRow::Positional(values) => Some(values.clone()),
            _ => None,
        }
    }

    fn as_scalar(&self) -> Option<CellValue> {
        match self {
            RawRow::Scalar(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            RawRow::Scalar(value) => value.describe(),
            other => format!("{:?}", other),
        }
    }
}

/// Align one row to `headers`.
///
/// With empty headers a sequence row is passed through unchanged and a lone
/// value becomes a one-value record; keyed rows have no order to follow
/// there and are rejected. Otherwise
/// keyed rows are looked up header by header, record rows are turned into
/// keyed form first, and sequence rows are taken as-is but must have one
/// value per header. Missing and null keyed values become `none_value`.
pub fn normalize_row<R: RowLike + ?Sized>(
    row: &R,
    headers: &[String],
    none_value: &CellValue,
) -> Result<Vec<CellValue>, RowError> {
    if headers.is_empty() {
        if let Some(values) = row.to_positional() {
            return Ok(values);
        }
        if row.as_keyed().is_some() || row.to_fields().is_some() {
            return Err(RowError::KeyedWithoutHeaders);
        }
        if let Some(value) = row.as_scalar() {
            return Ok(vec![value]);
        }
        return Err(RowError::Unsupported(row.describe()));
    }

    if let Some(keyed) = row.as_keyed() {
        return Ok(lookup_all(keyed, headers, none_value));
    }

    if let Some(fields) = row.to_fields() {
        let keyed: BTreeMap<String, CellValue> = fields.into_iter().collect();
        return Ok(lookup_all(&keyed, headers, none_value));
    }

    if let Some(values) = row.to_positional() {
        if values.len() != headers.len() {
            return Err(RowError::LengthMismatch {
                expected: headers.len(),
                actual: values.len(),
            });
        }
        return Ok(values);
    }

    Err(RowError::Unsupported(row.describe()))
}

fn lookup_all(keyed: &dyn KeyedRow, headers: &[String], none_value: &CellValue) -> Vec<CellValue> {
    headers
        .iter()
        .map(|header| match keyed.value(header) {
            Some(value) if !value.is_null() => value,
            _ => none_value.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_keyed_row_follows_header_order() {
        let mut row = HashMap::new();
        row.insert("b".to_string(), CellValue::from(2));
        row.insert("a".to_string(), CellValue::from(1));

        let record = normalize_row(&row, &headers(&["a", "b"]), &CellValue::Null).unwrap();
        assert_eq!(record, vec![CellValue::Integer(1), CellValue::Integer(2)]);
    }

    #[test]
    fn test_keyed_row_substitutes_missing_and_null() {
        let row = json!({"a": null, "c": 5});
        let record =
            normalize_row(&row, &headers(&["a", "b", "c"]), &CellValue::from("-")).unwrap();

        assert_eq!(
            record,
            vec![CellValue::from("-"), CellValue::from("-"), CellValue::Integer(5)]
        );
    }

    #[test]
    fn test_record_struct_is_read_by_field_name() {
        #[derive(Serialize)]
        struct Item {
            name: String,
            qty: i64,
        }

        let row = RawRow::from_record(&Item {
            name: "bolt".to_string(),
            qty: 4,
        })
        .unwrap();
        assert!(matches!(row, RawRow::Fields(_)));

        let record = normalize_row(&row, &headers(&["qty", "name"]), &CellValue::Null).unwrap();
        assert_eq!(record, vec![CellValue::Integer(4), CellValue::from("bolt")]);
    }

    #[test]
    fn test_positional_row_is_unchanged() {
        let row = vec![CellValue::from("x"), CellValue::Null];
        let record = normalize_row(&row, &headers(&["a", "b"]), &CellValue::from("-")).unwrap();

        // no substitution for sequence rows
        assert_eq!(record, row);
    }

    #[test]
    fn test_positional_length_mismatch() {
        let row = RawRow::Positional(vec![1.into()]);
        let err = normalize_row(&row, &headers(&["a", "b"]), &CellValue::Null).unwrap_err();

        assert!(matches!(
            err,
            RowError::LengthMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_empty_headers_pass_sequence_through() {
        let row = json!([1, "two", null]);
        let record = normalize_row(&row, &[], &CellValue::from("-")).unwrap();

        assert_eq!(
            record,
            vec![CellValue::Integer(1), CellValue::from("two"), CellValue::Null]
        );
    }

    #[test]
    fn test_empty_headers_reject_keyed_row() {
        let row = json!({"a": 1});
        let err = normalize_row(&row, &[], &CellValue::Null).unwrap_err();
        assert!(matches!(err, RowError::KeyedWithoutHeaders));
    }

    #[test]
    fn test_scalar_row_is_unsupported() {
        let err = normalize_row(&CellValue::from(42), &headers(&["x"]), &CellValue::Null)
            .unwrap_err();

        assert!(matches!(err, RowError::Unsupported(_)));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_empty_headers_store_scalar_as_single_value() {
        let record = normalize_row(&RawRow::Scalar(42.into()), &[], &CellValue::Null).unwrap();
        assert_eq!(record, vec![CellValue::Integer(42)]);

        let record = normalize_row(&json!("solo"), &[], &CellValue::Null).unwrap();
        assert_eq!(record, vec![CellValue::from("solo")]);
    }

    #[test]
    fn test_keyed_takes_precedence_over_positional() {
        struct Both;

        impl RowLike for Both {
            fn as_keyed(&self) -> Option<&dyn KeyedRow> {
                static EMPTY: std::sync::OnceLock<BTreeMap<String, CellValue>> =
                    std::sync::OnceLock::new();
                Some(EMPTY.get_or_init(|| {
                    BTreeMap::from([("a".to_string(), CellValue::from("keyed"))])
                }))
            }

            fn to_positional(&self) -> Option<Vec<CellValue>> {
                Some(vec![CellValue::from("positional")])
            }
        }

        let record = normalize_row(&Both, &headers(&["a"]), &CellValue::Null).unwrap();
        assert_eq!(record, vec![CellValue::from("keyed")]);
    }

    #[test]
    fn test_normalizing_records_is_idempotent() {
        let hdrs = headers(&["a", "b"]);
        let first = normalize_row(&json!({"a": 1}), &hdrs, &CellValue::Null).unwrap();
        let second = normalize_row(&first, &hdrs, &CellValue::Null).unwrap();
        assert_eq!(first, second);
    }
}
