//! Canonical table types shared by every loader

use crate::error::{Error, Result};
use crate::row::{normalize_row, RowLike};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A normalized table: name, headers and positional records.
///
/// Built once from a raw fragment and never mutated afterwards. Equality
/// compares name, headers and records only; the configured null
/// substitute does not take part.
#[derive(Debug, Clone, Serialize)]
pub struct TableData {
    #[serde(rename = "table_name")]
    name: String,
    #[serde(rename = "header_list")]
    headers: Vec<String>,
    #[serde(rename = "record_list")]
    records: Vec<Vec<CellValue>>,
    #[serde(skip)]
    none_value: CellValue,
}

impl TableData {
    /// Build a table, normalizing every row against `headers`.
    ///
    /// With empty headers rows are stored as given. The first row that
    /// cannot be normalized aborts construction with an `InvalidData` error.
    pub fn new<I, R>(
        name: impl Into<String>,
        headers: Vec<String>,
        rows: I,
        none_value: CellValue,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: RowLike,
    {
        let name = name.into();
        let mut records = Vec::new();

        for (idx, row) in rows.into_iter().enumerate() {
            let record =
                normalize_row(&row, &headers, &none_value).map_err(|source| Error::InvalidData {
                    table: name.clone(),
                    row: idx,
                    source,
                })?;
            records.push(record);
        }

        Ok(Self {
            name,
            headers,
            records,
            none_value,
        })
    }

    /// Name of the table
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header names, in column order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Normalized records
    pub fn records(&self) -> &[Vec<CellValue>] {
        &self.records
    }

    /// Value substituted for missing or null fields
    pub fn none_value(&self) -> &CellValue {
        &self.none_value
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty_header(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn is_empty_record(&self) -> bool {
        self.records.is_empty()
    }

    /// True if either the headers or the records are empty
    pub fn is_empty(&self) -> bool {
        self.is_empty_header() || self.is_empty_record()
    }

    /// Table as a keyed structure: `table_name`, `header_list`, `record_list`
    pub fn as_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "table_name": self.name,
            "header_list": self.headers,
            "record_list": self.records,
        })
    }

    /// Deterministic SHA-256 digest of name, headers and records.
    ///
    /// Stable across runs and platforms, so it can be used as a
    /// deduplication key.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();

        hasher.update(self.name.as_bytes());
        hasher.update([0x1e_u8]);
        for header in &self.headers {
            hasher.update((header.len() as u64).to_le_bytes());
            hasher.update(header.as_bytes());
        }
        hasher.update([0x1e_u8]);
        for record in &self.records {
            hasher.update((record.len() as u64).to_le_bytes());
            for value in record {
                value.feed_digest(&mut hasher);
            }
        }

        hex::encode(hasher.finalize())
    }

    /// Convert to a polars `DataFrame`, one series per header.
    ///
    /// Columns whose values are all integers (or null) become `i64`, all
    /// numbers become `f64`, all booleans become `bool`; anything else is
    /// rendered as strings.
    #[cfg(feature = "dataframe")]
    pub fn as_dataframe(&self) -> Result<polars::prelude::DataFrame> {
        use polars::prelude::{DataFrame, NamedFrom, Series};

        if self.is_empty_header() {
            return Err(Error::validation(
                &self.name,
                "a dataframe requires header names",
            ));
        }

        let mut columns = Vec::with_capacity(self.headers.len());
        for (idx, header) in self.headers.iter().enumerate() {
            let cells: Vec<&CellValue> = self
                .records
                .iter()
                .map(|r| r.get(idx).unwrap_or(&CellValue::Null))
                .collect();

            let series = if cells
                .iter()
                .all(|c| matches!(c, CellValue::Integer(_) | CellValue::Null))
            {
                let values: Vec<Option<i64>> = cells.iter().map(|c| c.as_i64()).collect();
                Series::new(header, values)
            } else if cells.iter().all(|c| {
                matches!(c, CellValue::Integer(_) | CellValue::Float(_) | CellValue::Null)
            }) {
                let values: Vec<Option<f64>> = cells.iter().map(|c| c.as_f64()).collect();
                Series::new(header, values)
            } else if cells
                .iter()
                .all(|c| matches!(c, CellValue::Bool(_) | CellValue::Null))
            {
                let values: Vec<Option<bool>> = cells
                    .iter()
                    .map(|c| match c {
                        CellValue::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect();
                Series::new(header, values)
            } else {
                let values: Vec<Option<String>> = cells
                    .iter()
                    .map(|c| (!c.is_null()).then(|| c.to_string()))
                    .collect();
                Series::new(header, values)
            };
            columns.push(series);
        }

        Ok(DataFrame::new(columns)?)
    }
}

impl PartialEq for TableData {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.headers == other.headers && self.records == other.records
    }
}

/// An opaque cell value.
///
/// Loaders carry over whatever typing the source format already has (JSON
/// numbers, spreadsheet numbers); text formats produce strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Missing/null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    String(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn feed_digest(&self, hasher: &mut Sha256) {
        match self {
            CellValue::Null => hasher.update([0u8]),
            CellValue::Bool(b) => hasher.update([1u8, *b as u8]),
            CellValue::Integer(i) => {
                hasher.update([2u8]);
                hasher.update(i.to_le_bytes());
            }
            CellValue::Float(f) => {
                hasher.update([3u8]);
                hasher.update(f.to_bits().to_le_bytes());
            }
            CellValue::String(s) => {
                hasher.update([4u8]);
                hasher.update((s.len() as u64).to_le_bytes());
                hasher.update(s.as_bytes());
            }
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => write!(f, ""),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Integer(i64::from(i))
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

/// Nested arrays and objects are kept as their compact JSON text
impl From<&serde_json::Value> for CellValue {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Integer(i),
                None => n.as_f64().map_or(CellValue::Null, CellValue::Float),
            },
            Value::String(s) => CellValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => CellValue::String(value.to_string()),
        }
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => CellValue::String(s),
            other => CellValue::from(&other),
        }
    }
}
