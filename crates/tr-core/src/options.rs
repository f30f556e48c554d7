//! Loader options read from configuration files

use crate::delimited::CsvFormat;
use crate::error::{Error, Result};
use crate::loader::LoaderConfig;
use crate::naming::{HeaderPolicy, TableNameTemplate};
use crate::table::CellValue;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Options for every loader, as read from a JSON file.
///
/// All fields are optional; missing fields take their defaults.
///
/// ```json
/// {
///   "none_value": "",
///   "header_policy": { "blank": "auto_name", "duplicates": "suffix" },
///   "table_name": "%(filename)s_%(key)s",
///   "csv": { "delimiter": ";" },
///   "spreadsheet": { "start_row": 1 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub none_value: CellValue,
    pub header_policy: HeaderPolicy,
    pub table_name: Option<TableNameTemplate>,
    pub csv: CsvOptions,
    pub spreadsheet: SpreadsheetOptions,
}

/// Delimited text dialect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub delimiter: char,
    pub quote: char,
    /// Explicit header names; empty means the first record is the header row
    pub headers: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            headers: Vec::new(),
        }
    }
}

impl CsvOptions {
    /// Convert to the byte-level dialect used by the CSV reader
    pub fn format(&self) -> Result<CsvFormat> {
        Ok(CsvFormat {
            delimiter: ascii_byte("delimiter", self.delimiter)?,
            quote: ascii_byte("quote", self.quote)?,
            headers: self.headers.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadsheetOptions {
    /// Sheet row (0-based) where the header search begins
    pub start_row: usize,
}

impl LoadOptions {
    /// Load options from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| Error::Json {
            source_name: path.display().to_string(),
            source: e,
        })
    }

    /// Settings shared by every loader
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            none_value: self.none_value.clone(),
            header_policy: self.header_policy,
            table_name: self.table_name.clone(),
        }
    }
}

fn ascii_byte(field: &str, c: char) -> Result<u8> {
    u8::try_from(c).ok().filter(u8::is_ascii).ok_or_else(|| {
        Error::validation(
            "csv options",
            format!("{} must be an ASCII character, got {:?}", field, c),
        )
    })
}
