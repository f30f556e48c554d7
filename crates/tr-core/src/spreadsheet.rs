//! Spreadsheet (xlsx/xlsm/xlsb/xls/ods) loaders
//!
//! One table per sheet. Sheets are read one at a time as the table
//! sequence is advanced; the workbook is owned by the sequence and released
//! when it is dropped.

use crate::error::{Error, Result};
use crate::loader::{
    source_name_of, validate_file_path, LoaderConfig, RawFragment, TableBuilder, TableIter,
    TableLoader,
};
use crate::row::RawRow;
use crate::table::CellValue;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::warn;

const FORMAT_NAME: &str = "spreadsheet";
const DEFAULT_TEMPLATE: &str = "%(key)s";

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Int(i) => CellValue::Integer(*i),
            Data::Float(f) => CellValue::Float(*f),
            Data::String(s) => CellValue::String(s.clone()),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
            Data::Error(e) => CellValue::String(e.to_string()),
            Data::Empty => CellValue::Null,
        }
    }
}

/// Loads one table per sheet from an in-memory workbook
#[derive(Debug, Clone)]
pub struct SpreadsheetTableBytesLoader {
    bytes: Vec<u8>,
    source_name: String,
    start_row: usize,
    config: LoaderConfig,
}

impl SpreadsheetTableBytesLoader {
    pub fn new(bytes: impl Into<Vec<u8>>, source_name: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            source_name: source_name.into(),
            start_row: 0,
            config: LoaderConfig::default(),
        }
    }

    /// Sheet row (0-based) where the header search begins; rows above it
    /// are ignored and the first non-blank row from there is the header row
    pub fn with_start_row(mut self, start_row: usize) -> Self {
        self.start_row = start_row;
        self
    }
}

impl TableLoader for SpreadsheetTableBytesLoader {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn config_mut(&mut self) -> &mut LoaderConfig {
        &mut self.config
    }

    fn load(self) -> Result<TableIter> {
        let workbook =
            open_workbook_auto_from_rs(Cursor::new(self.bytes)).map_err(|e| Error::Spreadsheet {
                source_name: self.source_name.clone(),
                source: e,
            })?;

        sheet_tables(workbook, self.source_name, self.start_row, self.config)
    }
}

/// Loads one table per sheet from a workbook file
#[derive(Debug, Clone)]
pub struct SpreadsheetTableFileLoader {
    path: PathBuf,
    start_row: usize,
    config: LoaderConfig,
}

impl SpreadsheetTableFileLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            start_row: 0,
            config: LoaderConfig::default(),
        }
    }

    /// Sheet row (0-based) where the header search begins; rows above it
    /// are ignored and the first non-blank row from there is the header row
    pub fn with_start_row(mut self, start_row: usize) -> Self {
        self.start_row = start_row;
        self
    }
}

impl TableLoader for SpreadsheetTableFileLoader {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn config_mut(&mut self) -> &mut LoaderConfig {
        &mut self.config
    }

    fn load(self) -> Result<TableIter> {
        validate_file_path(&self.path)?;
        let source_name = source_name_of(&self.path);

        if !self.path.is_file() {
            return Err(Error::FileRead {
                path: self.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }

        let workbook = open_workbook_auto(&self.path).map_err(|e| Error::Spreadsheet {
            source_name: source_name.clone(),
            source: e,
        })?;

        sheet_tables(workbook, source_name, self.start_row, self.config)
    }
}

fn sheet_tables<RS>(
    workbook: Sheets<RS>,
    source_name: String,
    start_row: usize,
    config: LoaderConfig,
) -> Result<TableIter>
where
    RS: Read + Seek + 'static,
{
    let sheet_names = workbook.sheet_names();
    if sheet_names.is_empty() {
        return Err(Error::EmptyData(source_name));
    }

    let fragments = SheetFragments {
        workbook,
        sheet_names: sheet_names.into_iter(),
        source_name: source_name.clone(),
        start_row,
    };
    let builder = TableBuilder::new(FORMAT_NAME, DEFAULT_TEMPLATE, source_name, config);
    Ok(builder.into_tables(fragments))
}

/// Reads the next non-empty sheet on each call
struct SheetFragments<RS: Read + Seek> {
    workbook: Sheets<RS>,
    sheet_names: std::vec::IntoIter<String>,
    source_name: String,
    start_row: usize,
}

impl<RS: Read + Seek> Iterator for SheetFragments<RS> {
    type Item = Result<RawFragment>;

    fn next(&mut self) -> Option<Self::Item> {
        for sheet in self.sheet_names.by_ref() {
            let range = match self.workbook.worksheet_range(&sheet) {
                Ok(range) => range,
                Err(e) => {
                    return Some(Err(Error::Spreadsheet {
                        source_name: format!("{}/{}", self.source_name, sheet),
                        source: e,
                    }))
                }
            };

            // The range begins at the first used row, not at sheet row 0
            let first_row = range.start().map_or(0, |(row, _)| row as usize);
            let mut rows = range
                .rows()
                .skip(self.start_row.saturating_sub(first_row))
                .skip_while(|row| row.iter().all(|cell| *cell == Data::Empty));
            let Some(header_row) = rows.next() else {
                warn!(source = %self.source_name, sheet = %sheet, "skipping empty sheet");
                continue;
            };

            let headers = header_row
                .iter()
                .map(|cell| CellValue::from(cell).to_string())
                .collect();
            let records = rows
                .map(|row| RawRow::Positional(row.iter().map(CellValue::from).collect()))
                .collect();

            return Some(Ok(RawFragment::new(sheet, headers, records)));
        }
        None
    }
}
