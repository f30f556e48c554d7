//! Delimited text (CSV/TSV) loaders

use crate::error::{Error, Result};
use crate::loader::{
    pad_row, read_source, source_name_of, LoaderConfig, RawFragment, TableBuilder, TableIter,
    TableLoader,
};
use crate::row::RawRow;
use crate::table::CellValue;
use std::path::{Path, PathBuf};

const FORMAT_NAME: &str = "csv";
const DEFAULT_TEMPLATE: &str = "%(filename)s";

/// Dialect of a delimited text source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFormat {
    pub delimiter: u8,
    pub quote: u8,
    /// Explicit header names; when empty the first record is the header row
    pub headers: Vec<String>,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            headers: Vec::new(),
        }
    }
}

/// Loads a single table from delimited text
#[derive(Debug, Clone)]
pub struct CsvTableTextLoader {
    text: String,
    source_name: String,
    format: CsvFormat,
    config: LoaderConfig,
}

impl CsvTableTextLoader {
    pub fn new(text: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_name: source_name.into(),
            format: CsvFormat::default(),
            config: LoaderConfig::default(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.format.delimiter = delimiter;
        self
    }

    pub fn with_quote(mut self, quote: u8) -> Self {
        self.format.quote = quote;
        self
    }

    pub fn with_headers(mut self, headers: Vec<String>) -> Self {
        self.format.headers = headers;
        self
    }

    pub fn with_format(mut self, format: CsvFormat) -> Self {
        self.format = format;
        self
    }
}

impl TableLoader for CsvTableTextLoader {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn config_mut(&mut self) -> &mut LoaderConfig {
        &mut self.config
    }

    fn load(self) -> Result<TableIter> {
        if self.text.trim().is_empty() {
            return Err(Error::EmptyData(self.source_name));
        }

        let builder = TableBuilder::new(
            FORMAT_NAME,
            DEFAULT_TEMPLATE,
            self.source_name.as_str(),
            self.config,
        );
        let fragment = parse_fragment(
            &self.text,
            &self.source_name,
            &self.format,
            builder.none_value(),
        )?;

        Ok(builder.into_tables(std::iter::once(Ok(fragment))))
    }
}

/// Loads a single table from a delimited text file
#[derive(Debug, Clone)]
pub struct CsvTableFileLoader {
    path: PathBuf,
    format: CsvFormat,
    config: LoaderConfig,
}

impl CsvTableFileLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format: CsvFormat::default(),
            config: LoaderConfig::default(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.format.delimiter = delimiter;
        self
    }

    pub fn with_quote(mut self, quote: u8) -> Self {
        self.format.quote = quote;
        self
    }

    pub fn with_headers(mut self, headers: Vec<String>) -> Self {
        self.format.headers = headers;
        self
    }

    pub fn with_format(mut self, format: CsvFormat) -> Self {
        self.format = format;
        self
    }
}

impl TableLoader for CsvTableFileLoader {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn config_mut(&mut self) -> &mut LoaderConfig {
        &mut self.config
    }

    fn load(self) -> Result<TableIter> {
        let text = read_source(&self.path)?;

        CsvTableTextLoader::new(text, source_name_of(&self.path))
            .with_format(self.format)
            .with_config(self.config)
            .load()
    }
}

/// Parse delimited text into one raw fragment
fn parse_fragment(
    content: &str,
    source_name: &str,
    format: &CsvFormat,
    none_value: &CellValue,
) -> Result<RawFragment> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // Allow varying number of fields
        .delimiter(format.delimiter)
        .quote(format.quote)
        .from_reader(content.as_bytes());

    let csv_error = |e: csv::Error| Error::Csv {
        source_name: source_name.to_string(),
        source: e,
    };

    let mut records = csv_reader.records();

    let headers = if format.headers.is_empty() {
        match records.next() {
            Some(header) => header.map_err(csv_error)?.iter().map(str::to_string).collect(),
            None => Vec::new(),
        }
    } else {
        format.headers.clone()
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(csv_error)?;
        let cells: Vec<CellValue> = record.iter().map(CellValue::from).collect();

        // Pad with the null substitute if row is shorter than header
        rows.push(RawRow::Positional(pad_row(cells, headers.len(), none_value)));
    }

    Ok(RawFragment::new(source_name, headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::collect_tables;
    use crate::ErrorKind;
    use std::io::Write;

    fn load_one(loader: CsvTableTextLoader) -> crate::TableData {
        let mut tables = collect_tables(loader.load().unwrap(), "test").unwrap();
        assert_eq!(tables.len(), 1);
        tables.remove(0)
    }

    #[test]
    fn test_parse_simple_csv() {
        let csv = "ID,Name,Value\n1,foo,100\n2,bar,200\n";
        let table = load_one(CsvTableTextLoader::new(csv, "test"));

        assert_eq!(table.name(), "test");
        assert_eq!(table.headers(), &["ID", "Name", "Value"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.records()[1],
            vec![CellValue::from("2"), CellValue::from("bar"), CellValue::from("200")]
        );
    }

    #[test]
    fn test_short_rows_are_padded() {
        let csv = "a,b,c\n1\n";
        let table = load_one(CsvTableTextLoader::new(csv, "test").with_none_value("NA"));

        assert_eq!(
            table.records()[0],
            vec![CellValue::from("1"), CellValue::from("NA"), CellValue::from("NA")]
        );
    }

    #[test]
    fn test_long_row_is_invalid_data() {
        let csv = "a,b\n1,2,3\n";
        let mut tables = CsvTableTextLoader::new(csv, "test").load().unwrap();

        let err = tables.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(tables.next().is_none());
    }

    #[test]
    fn test_explicit_headers_and_delimiter() {
        let tsv = "1\tfoo\n2\tbar\n";
        let table = load_one(
            CsvTableTextLoader::new(tsv, "test")
                .with_delimiter(b'\t')
                .with_headers(vec!["id".into(), "name".into()]),
        );

        assert_eq!(table.headers(), &["id", "name"]);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_quoted_fields() {
        let csv = "name,note\n\"Smith, J\",\"said \"\"hi\"\"\"\n";
        let table = load_one(CsvTableTextLoader::new(csv, "test"));

        assert_eq!(
            table.records()[0],
            vec![CellValue::from("Smith, J"), CellValue::from("said \"hi\"")]
        );
    }

    #[test]
    fn test_duplicate_csv_headers_rejected() {
        let csv = "a,a\n1,2\n";
        let mut tables = CsvTableTextLoader::new(csv, "test").load().unwrap();
        let err = tables.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHeaderName);
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let tables = CsvTableTextLoader::new("a,b\n", "test").load().unwrap();
        let err = collect_tables(tables, "test").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyData);
    }

    #[test]
    fn test_blank_text_is_empty_data() {
        let err = CsvTableTextLoader::new("  \n", "test").load().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::EmptyData);
    }

    #[test]
    fn test_file_loader_uses_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "item,price\napple,3").unwrap();

        let tables = collect_tables(CsvTableFileLoader::new(&path).load().unwrap(), "prices")
            .unwrap();
        assert_eq!(tables[0].name(), "prices");
        assert_eq!(tables[0].records()[0][0], CellValue::from("apple"));
    }

    #[test]
    fn test_file_loader_missing_file() {
        let err = CsvTableFileLoader::new("/no/such/file.csv").load().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Open);
    }

    #[test]
    fn test_file_loader_empty_path() {
        let err = CsvTableFileLoader::new("").load().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidFilePath);
    }
}
