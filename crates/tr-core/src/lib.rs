//! tr-core: Core library for loading tables from text and file sources
//!
//! This library provides functionality to:
//! - Load tables from CSV/TSV, HTML, MediaWiki, spreadsheet and JSON sources
//! - Normalize heterogeneous rows (maps, records, sequences) into positional records
//! - Name tables from templates and validate names and headers
//! - Report failures through a single error taxonomy
//! - Scan directories for loadable sources
//!
//! Every loader returns a lazy [`TableIter`]: container-level failures are
//! returned by `load()`, and per-table failures appear in the sequence.

pub mod delimited;
pub mod error;
pub mod html;
pub mod json;
pub mod loader;
pub mod mediawiki;
pub mod naming;
pub mod options;
pub mod row;
pub mod scanner;
pub mod source;
#[cfg(feature = "spreadsheet")]
pub mod spreadsheet;
pub mod table;

pub use delimited::{CsvFormat, CsvTableFileLoader, CsvTableTextLoader};
pub use error::{Error, ErrorKind, Result};
pub use html::{HtmlTableFileLoader, HtmlTableTextLoader};
pub use json::{JsonTableFileLoader, JsonTableTextLoader};
pub use loader::{
    collect_tables, validate_file_path, LoaderConfig, RawFragment, TableBuilder, TableIter,
    TableLoader,
};
pub use mediawiki::{MediaWikiTableFileLoader, MediaWikiTableTextLoader};
pub use naming::{BlankHeaders, DuplicateHeaders, HeaderPolicy, TableNameTemplate};
pub use options::{CsvOptions, LoadOptions, SpreadsheetOptions};
pub use row::{normalize_row, KeyedRow, RawRow, RowError, RowLike};
pub use scanner::{scan_directory, ScanResult, SourceGroup};
pub use source::{load_path, SourceFormat};
#[cfg(feature = "spreadsheet")]
pub use spreadsheet::{SpreadsheetTableBytesLoader, SpreadsheetTableFileLoader};
pub use table::{CellValue, TableData};
