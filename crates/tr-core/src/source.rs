//! Source format detection and loading by path

use crate::delimited::CsvTableFileLoader;
use crate::error::{Error, Result};
use crate::html::HtmlTableFileLoader;
use crate::json::JsonTableFileLoader;
use crate::loader::{validate_file_path, TableIter, TableLoader};
use crate::mediawiki::MediaWikiTableFileLoader;
use crate::options::LoadOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Source formats understood by the loaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    Tsv,
    Html,
    MediaWiki,
    Spreadsheet,
    Json,
}

impl SourceFormat {
    /// Map a file extension (case-insensitive, without the dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "txt" => Some(SourceFormat::Csv),
            "tsv" | "tab" => Some(SourceFormat::Tsv),
            "htm" | "html" => Some(SourceFormat::Html),
            "wiki" | "mediawiki" => Some(SourceFormat::MediaWiki),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceFormat::Spreadsheet),
            "json" => Some(SourceFormat::Json),
            _ => None,
        }
    }

    /// Detect the format of a file from its extension
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| {
                Error::validation(
                    &path.display().to_string(),
                    "unrecognized file extension",
                )
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Tsv => "tsv",
            SourceFormat::Html => "html",
            SourceFormat::MediaWiki => "mediawiki",
            SourceFormat::Spreadsheet => "spreadsheet",
            SourceFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Pick the loader for `path` by extension and load it
pub fn load_path<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<TableIter> {
    let path = path.as_ref();
    validate_file_path(path)?;
    let format = SourceFormat::from_path(path)?;
    let config = options.loader_config();

    info!(path = %path.display(), format = %format, "loading tables");

    match format {
        SourceFormat::Csv => CsvTableFileLoader::new(path)
            .with_format(options.csv.format()?)
            .with_config(config)
            .load(),
        SourceFormat::Tsv => {
            let mut csv_format = options.csv.format()?;
            csv_format.delimiter = b'\t';
            CsvTableFileLoader::new(path)
                .with_format(csv_format)
                .with_config(config)
                .load()
        }
        SourceFormat::Html => HtmlTableFileLoader::new(path).with_config(config).load(),
        SourceFormat::MediaWiki => MediaWikiTableFileLoader::new(path).with_config(config).load(),
        #[cfg(feature = "spreadsheet")]
        SourceFormat::Spreadsheet => crate::spreadsheet::SpreadsheetTableFileLoader::new(path)
            .with_start_row(options.spreadsheet.start_row)
            .with_config(config)
            .load(),
        #[cfg(not(feature = "spreadsheet"))]
        SourceFormat::Spreadsheet => Err(Error::validation(
            &path.display().to_string(),
            "spreadsheet support requires the `spreadsheet` feature",
        )),
        SourceFormat::Json => JsonTableFileLoader::new(path).with_config(config).load(),
    }
}
