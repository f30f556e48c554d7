//! The loader contract shared by every source format
//!
//! A format parser turns its input into [`RawFragment`]s. A [`TableBuilder`]
//! names, validates and normalizes each fragment as the caller pulls it from
//! the resulting [`TableIter`], so a failing table is reported at the point it
//! would have been produced and earlier tables are unaffected.

use crate::error::{Error, Result};
use crate::naming::{validate_table_name, HeaderPolicy, NameContext, TableNameTemplate};
use crate::row::RawRow;
use crate::table::{CellValue, TableData};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Lazy, single-pass sequence of loaded tables
pub type TableIter = Box<dyn Iterator<Item = Result<TableData>>>;

/// An unvalidated table as produced by a format parser
#[derive(Debug, Clone, PartialEq)]
pub struct RawFragment {
    /// Per-table key used by the `%(key)s` placeholder
    pub key: String,
    /// Header names as found in the source
    pub headers: Vec<String>,
    /// Rows in source order
    pub rows: Vec<RawRow>,
}

impl RawFragment {
    pub fn new(key: impl Into<String>, headers: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self {
            key: key.into(),
            headers,
            rows,
        }
    }
}

/// Settings common to every loader
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    /// Substitute for missing or null fields
    pub none_value: CellValue,
    /// Validation of headers taken from the source
    pub header_policy: HeaderPolicy,
    /// Overrides the format's default table name template
    pub table_name: Option<TableNameTemplate>,
}

/// A format-specific loader.
///
/// Each format has a file-backed and a text-backed implementation.
/// `load` fails up front when the source cannot be opened or parsed as a
/// whole; everything else is reported per table through the iterator.
pub trait TableLoader {
    /// Short name of the source format, used by `%(format_name)s`
    fn format_name(&self) -> &'static str;

    fn config_mut(&mut self) -> &mut LoaderConfig;

    /// Parse the source into a lazy sequence of tables
    fn load(self) -> Result<TableIter>;

    fn with_none_value(mut self, none_value: impl Into<CellValue>) -> Self
    where
        Self: Sized,
    {
        self.config_mut().none_value = none_value.into();
        self
    }

    fn with_header_policy(mut self, policy: HeaderPolicy) -> Self
    where
        Self: Sized,
    {
        self.config_mut().header_policy = policy;
        self
    }

    fn with_table_name(mut self, template: impl Into<TableNameTemplate>) -> Self
    where
        Self: Sized,
    {
        self.config_mut().table_name = Some(template.into());
        self
    }

    fn with_config(mut self, config: LoaderConfig) -> Self
    where
        Self: Sized,
    {
        *self.config_mut() = config;
        self
    }
}

/// Turns raw fragments into validated tables
#[derive(Debug)]
pub struct TableBuilder {
    config: LoaderConfig,
    template: TableNameTemplate,
    source_name: String,
    format_name: &'static str,
    title: Option<String>,
    next_id: usize,
}

impl TableBuilder {
    /// `default_template` is used unless the config overrides it
    pub fn new(
        format_name: &'static str,
        default_template: &str,
        source_name: impl Into<String>,
        config: LoaderConfig,
    ) -> Self {
        let template = config
            .table_name
            .clone()
            .unwrap_or_else(|| TableNameTemplate::new(default_template));

        Self {
            config,
            template,
            source_name: source_name.into(),
            format_name,
            title: None,
            next_id: 0,
        }
    }

    /// Document title for the `%(title)s` placeholder
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn none_value(&self) -> &CellValue {
        &self.config.none_value
    }

    /// Name, validate and normalize one fragment
    pub fn build(&mut self, fragment: RawFragment) -> Result<TableData> {
        let format_id = self.next_id;
        self.next_id += 1;

        let name = self.template.render(&NameContext {
            filename: &self.source_name,
            key: &fragment.key,
            format_name: self.format_name,
            format_id,
            title: self.title.as_deref(),
        });
        validate_table_name(&name)?;

        let headers = self.config.header_policy.apply(&name, fragment.headers)?;
        let table = TableData::new(
            name,
            headers,
            fragment.rows,
            self.config.none_value.clone(),
        )?;

        debug!(
            format_name = self.format_name,
            source = %self.source_name,
            table = table.name(),
            rows = table.row_count(),
            columns = table.column_count(),
            "loaded table"
        );
        Ok(table)
    }

    /// Build tables lazily as `fragments` is advanced
    pub fn into_tables<I>(mut self, fragments: I) -> TableIter
    where
        I: Iterator<Item = Result<RawFragment>> + 'static,
    {
        Box::new(fragments.map(move |fragment| fragment.and_then(|f| self.build(f))))
    }
}

/// Reject structurally invalid paths before any I/O
pub fn validate_file_path(path: &Path) -> Result<()> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(Error::InvalidFilePath("path is empty".to_string()));
    }
    if text.contains('\0') {
        return Err(Error::InvalidFilePath(format!(
            "path contains a NUL byte: {}",
            text.escape_debug()
        )));
    }
    Ok(())
}

/// Source name hint for a file: its stem
pub(crate) fn source_name_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Validate the path and read the whole file as UTF-8 text
pub(crate) fn read_source(path: &Path) -> Result<String> {
    validate_file_path(path)?;
    fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Pad a row shorter than `width` with the null substitute.
///
/// Longer rows are left alone so the normalizer reports them.
pub(crate) fn pad_row(mut values: Vec<CellValue>, width: usize, none_value: &CellValue) -> Vec<CellValue> {
    if values.len() < width {
        values.resize(width, none_value.clone());
    }
    values
}

/// Collapse runs of whitespace into single spaces and trim
pub(crate) fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drain a table sequence, stopping at the first error.
///
/// Fails with `EmptyData` when the sequence produced no table, or only
/// empty ones.
pub fn collect_tables<I>(tables: I, source_name: &str) -> Result<Vec<TableData>>
where
    I: IntoIterator<Item = Result<TableData>>,
{
    let tables = tables.into_iter().collect::<Result<Vec<_>>>()?;
    if tables.iter().all(TableData::is_empty) {
        return Err(Error::EmptyData(source_name.to_string()));
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::DuplicateHeaders;
    use crate::ErrorKind;
    use std::path::PathBuf;

    fn fragment(key: &str, headers: &[&str], rows: Vec<RawRow>) -> RawFragment {
        RawFragment::new(key, headers.iter().map(|s| s.to_string()).collect(), rows)
    }

    #[test]
    fn test_builder_names_tables_from_template() {
        let mut builder = TableBuilder::new(
            "json",
            "%(filename)s_%(key)s_%(format_id)s",
            "data",
            LoaderConfig::default(),
        );

        let first = builder.build(fragment("a", &["x"], vec![])).unwrap();
        let second = builder.build(fragment("b", &["x"], vec![])).unwrap();
        assert_eq!(first.name(), "data_a_0");
        assert_eq!(second.name(), "data_b_1");
    }

    #[test]
    fn test_config_template_overrides_default() {
        let config = LoaderConfig {
            table_name: Some("%(format_name)s_%(key)s".into()),
            ..Default::default()
        };
        let mut builder = TableBuilder::new("html", "%(key)s", "page", config);

        let table = builder.build(fragment("t1", &[], vec![])).unwrap();
        assert_eq!(table.name(), "html_t1");
    }

    #[test]
    fn test_builder_rejects_blank_name() {
        let mut builder = TableBuilder::new("csv", "%(key)s", "src", LoaderConfig::default());
        let err = builder.build(fragment("  ", &["a"], vec![])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTableName);
    }

    #[test]
    fn test_builder_applies_header_policy() {
        let mut builder = TableBuilder::new("csv", "%(key)s", "src", LoaderConfig::default());
        let err = builder
            .build(fragment("t", &["a", "a"], vec![]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHeaderName);

        let config = LoaderConfig {
            header_policy: HeaderPolicy {
                duplicates: DuplicateHeaders::Suffix,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut builder = TableBuilder::new("csv", "%(key)s", "src", config);
        let table = builder.build(fragment("t", &["a", "a"], vec![])).unwrap();
        assert_eq!(table.headers(), &["a".to_string(), "a_2".to_string()]);
    }

    #[test]
    fn test_failing_table_does_not_lose_earlier_tables() {
        let builder = TableBuilder::new("json", "%(key)s", "src", LoaderConfig::default());
        let fragments = vec![
            Ok(fragment("good", &["a"], vec![RawRow::Positional(vec![1.into()])])),
            Ok(fragment("bad", &["a"], vec![RawRow::Scalar(1.into())])),
            Ok(fragment("after", &["a"], vec![])),
        ];

        let results: Vec<_> = builder.into_tables(fragments.into_iter()).collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name(), "good");
        assert_eq!(
            results[1].as_ref().unwrap_err().kind(),
            ErrorKind::InvalidData
        );
        assert_eq!(results[2].as_ref().unwrap().name(), "after");
    }

    #[test]
    fn test_collect_tables_requires_non_empty_table() {
        let err = collect_tables(Vec::new(), "nothing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyData);

        let empty = TableData::new("t", vec!["a".into()], Vec::<RawRow>::new(), CellValue::Null)
            .unwrap();
        let err = collect_tables(vec![Ok(empty)], "only_empty").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyData);
    }

    #[test]
    fn test_validate_file_path() {
        assert_eq!(
            validate_file_path(Path::new("")).unwrap_err().kind(),
            ErrorKind::InvalidFilePath
        );
        assert!(validate_file_path(Path::new("data/table.csv")).is_ok());
    }

    #[test]
    fn test_read_missing_file_is_open_error() {
        let err = read_source(&PathBuf::from("/definitely/not/here.csv")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Open);
    }

    #[test]
    fn test_pad_row() {
        let padded = pad_row(vec![1.into()], 3, &CellValue::from("-"));
        assert_eq!(
            padded,
            vec![CellValue::from(1), CellValue::from("-"), CellValue::from("-")]
        );

        let long = pad_row(vec![1.into(), 2.into()], 1, &CellValue::Null);
        assert_eq!(long.len(), 2);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a \n\t b  "), "a b");
    }
}
