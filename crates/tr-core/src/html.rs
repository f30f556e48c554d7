//! HTML table loaders

use crate::error::{Error, Result};
use crate::loader::{
    clean_text, pad_row, read_source, source_name_of, LoaderConfig, RawFragment, TableBuilder,
    TableIter, TableLoader,
};
use crate::row::RawRow;
use crate::table::CellValue;
use scraper::{ElementRef, Html, Selector};
use std::path::{Path, PathBuf};
use tracing::debug;

const FORMAT_NAME: &str = "html";
const DEFAULT_TEMPLATE: &str = "%(title)s_%(key)s";

/// Loads every `<table>` of an HTML document
#[derive(Debug, Clone)]
pub struct HtmlTableTextLoader {
    text: String,
    source_name: String,
    config: LoaderConfig,
}

impl HtmlTableTextLoader {
    pub fn new(text: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_name: source_name.into(),
            config: LoaderConfig::default(),
        }
    }
}

impl TableLoader for HtmlTableTextLoader {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn config_mut(&mut self) -> &mut LoaderConfig {
        &mut self.config
    }

    fn load(self) -> Result<TableIter> {
        let document = Html::parse_document(&self.text);
        let fragments = HtmlFragments::new(document, &self.source_name, &self.config.none_value)?;

        if fragments.table_count == 0 {
            return Err(Error::EmptyData(self.source_name));
        }
        debug!(source = %self.source_name, tables = fragments.table_count, "found HTML tables");

        let title = fragments.title.clone();
        let builder = TableBuilder::new(FORMAT_NAME, DEFAULT_TEMPLATE, self.source_name, self.config)
            .with_title(title);
        Ok(builder.into_tables(fragments.map(Ok)))
    }
}

/// Loads every `<table>` of an HTML file
#[derive(Debug, Clone)]
pub struct HtmlTableFileLoader {
    path: PathBuf,
    config: LoaderConfig,
}

impl HtmlTableFileLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config: LoaderConfig::default(),
        }
    }
}

impl TableLoader for HtmlTableFileLoader {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn config_mut(&mut self) -> &mut LoaderConfig {
        &mut self.config
    }

    fn load(self) -> Result<TableIter> {
        let text = read_source(&self.path)?;

        HtmlTableTextLoader::new(text, source_name_of(&self.path))
            .with_config(self.config)
            .load()
    }
}

fn selector(css: &str, source_name: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| Error::validation(source_name, format!("invalid selector '{}': {:?}", css, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Reads one `<table>` of a parsed document per call
struct HtmlFragments {
    document: Html,
    title: Option<String>,
    table_count: usize,
    next_index: usize,
    table_selector: Selector,
    caption_selector: Selector,
    row_selector: Selector,
    none_value: CellValue,
}

impl HtmlFragments {
    fn new(document: Html, source_name: &str, none_value: &CellValue) -> Result<Self> {
        let title_selector = selector("title", source_name)?;
        let table_selector = selector("table", source_name)?;

        let title = document
            .select(&title_selector)
            .next()
            .map(element_text)
            .filter(|s| !s.is_empty());
        let table_count = document.select(&table_selector).count();

        Ok(Self {
            title,
            table_count,
            next_index: 0,
            table_selector,
            caption_selector: selector("caption", source_name)?,
            row_selector: selector("tr", source_name)?,
            none_value: none_value.clone(),
            document,
        })
    }

    fn fragment(&self, table: ElementRef<'_>, index: usize) -> RawFragment {
        let key = table
            .value()
            .attr("id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| {
                table
                    .select(&self.caption_selector)
                    .next()
                    .map(element_text)
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or_else(|| format!("table{}", index));

        let mut headers: Vec<String> = Vec::new();
        let mut cell_rows: Vec<Vec<String>> = Vec::new();

        // Rows of nested tables belong to those tables
        let own_rows = table.select(&self.row_selector).filter(|row| {
            row.ancestors()
                .find(|node| node.value().as_element().is_some_and(|e| e.name() == "table"))
                .is_some_and(|node| node.id() == table.id())
        });

        for row in own_rows {
            let cells: Vec<ElementRef<'_>> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                .collect();
            if cells.is_empty() {
                continue;
            }

            let all_header = cells.iter().all(|cell| cell.value().name() == "th");
            let texts: Vec<String> = cells.into_iter().map(element_text).collect();

            if all_header && headers.is_empty() && cell_rows.is_empty() {
                headers = texts;
            } else {
                cell_rows.push(texts);
            }
        }

        let rows = cell_rows
            .into_iter()
            .map(|texts| {
                let values = texts.into_iter().map(CellValue::from).collect();
                RawRow::Positional(pad_row(values, headers.len(), &self.none_value))
            })
            .collect();

        RawFragment::new(key, headers, rows)
    }
}

impl Iterator for HtmlFragments {
    type Item = RawFragment;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next_index;
        let table = self.document.select(&self.table_selector).nth(index)?;
        let fragment = self.fragment(table, index);
        self.next_index += 1;
        Some(fragment)
    }
}
