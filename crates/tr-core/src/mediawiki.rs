//! MediaWiki table markup loaders
//!
//! Understands the `{| ... |}` table syntax: `|+` captions, `|-` row
//! separators, `!` header cells and `|` data cells, with `!!`/`||` for
//! several cells on one line. Cell attributes (`style="..." | text`) are
//! dropped, internal links render as their label and bold/italic quotes are
//! removed.

use crate::error::{Error, Result};
use crate::loader::{
    clean_text, pad_row, read_source, source_name_of, LoaderConfig, RawFragment, TableBuilder,
    TableIter, TableLoader,
};
use crate::row::RawRow;
use crate::table::CellValue;
use regex::Regex;
use std::path::{Path, PathBuf};

const FORMAT_NAME: &str = "mediawiki";
const DEFAULT_TEMPLATE: &str = "%(filename)s_%(key)s";

/// Loads every wiki table of a MediaWiki document
#[derive(Debug, Clone)]
pub struct MediaWikiTableTextLoader {
    text: String,
    source_name: String,
    config: LoaderConfig,
}

impl MediaWikiTableTextLoader {
    pub fn new(text: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_name: source_name.into(),
            config: LoaderConfig::default(),
        }
    }
}

impl TableLoader for MediaWikiTableTextLoader {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn config_mut(&mut self) -> &mut LoaderConfig {
        &mut self.config
    }

    fn load(self) -> Result<TableIter> {
        let markup = Markup::new(&self.source_name)?;
        let mut fragments =
            WikiFragments::new(self.text, markup, self.config.none_value.clone()).peekable();

        if fragments.peek().is_none() {
            return Err(Error::EmptyData(self.source_name));
        }

        let builder = TableBuilder::new(FORMAT_NAME, DEFAULT_TEMPLATE, self.source_name, self.config);
        Ok(builder.into_tables(fragments.map(Ok)))
    }
}

/// Loads every wiki table of a MediaWiki file
#[derive(Debug, Clone)]
pub struct MediaWikiTableFileLoader {
    path: PathBuf,
    config: LoaderConfig,
}

impl MediaWikiTableFileLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config: LoaderConfig::default(),
        }
    }
}

impl TableLoader for MediaWikiTableFileLoader {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn config_mut(&mut self) -> &mut LoaderConfig {
        &mut self.config
    }

    fn load(self) -> Result<TableIter> {
        let text = read_source(&self.path)?;

        MediaWikiTableTextLoader::new(text, source_name_of(&self.path))
            .with_config(self.config)
            .load()
    }
}

/// Inline markup patterns
struct Markup {
    section: Regex,
    internal_link: Regex,
    external_link: Regex,
    emphasis: Regex,
}

impl Markup {
    fn new(source_name: &str) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::validation(source_name, e.to_string()))
        };

        Ok(Self {
            section: compile(r"^(=+)\s*(.*?)\s*=+\s*$")?,
            internal_link: compile(r"\[\[(?:[^|\]]*\|)?([^\]]*)\]\]")?,
            external_link: compile(r"\[(?:https?|ftp)://\S+\s+([^\]]*)\]")?,
            emphasis: compile(r"'{2,}")?,
        })
    }

    fn render(&self, text: &str) -> String {
        let text = self.internal_link.replace_all(text, "$1");
        let text = self.external_link.replace_all(&text, "$1");
        let text = self.emphasis.replace_all(&text, "");
        clean_text(&text)
    }
}

#[derive(Debug, Default)]
struct WikiTable {
    caption: Option<String>,
    section: Option<String>,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl WikiTable {
    fn finish_row(&mut self, row: &mut Vec<WikiCell>) {
        if row.is_empty() {
            return;
        }
        let cells = std::mem::take(row);
        let all_header = cells.iter().all(|c| c.header);
        let texts: Vec<String> = cells.into_iter().map(|c| c.text).collect();

        if all_header && self.headers.is_empty() && self.rows.is_empty() {
            self.headers = texts;
        } else {
            self.rows.push(texts);
        }
    }

    fn into_fragment(self, index: usize, none_value: &CellValue) -> RawFragment {
        let key = self
            .caption
            .filter(|c| !c.is_empty())
            .or(self.section)
            .unwrap_or_else(|| format!("table{}", index));

        let width = self.headers.len();
        let rows = self
            .rows
            .into_iter()
            .map(|texts| {
                let values = texts.into_iter().map(CellValue::from).collect();
                RawRow::Positional(pad_row(values, width, none_value))
            })
            .collect();

        RawFragment::new(key, self.headers, rows)
    }
}

#[derive(Debug)]
struct WikiCell {
    header: bool,
    text: String,
}

/// Parses the markup up to the end of the next table on each call
struct WikiFragments {
    text: String,
    pos: usize,
    markup: Markup,
    none_value: CellValue,
    section: Option<String>,
    next_index: usize,
}

impl WikiFragments {
    fn new(text: String, markup: Markup, none_value: CellValue) -> Self {
        Self {
            text,
            pos: 0,
            markup,
            none_value,
            section: None,
            next_index: 0,
        }
    }

    fn finish(&mut self, mut table: WikiTable, row: &mut Vec<WikiCell>) -> RawFragment {
        table.finish_row(row);
        let index = self.next_index;
        self.next_index += 1;
        table.into_fragment(index, &self.none_value)
    }
}

impl Iterator for WikiFragments {
    type Item = RawFragment;

    fn next(&mut self) -> Option<Self::Item> {
        let mut current: Option<WikiTable> = None;
        let mut row: Vec<WikiCell> = Vec::new();

        while self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            let raw_line = match rest.find('\n') {
                Some(end) => {
                    self.pos += end + 1;
                    &rest[..end]
                }
                None => {
                    self.pos = self.text.len();
                    rest
                }
            };
            let line = raw_line.trim();
            let markup = &self.markup;

            if current.is_none() {
                if line.starts_with("{|") {
                    current = Some(WikiTable {
                        section: self.section.clone(),
                        ..Default::default()
                    });
                } else if let Some(caps) = markup.section.captures(line) {
                    self.section = caps
                        .get(2)
                        .map(|m| markup.render(m.as_str()))
                        .filter(|s| !s.is_empty());
                }
                continue;
            }
            let Some(table) = current.as_mut() else {
                continue;
            };

            if line.starts_with("|}") {
                let table = current.take()?;
                return Some(self.finish(table, &mut row));
            } else if let Some(rest) = line.strip_prefix("|+") {
                table.caption = Some(markup.render(strip_attributes(rest)));
            } else if line.starts_with("|-") {
                table.finish_row(&mut row);
            } else if let Some(rest) = line.strip_prefix('!') {
                for cell in split_cells(rest, &["!!", "||"]) {
                    row.push(WikiCell {
                        header: true,
                        text: markup.render(strip_attributes(cell)),
                    });
                }
            } else if let Some(rest) = line.strip_prefix('|') {
                for cell in split_cells(rest, &["||"]) {
                    row.push(WikiCell {
                        header: false,
                        text: markup.render(strip_attributes(cell)),
                    });
                }
            } else if !line.is_empty() {
                // Continuation of the previous cell
                if let Some(last) = row.last_mut() {
                    let more = markup.render(line);
                    if !more.is_empty() {
                        if !last.text.is_empty() {
                            last.text.push(' ');
                        }
                        last.text.push_str(&more);
                    }
                }
            }
        }

        // An unterminated table still counts
        let table = current?;
        Some(self.finish(table, &mut row))
    }
}

/// Split on any of `separators`, ignoring separators inside `[[...]]`/`{{...}}`
fn split_cells<'a>(line: &'a str, separators: &[&str]) -> Vec<&'a str> {
    let mut cells = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    let bytes = line.as_bytes();

    while i < bytes.len() {
        let rest = &line[i..];
        if rest.starts_with("[[") || rest.starts_with("{{") {
            depth += 1;
            i += 2;
            continue;
        }
        if depth > 0 && (rest.starts_with("]]") || rest.starts_with("}}")) {
            depth -= 1;
            i += 2;
            continue;
        }
        if depth == 0 {
            if let Some(sep) = separators.iter().find(|sep| rest.starts_with(**sep)) {
                cells.push(&line[start..i]);
                i += sep.len();
                start = i;
                continue;
            }
        }
        i += rest.chars().next().map_or(1, char::len_utf8);
    }
    cells.push(&line[start..]);
    cells
}

/// Drop a leading `attributes |` prefix from a cell
fn strip_attributes(cell: &str) -> &str {
    let mut depth = 0usize;
    let bytes = cell.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'[' | b'{' if bytes.get(i + 1) == Some(&bytes[i]) => {
                depth += 1;
                i += 2;
                continue;
            }
            b']' | b'}' if depth > 0 && bytes.get(i + 1) == Some(&bytes[i]) => {
                depth -= 1;
                i += 2;
                continue;
            }
            b'|' if depth == 0 => {
                let (attrs, content) = (&cell[..i], &cell[i + 1..]);
                if attrs.contains('=') || attrs.trim().is_empty() {
                    return content;
                }
                return cell;
            }
            _ => {}
        }
        i += 1;
    }
    cell
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::collect_tables;
    use crate::ErrorKind;

    const ARTICLE: &str = r#"
Intro text.

== Population ==
{| class="wikitable"
|+ Largest cities
|-
! City !! Country !! Population
|-
| [[Tokyo]] || [[Japan|JP]] || 37,400,068
|-
| style="color:red" | '''Delhi''' || India
| 28,514,000
|}

== Rivers ==
{| class="wikitable"
! Name
! Length
|-
| Nile || 6650
|}
"#;

    fn load(text: &str) -> Vec<crate::TableData> {
        let tables = MediaWikiTableTextLoader::new(text, "article").load().unwrap();
        collect_tables(tables, "article").unwrap()
    }

    #[test]
    fn test_load_wiki_tables() {
        let tables = load(ARTICLE);
        assert_eq!(tables.len(), 2);

        let cities = &tables[0];
        assert_eq!(cities.name(), "article_Largest cities");
        assert_eq!(cities.headers(), &["City", "Country", "Population"]);
        assert_eq!(
            cities.records(),
            &[
                vec![
                    CellValue::from("Tokyo"),
                    CellValue::from("JP"),
                    CellValue::from("37,400,068")
                ],
                vec![
                    CellValue::from("Delhi"),
                    CellValue::from("India"),
                    CellValue::from("28,514,000")
                ],
            ]
        );

        // no caption: section title is the key
        let rivers = &tables[1];
        assert_eq!(rivers.name(), "article_Rivers");
        assert_eq!(rivers.headers(), &["Name", "Length"]);
        assert_eq!(
            rivers.records(),
            &[vec![CellValue::from("Nile"), CellValue::from("6650")]]
        );
    }

    #[test]
    fn test_table_without_caption_or_section() {
        let text = "{|\n! a\n|-\n| 1\n|}\n";
        let tables = load(text);
        assert_eq!(tables[0].name(), "article_table0");
    }

    #[test]
    fn test_no_table_is_empty_data() {
        let err = MediaWikiTableTextLoader::new("== Heading ==\nplain text", "x")
            .load()
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::EmptyData);
    }

    #[test]
    fn test_tables_are_parsed_one_at_a_time() {
        let markup = Markup::new("article").unwrap();
        let mut fragments = WikiFragments::new(ARTICLE.to_string(), markup, CellValue::Null);

        let first = fragments.next().unwrap();
        assert_eq!(first.key, "Largest cities");
        // the second table has not been read yet
        assert!(fragments.pos < ARTICLE.find("== Rivers ==").unwrap());

        let second = fragments.next().unwrap();
        assert_eq!(second.key, "Rivers");
        assert!(fragments.next().is_none());
    }

    #[test]
    fn test_unterminated_table_is_kept() {
        let tables = load("{|\r\n! a\r\n|-\r\n| 1\r\n");
        assert_eq!(tables[0].headers(), &["a"]);
        assert_eq!(tables[0].records(), &[vec![CellValue::from("1")]]);
    }

    #[test]
    fn test_split_cells_ignores_links() {
        assert_eq!(
            split_cells(" [[a||b]] || c ", &["||"]),
            vec![" [[a||b]] ", " c "]
        );
    }

    #[test]
    fn test_strip_attributes() {
        assert_eq!(strip_attributes(r#" align="right" | 42"#), " 42");
        assert_eq!(strip_attributes(" [[Page|label]]"), " [[Page|label]]");
        assert_eq!(strip_attributes(" plain"), " plain");
    }

    #[test]
    fn test_short_rows_padded_with_none_value() {
        let text = "{|\n! a !! b\n|-\n| 1\n|}\n";
        let tables: Vec<_> = MediaWikiTableTextLoader::new(text, "p")
            .with_none_value("?")
            .load()
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            tables[0].records(),
            &[vec![CellValue::from("1"), CellValue::from("?")]]
        );
    }
}
