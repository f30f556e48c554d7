//! JSON table loaders
//!
//! Two document shapes are accepted:
//!
//! - an array of objects, loaded as a single table keyed by the source name
//! - an object whose values are arrays of objects, one table per key
//!
//! Headers are the sorted union of the object keys of a table.

use crate::error::{Error, Result};
use crate::loader::{
    read_source, source_name_of, LoaderConfig, RawFragment, TableBuilder, TableIter, TableLoader,
};
use crate::row::RawRow;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const FORMAT_NAME: &str = "json";
const DEFAULT_TEMPLATE: &str = "%(key)s";

/// Loads tables from JSON text
#[derive(Debug, Clone)]
pub struct JsonTableTextLoader {
    text: String,
    source_name: String,
    config: LoaderConfig,
}

impl JsonTableTextLoader {
    pub fn new(text: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_name: source_name.into(),
            config: LoaderConfig::default(),
        }
    }
}

impl TableLoader for JsonTableTextLoader {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn config_mut(&mut self) -> &mut LoaderConfig {
        &mut self.config
    }

    fn load(self) -> Result<TableIter> {
        let document: Value = serde_json::from_str(&self.text).map_err(|e| Error::Json {
            source_name: self.source_name.clone(),
            source: e,
        })?;

        let source_name = self.source_name;
        let fragments: Box<dyn Iterator<Item = Result<RawFragment>>> = match document {
            Value::Array(items) if items.is_empty() => {
                return Err(Error::EmptyData(source_name));
            }
            Value::Array(items) => {
                let fragment = table_fragment(&source_name, source_name.clone(), items);
                Box::new(std::iter::once(fragment))
            }
            Value::Object(map) if map.is_empty() => {
                return Err(Error::EmptyData(source_name));
            }
            Value::Object(map) => {
                let source = source_name.clone();
                Box::new(map.into_iter().map(move |(key, value)| match value {
                    Value::Array(items) => table_fragment(&source, key, items),
                    other => Err(Error::validation(
                        &source,
                        format!(
                            "value of '{}' must be an array of objects, found {}",
                            key,
                            json_type(&other)
                        ),
                    )),
                }))
            }
            other => {
                return Err(Error::validation(
                    &source_name,
                    format!(
                        "top-level value must be an array or an object, found {}",
                        json_type(&other)
                    ),
                ));
            }
        };

        let builder = TableBuilder::new(FORMAT_NAME, DEFAULT_TEMPLATE, source_name, self.config);
        Ok(builder.into_tables(fragments))
    }
}

/// Loads tables from a JSON file
#[derive(Debug, Clone)]
pub struct JsonTableFileLoader {
    path: PathBuf,
    config: LoaderConfig,
}

impl JsonTableFileLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config: LoaderConfig::default(),
        }
    }
}

impl TableLoader for JsonTableFileLoader {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn config_mut(&mut self) -> &mut LoaderConfig {
        &mut self.config
    }

    fn load(self) -> Result<TableIter> {
        let text = read_source(&self.path)?;

        JsonTableTextLoader::new(text, source_name_of(&self.path))
            .with_config(self.config)
            .load()
    }
}

/// One table from an array of objects
fn table_fragment(source_name: &str, key: String, items: Vec<Value>) -> Result<RawFragment> {
    let mut headers = BTreeSet::new();
    for (idx, item) in items.iter().enumerate() {
        match item {
            Value::Object(map) => headers.extend(map.keys().cloned()),
            other => {
                return Err(Error::validation(
                    source_name,
                    format!(
                        "record {} of '{}' must be an object, found {}",
                        idx,
                        key,
                        json_type(other)
                    ),
                ));
            }
        }
    }

    let rows = items.into_iter().map(RawRow::from).collect();
    Ok(RawFragment::new(key, headers.into_iter().collect(), rows))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
