//! Table name templates and name validation

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Longest accepted table name, in characters
pub const MAX_TABLE_NAME_LEN: usize = 255;

static GLOBAL_TABLE_ID: AtomicUsize = AtomicUsize::new(0);

/// Values available to a table name template
#[derive(Debug, Clone, Default)]
pub struct NameContext<'a> {
    /// Source name hint (file stem for file loaders)
    pub filename: &'a str,
    /// Per-table key: sheet name, JSON key, HTML id or caption, wiki caption
    pub key: &'a str,
    /// Short name of the source format
    pub format_name: &'a str,
    /// Ordinal of the table within the current load
    pub format_id: usize,
    /// Document title, when the format has one
    pub title: Option<&'a str>,
}

/// A table name with `%(placeholder)s` substitutions.
///
/// Supported placeholders: `%(filename)s`, `%(key)s`, `%(format_name)s`,
/// `%(format_id)s`, `%(global_id)s` and `%(title)s`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableNameTemplate(String);

impl TableNameTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the template; `%(global_id)s` draws from a process-wide counter
    pub fn render(&self, ctx: &NameContext<'_>) -> String {
        let mut name = self
            .0
            .replace("%(filename)s", ctx.filename)
            .replace("%(key)s", ctx.key)
            .replace("%(format_name)s", ctx.format_name)
            .replace("%(format_id)s", &ctx.format_id.to_string())
            .replace("%(title)s", ctx.title.unwrap_or(ctx.filename));

        if name.contains("%(global_id)s") {
            let id = GLOBAL_TABLE_ID.fetch_add(1, Ordering::Relaxed);
            name = name.replace("%(global_id)s", &id.to_string());
        }

        name
    }
}

impl From<&str> for TableNameTemplate {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Check a rendered table name
pub fn validate_table_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("name is empty".to_string())
    } else if name.chars().count() > MAX_TABLE_NAME_LEN {
        Some(format!("name is longer than {} characters", MAX_TABLE_NAME_LEN))
    } else if name.chars().any(char::is_control) {
        Some("name contains control characters".to_string())
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::InvalidTableName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// What to do with blank header names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlankHeaders {
    /// Fail with `InvalidHeaderName`
    #[default]
    Reject,
    /// Name the column `column_<n>` (1-based)
    AutoName,
}

/// What to do with repeated header names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateHeaders {
    /// Fail with `InvalidHeaderName`
    #[default]
    Reject,
    /// Append `_2`, `_3`, ... to later occurrences
    Suffix,
}

/// Header validation policy applied to headers extracted from a source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderPolicy {
    pub blank: BlankHeaders,
    pub duplicates: DuplicateHeaders,
}

impl HeaderPolicy {
    /// Trim and validate `headers` for the table `table`
    pub fn apply(&self, table: &str, headers: Vec<String>) -> Result<Vec<String>> {
        let invalid = |header: &str, reason: &str| Error::InvalidHeaderName {
            table: table.to_string(),
            header: header.to_string(),
            reason: reason.to_string(),
        };

        let trimmed: Vec<String> = headers
            .into_iter()
            .enumerate()
            .map(|(idx, header)| {
                let header = header.trim();
                match (header.is_empty(), self.blank) {
                    (false, _) => Ok(header.to_string()),
                    (true, BlankHeaders::AutoName) => Ok(format!("column_{}", idx + 1)),
                    (true, BlankHeaders::Reject) => {
                        Err(invalid(header, &format!("header {} is blank", idx + 1)))
                    }
                }
            })
            .collect::<Result<_>>()?;

        let mut taken: HashSet<String> = trimmed.iter().cloned().collect();
        let mut seen: HashSet<String> = HashSet::new();
        let mut result = Vec::with_capacity(trimmed.len());

        for header in trimmed {
            if seen.insert(header.clone()) {
                result.push(header);
                continue;
            }

            match self.duplicates {
                DuplicateHeaders::Reject => {
                    return Err(invalid(&header, "duplicate header name"));
                }
                DuplicateHeaders::Suffix => {
                    let renamed = (2..)
                        .map(|n| format!("{}_{}", header, n))
                        .find(|candidate| !taken.contains(candidate))
                        .unwrap_or_default();
                    tracing::warn!(table, header = %header, renamed = %renamed, "renamed duplicate header");
                    taken.insert(renamed.clone());
                    seen.insert(renamed.clone());
                    result.push(renamed);
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn owned(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_placeholders() {
        let template = TableNameTemplate::new("%(filename)s_%(key)s_%(format_name)s%(format_id)s");
        let ctx = NameContext {
            filename: "report",
            key: "Sheet1",
            format_name: "spreadsheet",
            format_id: 2,
            title: None,
        };
        assert_eq!(template.render(&ctx), "report_Sheet1_spreadsheet2");
    }

    #[test]
    fn test_title_falls_back_to_filename() {
        let template = TableNameTemplate::new("%(title)s_%(key)s");
        let mut ctx = NameContext {
            filename: "page",
            key: "table0",
            ..Default::default()
        };
        assert_eq!(template.render(&ctx), "page_table0");

        ctx.title = Some("Prices");
        assert_eq!(template.render(&ctx), "Prices_table0");
    }

    #[test]
    fn test_global_id_increases() {
        let template = TableNameTemplate::new("t%(global_id)s");
        let ctx = NameContext::default();
        let first: usize = template.render(&ctx)[1..].parse().unwrap();
        let second: usize = template.render(&ctx)[1..].parse().unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("sales_2024").is_ok());
        assert!(validate_table_name("Année fiscale").is_ok());

        for bad in ["", "   ", "tab\tname"] {
            let err = validate_table_name(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidTableName);
        }
        assert!(validate_table_name(&"x".repeat(MAX_TABLE_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_default_policy_rejects_blank_and_duplicates() {
        let policy = HeaderPolicy::default();

        let err = policy.apply("t", owned(&["a", " "])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHeaderName);

        let err = policy.apply("t", owned(&["a", "b", "a"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHeaderName);
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_headers_are_trimmed() {
        let headers = HeaderPolicy::default().apply("t", owned(&[" id ", "name"])).unwrap();
        assert_eq!(headers, owned(&["id", "name"]));
    }

    #[test]
    fn test_auto_name_and_suffix() {
        let policy = HeaderPolicy {
            blank: BlankHeaders::AutoName,
            duplicates: DuplicateHeaders::Suffix,
        };

        let headers = policy
            .apply("t", owned(&["a", "", "a", "a_2", "a"]))
            .unwrap();
        assert_eq!(headers, owned(&["a", "column_2", "a_3", "a_2", "a_4"]));
    }

    #[test]
    fn test_policy_from_json() {
        let policy: HeaderPolicy =
            serde_json::from_str(r#"{"duplicates": "suffix"}"#).unwrap();
        assert_eq!(policy.blank, BlankHeaders::Reject);
        assert_eq!(policy.duplicates, DuplicateHeaders::Suffix);
    }
}
