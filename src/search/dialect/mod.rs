//! Dialect capability layer / 数据库方言能力层
//!
//! Everything database-specific lives behind the `Dialect` trait: fulltext index
//! DDL, text extraction expressions, search-term syntax and the final query
//! shape. Dialects are selected by the closed `DatabaseType` enumeration;
//! adding one means adding a variant plus one `Dialect` implementation.

pub mod mariadb;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SearchError};
use super::buckets::ColumnNamesByBucket;
use super::schema::SearchResultTypeName;

pub use mariadb::MariaDbDialect;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("identifier pattern is valid")
});

/// Reject anything that is not a plain, unquoted SQL identifier / 校验SQL标识符
pub fn ensure_identifier(name: &str) -> Result<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(SearchError::InvalidIdentifier(name.to_string()))
    }
}

/// Supported database types / 数据库类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    /// MariaDB / MySQL fulltext (`MATCH ... AGAINST ... IN BOOLEAN MODE`)
    MariaDb,
    /// Reserved; no dialect implementation yet / 预留，尚未实现
    PostgreSql,
}

impl DatabaseType {
    pub fn name(self) -> &'static str {
        match self {
            DatabaseType::MariaDb => "mariadb",
            DatabaseType::PostgreSql => "postgresql",
        }
    }

    /// Dialect implementation for this type / 获取方言实现
    pub fn dialect(self) -> Result<&'static dyn Dialect> {
        static MARIADB: MariaDbDialect = MariaDbDialect;
        match self {
            DatabaseType::MariaDb => Ok(&MARIADB),
            DatabaseType::PostgreSql => Err(SearchError::UnsupportedDatabase(self.name().to_string())),
        }
    }
}

impl FromStr for DatabaseType {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mariadb" | "mysql" => Ok(DatabaseType::MariaDb),
            "postgresql" | "postgres" => Ok(DatabaseType::PostgreSql),
            other => Err(SearchError::UnsupportedDatabase(other.to_string())),
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named sub-query rendered as one CTE arm (`name as (sql)`) / 命名子查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSubquery {
    pub name: String,
    pub sql: String,
}

impl NamedSubquery {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Result<Self> {
        let name = name.into();
        ensure_identifier(&name)?;
        Ok(Self { name, sql: sql.into() })
    }
}

/// How a generated search column derives its text / 文本提取方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextExtraction {
    Normalized,
    JsonField { key: String },
    HtmlTagContents { tags: Vec<String> },
    HtmlExcludingTags { tags: Vec<String> },
}

impl TextExtraction {
    pub fn render(&self, dialect: &dyn Dialect, expression: &str) -> String {
        match self {
            TextExtraction::Normalized => dialect.extract_normalized_text(expression),
            TextExtraction::JsonField { key } => dialect.extract_json_field(expression, key),
            TextExtraction::HtmlTagContents { tags } => {
                let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
                dialect.extract_html_tag_contents(expression, &tags)
            }
            TextExtraction::HtmlExcludingTags { tags } => {
                let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
                dialect.extract_html_excluding_tags(expression, &tags)
            }
        }
    }

    /// Tag names end up inside regular expressions, so they must be identifiers.
    pub fn validate(&self) -> Result<()> {
        match self {
            TextExtraction::HtmlTagContents { tags } | TextExtraction::HtmlExcludingTags { tags } => {
                tags.iter().try_for_each(|t| ensure_identifier(t))
            }
            _ => Ok(()),
        }
    }
}

/// Per-database SQL capabilities / 方言能力接口
///
/// Every method is a pure function of its arguments so fragments can be
/// compared as plain SQL text in tests.
pub trait Dialect: Send + Sync {
    fn database_type(&self) -> DatabaseType;

    /// Quote a string as a SQL literal / 字符串字面量转义
    fn quote_literal(&self, value: &str) -> String;

    /// Named placeholder for an engine-bound parameter
    fn parameter(&self, name: &str) -> String {
        format!(":{}", name)
    }

    /// Combined index plus one index per non-empty bucket / 创建全文索引
    fn create_fulltext_indexes(
        &self,
        source: &SearchResultTypeName,
        table: &str,
        buckets: &ColumnNamesByBucket,
    ) -> Vec<String>;

    /// Drop statements for all five conventional index names / 删除全文索引
    fn drop_fulltext_indexes(&self, source: &SearchResultTypeName, table: &str) -> Vec<String>;

    fn add_generated_column(&self, table: &str, column: &str, expression: &str) -> String;

    fn drop_generated_column(&self, table: &str, column: &str) -> String;

    /// Lowercased plain text: no tags, entities or punctuation, single spaces
    fn extract_normalized_text(&self, expression: &str) -> String;

    fn extract_json_field(&self, expression: &str, key: &str) -> String;

    fn extract_html_tag_contents(&self, expression: &str, tags: &[&str]) -> String;

    fn extract_html_excluding_tags(&self, expression: &str, tags: &[&str]) -> String;

    /// Raw user input to the dialect's fulltext syntax; empty input stays empty
    fn prepare_search_term(&self, raw: &str) -> String;

    /// Relevance expression of `columns` against a named parameter
    fn fulltext_match(&self, columns: &[&str], parameter: &str) -> String;

    fn json_object(&self, pairs: &[(&str, &str)]) -> String;

    /// Stitch searching CTEs and merging selects into the final statement
    fn compose_query(&self, searching: &[NamedSubquery], merging: &[String]) -> String;
}
