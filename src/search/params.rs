//! Named parameter binding / 命名参数绑定
//!
//! Fragments reference engine parameters as `:name`, possibly several times.
//! Drivers only understand positional `?`, so the statement is rewritten and
//! every occurrence gets its own bound value.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

use crate::error::{Result, SearchError};

/// String literals and `::` casts are matched first so their contents are
/// never mistaken for placeholders.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'(?:[^'\\]|\\.|'')*'|::|:([A-Za-z_][A-Za-z0-9_]*)").expect("placeholder pattern is valid")
});

/// Value bound to a placeholder / 参数值
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
}

/// Positional statement ready for execution / 已绑定的语句
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Rewrite `:name` placeholders to `?` and collect values in order / 展开命名参数
pub fn bind_named(sql: &str, params: &HashMap<&str, SqlValue>) -> Result<BoundStatement> {
    let mut values = Vec::new();
    let mut missing: Option<String> = None;

    let rewritten = PLACEHOLDER.replace_all(sql, |caps: &Captures| {
        let Some(name) = caps.get(1) else {
            return caps[0].to_string();
        };
        match params.get(name.as_str()) {
            Some(value) => {
                values.push(value.clone());
                "?".to_string()
            }
            None => {
                missing.get_or_insert_with(|| name.as_str().to_string());
                caps[0].to_string()
            }
        }
    });

    if let Some(name) = missing {
        return Err(SearchError::UnboundParameter(name));
    }

    Ok(BoundStatement {
        sql: rewritten.into_owned(),
        values,
    })
}
