//! Search request/result value objects / 搜索请求与结果的数据结构

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::error::{Result, SearchError};
use super::dialect::ensure_identifier;
use super::language::LanguageResolution;

/// Column names every merging fragment must produce, in order / 合并片段必须输出的列
pub const RESULT_COLUMNS: [&str; 5] = [
    "result_id",
    "result_type",
    "result_title",
    "score",
    "metadata",
];

/// Stable identifier of a search source / 搜索结果类型名
///
/// Used for index naming (`idx_<name>_<bucket>`) and for tagging result rows,
/// so it must be a plain SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SearchResultTypeName(String);

impl SearchResultTypeName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        ensure_identifier(&name)?;
        Ok(Self(name))
    }

    /// Built-in names known to be plain identifiers
    pub(crate) fn from_static(name: &'static str) -> Self {
        debug_assert!(ensure_identifier(name).is_ok());
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SearchResultTypeName {
    type Error = SearchError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SearchResultTypeName> for String {
    fn from(name: SearchResultTypeName) -> Self {
        name.0
    }
}

impl fmt::Display for SearchResultTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source-specific request parameters (site, allowed types, workspace, ...) / 附加参数
///
/// Opaque to the composer; each source decides which keys it consumes.
pub type AdditionalParameters = HashMap<String, Value>;

/// Inbound search request from the hosting layer / 搜索请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub term: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub additional_parameters: AdditionalParameters,
    #[serde(default)]
    pub language_hint: Option<String>,
}

fn default_limit() -> usize { 50 }

impl SearchRequest {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            limit: default_limit(),
            additional_parameters: AdditionalParameters::new(),
            language_hint: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.additional_parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language_hint = Some(language.into());
        self
    }
}

/// What the sources see when rendering their fragments / 片段生成时的查询输入
#[derive(Debug, Clone)]
pub struct SearchQueryInput {
    /// Raw user term (before dialect preparation)
    pub term: String,
    pub additional_parameters: AdditionalParameters,
    pub language: LanguageResolution,
}

impl SearchQueryInput {
    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.additional_parameters.get(key)
    }
}

/// One ranked result row / 搜索结果
///
/// Identity is `(result_id, result_type)`; the score is the sum of every
/// fragment that matched this identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub result_id: String,
    pub result_type: String,
    pub result_title: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Result enriched with a navigable URL / 带链接的搜索结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultFrontend {
    #[serde(flatten)]
    pub result: SearchResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Drop results scoring below `min_score` (caller-side cutoff) / 按最低分过滤
pub fn apply_min_score(results: Vec<SearchResult>, min_score: f64) -> Vec<SearchResult> {
    results.into_iter().filter(|r| r.score >= min_score).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, score: f64) -> SearchResult {
        SearchResult {
            result_id: id.to_string(),
            result_type: "article".to_string(),
            result_title: format!("Title {}", id),
            score,
            metadata: None,
        }
    }

    #[test]
    fn test_type_name_rejects_non_identifiers() {
        assert!(SearchResultTypeName::new("articles").is_ok());
        assert!(SearchResultTypeName::new("neos_content").is_ok());
        assert!(matches!(
            SearchResultTypeName::new("bad name"),
            Err(SearchError::InvalidIdentifier(_))
        ));
        assert!(SearchResultTypeName::new("x'; drop table t; --").is_err());
    }

    #[test]
    fn test_apply_min_score_keeps_order() {
        let results = vec![result("1", 9.0), result("2", 0.4), result("3", 1.5)];
        let kept = apply_min_score(results, 1.0);
        let ids: Vec<&str> = kept.iter().map(|r| r.result_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: SearchRequest = serde_json::from_str(r#"{"term": "launch"}"#).unwrap();
        assert_eq!(req.limit, 50);
        assert!(req.additional_parameters.is_empty());
        assert!(req.language_hint.is_none());
    }

    #[test]
    fn test_frontend_result_flattens() {
        let front = SearchResultFrontend {
            result: result("7", 2.0),
            url: Some("/articles/7".to_string()),
        };
        let json = serde_json::to_value(&front).unwrap();
        assert_eq!(json["result_id"], "7");
        assert_eq!(json["url"], "/articles/7");
        assert!(json.get("metadata").is_none());
    }
}
