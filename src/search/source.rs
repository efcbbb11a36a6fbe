//! Result source contract and registry / 搜索结果源接口与注册表
//!
//! A source contributes one kind of searchable content: it declares its weight
//! buckets, renders a (searching, merging) fragment pair for a dialect, and
//! maps its own result ids back to a page URL.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Result, SearchError};
use super::buckets::ColumnNamesByBucket;
use super::dialect::{ensure_identifier, DatabaseType, Dialect, NamedSubquery, TextExtraction};
use super::language::{FallbackReason, LanguageResolution};
use super::schema::{AdditionalParameters, SearchQueryInput, SearchResult, SearchResultTypeName, RESULT_COLUMNS};

/// Select producing the common result row shape / 合并片段
///
/// Only built through [`MergingFragment::select`], which renders the aliases
/// itself, so the declared columns always match the SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergingFragment {
    sql: String,
    columns: Vec<String>,
}

impl MergingFragment {
    /// Build the canonical select over `from` / 生成标准合并查询
    pub fn select(columns: MergeColumns<'_>, from: &str) -> Self {
        let exprs = [
            columns.result_id,
            columns.result_type,
            columns.result_title,
            columns.score,
            columns.metadata,
        ];
        let select_list: Vec<String> = exprs
            .iter()
            .zip(RESULT_COLUMNS)
            .map(|(expr, alias)| format!("{} as {}", expr, alias))
            .collect();
        Self {
            sql: format!("select {} from {}", select_list.join(", "), from),
            columns: RESULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Hand-written select; `columns` declares its output column names in order
    #[cfg(test)]
    pub(crate) fn raw(sql: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            sql: sql.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Union arms must line up column by column / 校验列形状
    pub fn check_shape(&self, source_name: &str) -> Result<()> {
        let matches = self.columns.len() == RESULT_COLUMNS.len()
            && self
                .columns
                .iter()
                .zip(RESULT_COLUMNS)
                .all(|(found, expected)| found.eq_ignore_ascii_case(expected));
        if matches {
            Ok(())
        } else {
            Err(SearchError::FragmentShapeMismatch {
                source_name: source_name.to_string(),
                expected: RESULT_COLUMNS.join(", "),
                found: self.columns.join(", "),
            })
        }
    }
}

/// SQL expressions for each common column / 合并列表达式
#[derive(Debug, Clone, Copy)]
pub struct MergeColumns<'a> {
    pub result_id: &'a str,
    pub result_type: &'a str,
    pub result_title: &'a str,
    pub score: &'a str,
    pub metadata: &'a str,
}

/// One source's contribution to the composed query / 片段对
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentPair {
    /// Sibling CTE arms selecting and scoring candidate rows
    pub searching: Vec<NamedSubquery>,
    pub merging: MergingFragment,
}

/// Stored column computed from another column at write time / 生成列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedColumn {
    pub name: String,
    /// Column (or expression) the text is extracted from
    pub source: String,
    pub extraction: TextExtraction,
}

impl GeneratedColumn {
    pub fn validate(&self) -> Result<()> {
        ensure_identifier(&self.name)?;
        ensure_identifier(&self.source)?;
        self.extraction.validate()
    }
}

/// What index provisioning needs from a source / 索引目标
#[derive(Debug, Clone, Copy)]
pub struct IndexTarget<'a> {
    pub table: &'a str,
    pub buckets: &'a ColumnNamesByBucket,
    pub generated_columns: &'a [GeneratedColumn],
}

/// Pluggable search source / 搜索结果源
pub trait SearchSource: Send + Sync {
    fn type_name(&self) -> &SearchResultTypeName;

    /// Table and buckets to index; `None` for sources without own indexes
    fn index_target(&self) -> Option<IndexTarget<'_>>;

    /// Render fragments for `dialect`. Must be a pure function of its inputs.
    fn fragments(&self, dialect: &dyn Dialect, input: &SearchQueryInput) -> Result<FragmentPair>;

    /// Navigable URL of a result; `None` if the document has no public location
    fn document_url(&self, result: &SearchResult) -> Option<String>;
}

/// Ordered, immutable list of registered sources / 搜索源注册表
#[derive(Clone)]
pub struct SourceRegistry {
    sources: Arc<Vec<Box<dyn SearchSource>>>,
}

impl SourceRegistry {
    /// Validate and freeze the source list / 注册并校验搜索源
    ///
    /// Names must be unique, and every source must render shape-compatible
    /// fragments for each implemented dialect (probed with an empty input).
    pub fn new(sources: Vec<Box<dyn SearchSource>>) -> Result<Self> {
        if sources.is_empty() {
            return Err(SearchError::NoSources);
        }

        let mut names = HashSet::new();
        for source in &sources {
            let name = source.type_name();
            if !names.insert(name.clone()) {
                return Err(SearchError::DuplicateSource(name.to_string()));
            }
            if let Some(target) = source.index_target() {
                ensure_identifier(target.table)?;
                target.buckets.validate(name.as_str())?;
                for column in target.generated_columns {
                    column.validate()?;
                }
            }
            for dialect in implemented_dialects() {
                let pair = source.fragments(dialect, &probe_input())?;
                pair.merging.check_shape(name.as_str())?;
            }
            tracing::info!("Search source registered: {}", name);
        }

        Ok(Self { sources: Arc::new(sources) })
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn SearchSource> + '_ {
        self.sources.iter().map(|s| s.as_ref())
    }

    pub fn get(&self, type_name: &str) -> Option<&dyn SearchSource> {
        self.iter().find(|s| s.type_name().as_str() == type_name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn implemented_dialects() -> impl Iterator<Item = &'static dyn Dialect> {
    [DatabaseType::MariaDb, DatabaseType::PostgreSql]
        .into_iter()
        .filter_map(|t| t.dialect().ok())
}

fn probe_input() -> SearchQueryInput {
    SearchQueryInput {
        term: String::new(),
        additional_parameters: AdditionalParameters::new(),
        language: LanguageResolution::Fallback {
            language: String::new(),
            reason: FallbackReason::Missing,
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::search::buckets::Bucket;

    /// Minimal source for registry/composer tests
    pub(crate) struct StaticSource {
        pub name: SearchResultTypeName,
        pub buckets: ColumnNamesByBucket,
        pub merging_columns: Vec<&'static str>,
    }

    impl StaticSource {
        pub fn new(name: &str) -> Self {
            Self {
                name: SearchResultTypeName::new(name).unwrap(),
                buckets: ColumnNamesByBucket::new().with(Bucket::Critical, "title"),
                merging_columns: RESULT_COLUMNS.to_vec(),
            }
        }
    }

    impl SearchSource for StaticSource {
        fn type_name(&self) -> &SearchResultTypeName {
            &self.name
        }

        fn index_target(&self) -> Option<IndexTarget<'_>> {
            Some(IndexTarget {
                table: self.name.as_str(),
                buckets: &self.buckets,
                generated_columns: &[],
            })
        }

        fn fragments(&self, dialect: &dyn Dialect, _input: &SearchQueryInput) -> Result<FragmentPair> {
            let cte = format!("{}_hits", self.name);
            let searching = NamedSubquery::new(
                &cte,
                format!(
                    "select id, title, {} as score from {} where {}",
                    dialect.fulltext_match(&["title"], "query"),
                    self.name,
                    dialect.fulltext_match(&["title"], "query"),
                ),
            )?;
            let merging = MergingFragment::raw(
                format!(
                    "select id as result_id, {} as result_type, title as result_title, score, null as metadata from {}",
                    dialect.quote_literal(self.name.as_str()),
                    cte
                ),
                &self.merging_columns,
            );
            Ok(FragmentPair { searching: vec![searching], merging })
        }

        fn document_url(&self, result: &SearchResult) -> Option<String> {
            Some(format!("/{}/{}", self.name, result.result_id))
        }
    }

    #[test]
    fn test_merging_select_renders_aliases_in_order() {
        let fragment = MergingFragment::select(
            MergeColumns {
                result_id: "id",
                result_type: "'articles'",
                result_title: "title",
                score: "score",
                metadata: "null",
            },
            "articles_hits",
        );
        assert_eq!(
            fragment.sql(),
            "select id as result_id, 'articles' as result_type, title as result_title, score as score, null as metadata from articles_hits"
        );
        assert!(fragment.check_shape("articles").is_ok());
    }

    #[test]
    fn test_raw_fragment_with_wrong_columns_is_rejected() {
        let fragment = MergingFragment::raw("select id, title from x", &["id", "title"]);
        match fragment.check_shape("articles") {
            Err(SearchError::FragmentShapeMismatch { source_name, found, .. }) => {
                assert_eq!(source_name, "articles");
                assert_eq!(found, "id, title");
            }
            other => panic!("expected FragmentShapeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let result = SourceRegistry::new(vec![
            Box::new(StaticSource::new("articles")),
            Box::new(StaticSource::new("articles")),
        ]);
        assert!(matches!(result, Err(SearchError::DuplicateSource(name)) if name == "articles"));
    }

    #[test]
    fn test_registry_detects_shape_mismatch_at_registration() {
        let mut broken = StaticSource::new("pages");
        broken.merging_columns = vec!["result_id", "result_type", "result_title", "score"];
        let result = SourceRegistry::new(vec![Box::new(StaticSource::new("articles")), Box::new(broken)]);
        assert!(matches!(result, Err(SearchError::FragmentShapeMismatch { .. })));
    }

    #[test]
    fn test_registry_rejects_empty_list() {
        assert!(matches!(SourceRegistry::new(Vec::new()), Err(SearchError::NoSources)));
    }

    #[test]
    fn test_registry_keeps_registration_order() {
        let registry = SourceRegistry::new(vec![
            Box::new(StaticSource::new("pages")),
            Box::new(StaticSource::new("articles")),
        ])
        .unwrap();
        let names: Vec<&str> = registry.iter().map(|s| s.type_name().as_str()).collect();
        assert_eq!(names, vec!["pages", "articles"]);
        assert!(registry.get("articles").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 2);
    }
}
