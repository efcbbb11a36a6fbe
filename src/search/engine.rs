//! Search engine - composes, executes and maps one federated query / 搜索引擎
//!
//! Architecture principle: one search call produces exactly one SQL statement.
//! The engine keeps no per-request state; the database type and the source
//! registry are read-only and shared.

use std::collections::HashMap;

use crate::error::{Result, SearchError};
use super::composer::{ComposedQuery, QueryComposer};
use super::dialect::{DatabaseType, Dialect};
use super::executor::{ResultRow, SqlExecutor};
use super::language::resolve_language;
use super::params::{bind_named, BoundStatement, SqlValue};
use super::schema::{SearchQueryInput, SearchRequest, SearchResult, SearchResultFrontend};
use super::source::SourceRegistry;

/// Placeholder name of the prepared search term
pub const QUERY_PARAM: &str = "query";
/// Placeholder name of the row limit
pub const LIMIT_PARAM: &str = "limit";

/// Language settings used to resolve request hints / 语言设置
#[derive(Debug, Clone)]
pub struct LanguageSettings {
    pub default_language: String,
    pub languages: Vec<String>,
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            languages: vec!["en".to_string()],
        }
    }
}

/// Federated search engine / 联合搜索引擎
pub struct SearchEngine<E: SqlExecutor> {
    database: DatabaseType,
    registry: SourceRegistry,
    executor: E,
    languages: LanguageSettings,
}

impl<E: SqlExecutor> SearchEngine<E> {
    pub fn new(database: DatabaseType, registry: SourceRegistry, executor: E) -> Self {
        Self {
            database,
            registry,
            executor,
            languages: LanguageSettings::default(),
        }
    }

    pub fn with_languages(mut self, languages: LanguageSettings) -> Self {
        self.languages = languages;
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn database_type(&self) -> DatabaseType {
        self.database
    }

    fn dialect(&self) -> Result<&'static dyn Dialect> {
        self.database.dialect()
    }

    fn query_input(&self, request: &SearchRequest) -> SearchQueryInput {
        let language = resolve_language(
            request.language_hint.as_deref(),
            &self.languages.languages,
            &self.languages.default_language,
        );
        if language.is_fallback() {
            tracing::debug!("Search language fallback: {:?}", language);
        }
        SearchQueryInput {
            term: request.term.clone(),
            additional_parameters: request.additional_parameters.clone(),
            language,
        }
    }

    /// Compose the statement for a request without executing it / 生成查询SQL
    pub fn compose(&self, request: &SearchRequest) -> Result<ComposedQuery> {
        let dialect = self.dialect()?;
        QueryComposer::new(dialect).compose(&self.registry, &self.query_input(request))
    }

    /// Compose and bind the term and limit / 生成并绑定参数
    pub fn prepare(&self, request: &SearchRequest) -> Result<BoundStatement> {
        if request.limit == 0 {
            return Err(SearchError::InvalidLimit);
        }
        let dialect = self.dialect()?;
        let term = dialect.prepare_search_term(&request.term);
        let composed = QueryComposer::new(dialect).compose(&self.registry, &self.query_input(request))?;

        let limit = i64::try_from(request.limit).unwrap_or(i64::MAX);
        let params = HashMap::from([
            (QUERY_PARAM, SqlValue::Text(term)),
            (LIMIT_PARAM, SqlValue::Int(limit)),
        ]);
        bind_named(&composed.sql, &params)
    }

    /// Run one federated search (primitive operation) / 搜索
    ///
    /// Results are score-descending and at most `limit` long. An input that
    /// prepares to an empty term returns no results without touching the
    /// database.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchResult>> {
        let dialect = self.dialect()?;
        if request.limit == 0 {
            return Err(SearchError::InvalidLimit);
        }
        if dialect.prepare_search_term(&request.term).is_empty() {
            tracing::debug!("Empty search term after preparation, skipping query");
            return Ok(Vec::new());
        }

        let statement = self.prepare(request)?;
        let rows = self.executor.fetch_results(&statement).await?;
        tracing::debug!("Search for {:?} returned {} rows", request.term, rows.len());

        Ok(rows.into_iter().map(map_result).collect())
    }

    /// Search and attach each result's URL from its owning source / 搜索并附加链接
    pub async fn search_frontend(&self, request: &SearchRequest) -> Result<Vec<SearchResultFrontend>> {
        let results = self.search(request).await?;
        Ok(results.into_iter().map(|r| self.enrich(r)).collect())
    }

    /// Missing source or missing URL both leave `url` empty.
    pub fn enrich(&self, result: SearchResult) -> SearchResultFrontend {
        let url = self
            .registry
            .get(&result.result_type)
            .and_then(|source| source.document_url(&result));
        SearchResultFrontend { result, url }
    }
}

fn map_result(row: ResultRow) -> SearchResult {
    let metadata = row.metadata.and_then(|raw| match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring unparsable metadata for {}: {}", row.result_id, e);
            None
        }
    });
    SearchResult {
        result_id: row.result_id,
        result_type: row.result_type,
        result_title: row.result_title.unwrap_or_default(),
        score: row.score,
        metadata,
    }
}
