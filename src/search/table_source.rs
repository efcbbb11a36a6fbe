//! Configurable table-backed search source / 基于数据表的搜索源
//!
//! Covers the common case of "one content table, some weighted text columns":
//! scoring is the weighted sum of one fulltext match per non-empty bucket, and
//! candidate rows are selected through the combined index.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SearchError};
use super::buckets::{BucketWeights, ColumnNamesByBucket};
use super::dialect::{ensure_identifier, Dialect, NamedSubquery};
use super::engine::QUERY_PARAM;
use super::schema::{SearchQueryInput, SearchResult, SearchResultTypeName};
use super::source::{FragmentPair, GeneratedColumn, IndexTarget, MergeColumns, MergingFragment, SearchSource};

/// Restrict rows by an additional request parameter / 参数过滤
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterFilter {
    /// Key in the request's additional parameters
    pub parameter: String,
    pub column: String,
}

/// Table source definition (from `config.json`) / 数据表搜索源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSourceConfig {
    pub name: SearchResultTypeName,
    pub table: String,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    pub title_column: String,
    pub buckets: ColumnNamesByBucket,
    #[serde(default)]
    pub weights: BucketWeights,
    #[serde(default)]
    pub metadata_columns: Vec<String>,
    /// e.g. `/articles/{id}`
    #[serde(default)]
    pub url_template: Option<String>,
    #[serde(default)]
    pub filters: Vec<ParameterFilter>,
    #[serde(default)]
    pub language_column: Option<String>,
    #[serde(default)]
    pub generated_columns: Vec<GeneratedColumn>,
}

fn default_id_column() -> String { "id".to_string() }

impl TableSourceConfig {
    pub fn new(name: SearchResultTypeName, table: &str, title_column: &str, buckets: ColumnNamesByBucket) -> Self {
        Self {
            name,
            table: table.to_string(),
            id_column: default_id_column(),
            title_column: title_column.to_string(),
            buckets,
            weights: BucketWeights::default(),
            metadata_columns: Vec::new(),
            url_template: None,
            filters: Vec::new(),
            language_column: None,
            generated_columns: Vec::new(),
        }
    }
}

pub struct TableSource {
    config: TableSourceConfig,
}

impl TableSource {
    pub fn new(config: TableSourceConfig) -> Result<Self> {
        let name = config.name.as_str();
        ensure_identifier(&config.table)?;
        ensure_identifier(&config.id_column)?;
        ensure_identifier(&config.title_column)?;
        for column in &config.metadata_columns {
            ensure_identifier(column)?;
        }
        for filter in &config.filters {
            ensure_identifier(&filter.column)?;
        }
        if let Some(column) = &config.language_column {
            ensure_identifier(column)?;
        }
        config.buckets.validate(name)?;

        let w = &config.weights;
        if [w.critical, w.major, w.normal, w.minor].iter().any(|x| !x.is_finite() || *x < 0.0) {
            return Err(SearchError::invalid_source(name, "bucket weights must be finite and non-negative"));
        }
        if let Some(template) = &config.url_template {
            if !template.contains("{id}") {
                return Err(SearchError::invalid_source(name, "url_template must contain {id}"));
            }
        }
        Ok(Self { config })
    }

    fn cte_name(&self) -> String {
        format!("{}_hits", self.config.name)
    }

    fn score_expression(&self, dialect: &dyn Dialect) -> String {
        self.config
            .buckets
            .non_empty()
            .map(|(bucket, columns)| {
                let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
                format!(
                    "({} * {})",
                    self.config.weights.weight(bucket),
                    dialect.fulltext_match(&columns, QUERY_PARAM)
                )
            })
            .collect::<Vec<_>>()
            .join(" + ")
    }

    fn filter_conditions(&self, dialect: &dyn Dialect, input: &SearchQueryInput) -> Result<Vec<String>> {
        let mut conditions = Vec::new();
        for filter in &self.config.filters {
            let Some(value) = input.parameter(&filter.parameter) else {
                continue;
            };
            let condition = render_condition(dialect, &filter.column, value).ok_or_else(|| {
                SearchError::invalid_source(
                    self.config.name.as_str(),
                    format!("parameter '{}' has an unsupported value", filter.parameter),
                )
            })?;
            conditions.push(condition);
        }
        if let Some(column) = &self.config.language_column {
            let language = input.language.language();
            if !language.is_empty() {
                conditions.push(format!("{} = {}", column, dialect.quote_literal(language)));
            }
        }
        Ok(conditions)
    }
}

fn render_scalar(dialect: &dyn Dialect, value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(dialect.quote_literal(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

/// `column = v`, `column in (...)` or `column is null` / 渲染过滤条件
fn render_condition(dialect: &dyn Dialect, column: &str, value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(format!("{} is null", column)),
        Value::Array(items) if items.is_empty() => Some("1 = 0".to_string()),
        Value::Array(items) => {
            let rendered = items
                .iter()
                .map(|v| render_scalar(dialect, v))
                .collect::<Option<Vec<_>>>()?;
            Some(format!("{} in ({})", column, rendered.join(", ")))
        }
        scalar => render_scalar(dialect, scalar).map(|v| format!("{} = {}", column, v)),
    }
}

impl SearchSource for TableSource {
    fn type_name(&self) -> &SearchResultTypeName {
        &self.config.name
    }

    fn index_target(&self) -> Option<IndexTarget<'_>> {
        Some(IndexTarget {
            table: &self.config.table,
            buckets: &self.config.buckets,
            generated_columns: &self.config.generated_columns,
        })
    }

    fn fragments(&self, dialect: &dyn Dialect, input: &SearchQueryInput) -> Result<FragmentPair> {
        let c = &self.config;
        let cte = self.cte_name();

        let metadata_pairs: Vec<(&str, &str)> = c
            .metadata_columns
            .iter()
            .map(|col| (col.as_str(), col.as_str()))
            .collect();

        let mut predicates = vec![dialect.fulltext_match(&c.buckets.all_columns(), QUERY_PARAM)];
        predicates.extend(self.filter_conditions(dialect, input)?);

        let searching = NamedSubquery::new(
            &cte,
            format!(
                "select\n    {id} as id,\n    {title} as title,\n    {metadata} as metadata,\n    {score} as score\nfrom {table}\nwhere {predicates}",
                id = c.id_column,
                title = c.title_column,
                metadata = dialect.json_object(&metadata_pairs),
                score = self.score_expression(dialect),
                table = c.table,
                predicates = predicates.join("\n  and "),
            ),
        )?;

        let result_type = dialect.quote_literal(c.name.as_str());
        let merging = MergingFragment::select(
            MergeColumns {
                result_id: "cast(id as char)",
                result_type: &result_type,
                result_title: "title",
                score: "score",
                metadata: "metadata",
            },
            &cte,
        );

        Ok(FragmentPair { searching: vec![searching], merging })
    }

    fn document_url(&self, result: &SearchResult) -> Option<String> {
        self.config
            .url_template
            .as_ref()
            .map(|t| t.replace("{id}", &urlencoding::encode(&result.result_id)))
    }
}
