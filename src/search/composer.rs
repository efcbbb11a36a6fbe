//! Query composer / 查询组合器
//!
//! Turns the registry's fragment pairs into one statement: every searching
//! fragment becomes a sibling CTE, all merging fragments are unioned into
//! `all_results`, and the final select sums scores per `(result_id, result_type)`.
//! The composer is the only writer of composed SQL text.
//!
//! Each union arm carries the owning source's name in `source_tag`, so `union`
//! only collapses duplicate rows within one source; equal rows from two
//! sources both reach the sum.

use std::collections::HashSet;

use crate::error::{Result, SearchError};
use super::dialect::{Dialect, NamedSubquery};
use super::schema::{SearchQueryInput, SearchResultTypeName, RESULT_COLUMNS};
use super::source::{MergingFragment, SourceRegistry};

/// Name of the unioned CTE; reserved for the composer
pub const ALL_RESULTS_CTE: &str = "all_results";

/// Per-arm source discriminator; never selected by the final query
pub const SOURCE_TAG_COLUMN: &str = "source_tag";

/// Composed statement, still using named placeholders / 组合后的查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedQuery {
    pub sql: String,
    /// Number of sources whose fragments were stitched in
    pub source_count: usize,
}

pub struct QueryComposer<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> QueryComposer<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Render every registered source in registration order and assemble / 组合查询
    pub fn compose(&self, registry: &SourceRegistry, input: &SearchQueryInput) -> Result<ComposedQuery> {
        if registry.is_empty() {
            return Err(SearchError::NoSources);
        }

        let mut searching: Vec<NamedSubquery> = Vec::new();
        let mut merging: Vec<String> = Vec::with_capacity(registry.len());
        let mut names: HashSet<String> = HashSet::from([ALL_RESULTS_CTE.to_string()]);

        for source in registry.iter() {
            let pair = source.fragments(self.dialect, input)?;
            pair.merging.check_shape(source.type_name().as_str())?;

            for subquery in pair.searching {
                if !names.insert(subquery.name.to_lowercase()) {
                    return Err(SearchError::DuplicateSubquery(subquery.name));
                }
                searching.push(subquery);
            }
            merging.push(self.tagged_arm(source.type_name(), &pair.merging));
        }

        let sql = self.dialect.compose_query(&searching, &merging);
        tracing::debug!(
            "Composed search query: {} sources, {} sub-queries, {} bytes",
            merging.len(),
            searching.len(),
            sql.len()
        );

        Ok(ComposedQuery {
            sql,
            source_count: merging.len(),
        })
    }

    fn tagged_arm(&self, source: &SearchResultTypeName, merging: &MergingFragment) -> String {
        format!(
            "select {}, {} as {} from (\n{}\n) as {}_arm",
            RESULT_COLUMNS.join(", "),
            self.dialect.quote_literal(source.as_str()),
            SOURCE_TAG_COLUMN,
            merging.sql().trim(),
            source
        )
    }
}
