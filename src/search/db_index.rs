//! Fulltext index lifecycle / 全文索引生命周期
//!
//! Provisioning is a separate, explicitly invoked operation; searching never
//! touches the schema. Creation skips empty buckets, teardown always attempts
//! all five conventional index names so migrations stay idempotent even when
//! bucket membership changed between deployments.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use super::dialect::Dialect;
use super::executor::SqlExecutor;
use super::source::{SearchSource, SourceRegistry};

/// Statements issued by one lifecycle run / 索引操作统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub sources: usize,
    pub statements: Vec<String>,
}

/// Index manager for one executor / 索引管理
pub struct DbIndex<'a, E: SqlExecutor> {
    executor: &'a E,
    dialect: &'a dyn Dialect,
}

impl<'a, E: SqlExecutor> DbIndex<'a, E> {
    pub fn new(executor: &'a E, dialect: &'a dyn Dialect) -> Self {
        Self { executor, dialect }
    }

    /// DDL creating generated columns and indexes for one source / 创建语句
    pub fn provision_statements(&self, source: &dyn SearchSource) -> Vec<String> {
        let Some(target) = source.index_target() else {
            return Vec::new();
        };
        let mut statements: Vec<String> = target
            .generated_columns
            .iter()
            .map(|col| {
                let expression = col.extraction.render(self.dialect, &col.source);
                self.dialect.add_generated_column(target.table, &col.name, &expression)
            })
            .collect();
        statements.extend(
            self.dialect
                .create_fulltext_indexes(source.type_name(), target.table, target.buckets),
        );
        statements
    }

    /// DDL removing indexes, then generated columns, for one source / 删除语句
    pub fn teardown_statements(&self, source: &dyn SearchSource) -> Vec<String> {
        let Some(target) = source.index_target() else {
            return Vec::new();
        };
        let mut statements = self
            .dialect
            .drop_fulltext_indexes(source.type_name(), target.table);
        statements.extend(
            target
                .generated_columns
                .iter()
                .map(|col| self.dialect.drop_generated_column(target.table, &col.name)),
        );
        statements
    }

    /// Create every registered source's indexes / 创建全部索引
    pub async fn provision(&self, registry: &SourceRegistry) -> Result<IndexReport> {
        let mut report = IndexReport::default();
        for source in registry.iter() {
            let statements = self.provision_statements(source);
            self.run(&statements).await?;
            tracing::info!("Fulltext indexes created for {} ({} statements)", source.type_name(), statements.len());
            report.sources += 1;
            report.statements.extend(statements);
        }
        Ok(report)
    }

    /// Drop every registered source's indexes / 删除全部索引
    pub async fn teardown(&self, registry: &SourceRegistry) -> Result<IndexReport> {
        let mut report = IndexReport::default();
        for source in registry.iter() {
            let statements = self.teardown_statements(source);
            self.run(&statements).await?;
            tracing::info!("Fulltext indexes dropped for {}", source.type_name());
            report.sources += 1;
            report.statements.extend(statements);
        }
        Ok(report)
    }

    async fn run(&self, statements: &[String]) -> Result<()> {
        for sql in statements {
            tracing::debug!("DDL: {}", sql);
            self.executor.execute(sql).await?;
        }
        Ok(())
    }
}
