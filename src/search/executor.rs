//! SQL execution seam / SQL执行接口
//!
//! The engine never talks to a driver directly; infrastructure hands it a
//! `SqlExecutor` and gets result rows back.

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;

use crate::error::{Result, SearchError};
use super::dialect::DatabaseType;
use super::params::{BoundStatement, SqlValue};

/// Raw row of the composed query / 查询结果行
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub result_id: String,
    pub result_type: String,
    pub result_title: Option<String>,
    pub score: f64,
    /// JSON text as returned by the database
    pub metadata: Option<String>,
}

#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Database this executor talks to (used in error context)
    fn database_type(&self) -> DatabaseType;

    /// Run the composed statement once and return its rows
    async fn fetch_results(&self, statement: &BoundStatement) -> Result<Vec<ResultRow>>;

    /// Run a DDL statement / 执行DDL
    async fn execute(&self, sql: &str) -> Result<u64>;
}

/// MariaDB executor over a sqlx pool / MariaDB 执行器
#[derive(Clone)]
pub struct MySqlExecutor {
    pool: MySqlPool,
}

impl MySqlExecutor {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| execution_error(DatabaseType::MariaDb, e))?;
        tracing::info!("Search database connected (max {} connections)", max_connections);
        Ok(Self { pool })
    }

    /// Pool that opens connections on first use / 延迟连接
    pub fn connect_lazy(url: &str, max_connections: u32) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(url)
            .map_err(|e| execution_error(DatabaseType::MariaDb, e))?;
        Ok(Self { pool })
    }

    /// 关闭数据库连接池 / Close database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn execution_error(database: DatabaseType, source: sqlx::Error) -> SearchError {
    SearchError::ExecutionFailure {
        database: database.name().to_string(),
        source,
    }
}

fn map_row(row: &MySqlRow) -> std::result::Result<ResultRow, sqlx::Error> {
    Ok(ResultRow {
        result_id: row.try_get("result_id")?,
        result_type: row.try_get("result_type")?,
        result_title: row.try_get("result_title")?,
        score: row.try_get::<Option<f64>, _>("score")?.unwrap_or(0.0),
        metadata: row.try_get("metadata")?,
    })
}

#[async_trait]
impl SqlExecutor for MySqlExecutor {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MariaDb
    }

    async fn fetch_results(&self, statement: &BoundStatement) -> Result<Vec<ResultRow>> {
        let mut query = sqlx::query(&statement.sql);
        for value in &statement.values {
            query = match value {
                SqlValue::Text(s) => query.bind(s.as_str()),
                SqlValue::Int(i) => query.bind(*i),
            };
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| execution_error(self.database_type(), e))?;

        rows.iter()
            .map(map_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| execution_error(self.database_type(), e))
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| execution_error(self.database_type(), e))?;
        Ok(result.rows_affected())
    }
}
