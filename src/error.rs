//! Engine error types / 搜索引擎错误类型

use thiserror::Error;

/// Errors raised by the search engine / 搜索引擎错误
#[derive(Debug, Error)]
pub enum SearchError {
    /// No dialect implementation exists (or it is reserved) for the database type / 不支持的数据库类型
    #[error("unsupported database type: {0}")]
    UnsupportedDatabase(String),

    /// A merging fragment does not produce the common result row shape / 合并片段列不匹配
    #[error("merging fragment of source '{source_name}' has columns [{found}], expected [{expected}]")]
    FragmentShapeMismatch {
        source_name: String,
        expected: String,
        found: String,
    },

    /// The composed statement failed at the database / 查询执行失败
    #[error("query execution failed on {database}: {source}")]
    ExecutionFailure {
        database: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("search source registered twice: {0}")]
    DuplicateSource(String),

    #[error("sub-query name used by more than one fragment: {0}")]
    DuplicateSubquery(String),

    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("invalid search source '{source_name}': {reason}")]
    InvalidSource { source_name: String, reason: String },

    #[error("search limit must be greater than zero")]
    InvalidLimit,

    #[error("statement references parameter :{0} but no value was bound")]
    UnboundParameter(String),

    #[error("no search sources registered")]
    NoSources,

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    pub(crate) fn invalid_source(source_name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSource {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }
}
