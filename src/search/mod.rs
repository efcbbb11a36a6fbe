//! Search module - federated fulltext search over relational tables / 搜索模块
//!
//! Architecture principles / 架构原则：
//! - Search module only exposes primitive operations: search, provision, teardown
//! - Each source contributes SQL fragments; the composer stitches them into one statement
//! - Call direction: Core → Search (unidirectional) / 调用方向
//!
//! Index features / 索引特性：
//! - Weighted buckets (critical / major / normal / minor) per source
//! - Scores of the same document across sources are summed
//! - MariaDB implemented; PostgreSQL reserved

pub mod buckets;
pub mod composer;
pub mod db_index;
pub mod dialect;
pub mod engine;
pub mod executor;
pub mod language;
pub mod params;
pub mod schema;
pub mod source;
pub mod table_source;
pub mod tokenizer;

pub use buckets::{Bucket, BucketWeights, ColumnNamesByBucket};
pub use composer::{ComposedQuery, QueryComposer};
pub use db_index::{DbIndex, IndexReport};
pub use dialect::{DatabaseType, Dialect, MariaDbDialect, TextExtraction};
pub use engine::{LanguageSettings, SearchEngine};
pub use executor::{MySqlExecutor, ResultRow, SqlExecutor};
pub use params::{BoundStatement, SqlValue};
pub use schema::{apply_min_score, SearchRequest, SearchResult, SearchResultFrontend, SearchResultTypeName};
pub use source::{FragmentPair, MergingFragment, SearchSource, SourceRegistry};
pub use table_source::{TableSource, TableSourceConfig};
