//! Column weighting model / 列权重分桶
//!
//! A source's searchable text columns are split into four weight tiers. Every
//! non-empty tier gets its own fulltext index (so it can be scored separately)
//! and all columns together get one combined index used as the match predicate.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Result, SearchError};
use super::dialect::ensure_identifier;

/// Weight tier, ordered from most to least important / 权重等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Critical,
    Major,
    Normal,
    Minor,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [Bucket::Critical, Bucket::Major, Bucket::Normal, Bucket::Minor];

    /// Index name suffix / 索引名后缀
    pub fn suffix(self) -> &'static str {
        match self {
            Bucket::Critical => "critical",
            Bucket::Major => "major",
            Bucket::Normal => "normal",
            Bucket::Minor => "minor",
        }
    }
}

/// Suffix of the combined index over every bucketed column
pub const ALL_COLUMNS_SUFFIX: &str = "all";

/// Every index suffix a source may own; teardown drops all of them.
pub const INDEX_SUFFIXES: [&str; 5] = [
    ALL_COLUMNS_SUFFIX,
    "critical",
    "major",
    "normal",
    "minor",
];

/// Searchable columns partitioned by weight / 按权重分组的列名
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNamesByBucket {
    #[serde(default)]
    pub critical: Vec<String>,
    #[serde(default)]
    pub major: Vec<String>,
    #[serde(default)]
    pub normal: Vec<String>,
    #[serde(default)]
    pub minor: Vec<String>,
}

impl ColumnNamesByBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, bucket: Bucket, column: impl Into<String>) -> Self {
        self.columns_mut(bucket).push(column.into());
        self
    }

    pub fn columns(&self, bucket: Bucket) -> &[String] {
        match bucket {
            Bucket::Critical => &self.critical,
            Bucket::Major => &self.major,
            Bucket::Normal => &self.normal,
            Bucket::Minor => &self.minor,
        }
    }

    fn columns_mut(&mut self, bucket: Bucket) -> &mut Vec<String> {
        match bucket {
            Bucket::Critical => &mut self.critical,
            Bucket::Major => &mut self.major,
            Bucket::Normal => &mut self.normal,
            Bucket::Minor => &mut self.minor,
        }
    }

    /// Non-empty buckets in weight order / 非空分桶
    pub fn non_empty(&self) -> impl Iterator<Item = (Bucket, &[String])> + '_ {
        Bucket::ALL
            .into_iter()
            .map(move |b| (b, self.columns(b)))
            .filter(|(_, cols)| !cols.is_empty())
    }

    /// Union of all buckets, in weight order / 全部列
    pub fn all_columns(&self) -> Vec<&str> {
        Bucket::ALL
            .iter()
            .flat_map(|b| self.columns(*b).iter().map(String::as_str))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.non_empty().next().is_none()
    }

    /// Check identifiers and that no column sits in two buckets / 校验列名
    pub fn validate(&self, source_name: &str) -> Result<()> {
        if self.is_empty() {
            return Err(SearchError::invalid_source(source_name, "no searchable columns"));
        }
        let mut seen = HashSet::new();
        for column in self.all_columns() {
            ensure_identifier(column)?;
            if !seen.insert(column.to_lowercase()) {
                return Err(SearchError::invalid_source(
                    source_name,
                    format!("column '{}' appears in more than one bucket", column),
                ));
            }
        }
        Ok(())
    }
}

/// Score multiplier per bucket / 分桶权重
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketWeights {
    #[serde(default = "default_critical")]
    pub critical: f64,
    #[serde(default = "default_major")]
    pub major: f64,
    #[serde(default = "default_normal")]
    pub normal: f64,
    #[serde(default = "default_minor")]
    pub minor: f64,
}

fn default_critical() -> f64 { 20.0 }
fn default_major() -> f64 { 5.0 }
fn default_normal() -> f64 { 1.0 }
fn default_minor() -> f64 { 0.5 }

impl Default for BucketWeights {
    fn default() -> Self {
        Self {
            critical: default_critical(),
            major: default_major(),
            normal: default_normal(),
            minor: default_minor(),
        }
    }
}

impl BucketWeights {
    pub fn weight(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::Critical => self.critical,
            Bucket::Major => self.major,
            Bucket::Normal => self.normal,
            Bucket::Minor => self.minor,
        }
    }
}
