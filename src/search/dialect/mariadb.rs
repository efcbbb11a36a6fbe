//! MariaDB dialect / MariaDB 方言
//!
//! Fulltext matching uses `MATCH (...) AGAINST (... IN BOOLEAN MODE)`, which
//! needs a FULLTEXT index over exactly the matched column list. That is why a
//! source gets one index per bucket plus a combined one.

use super::{DatabaseType, Dialect, NamedSubquery};
use crate::search::buckets::{ColumnNamesByBucket, INDEX_SUFFIXES, ALL_COLUMNS_SUFFIX};
use crate::search::composer::ALL_RESULTS_CTE;
use crate::search::engine::{LIMIT_PARAM, QUERY_PARAM};
use crate::search::schema::SearchResultTypeName;
use crate::search::tokenizer::{join_with_suffix, split_words, strip_reserved};

/// Boolean-mode operators; replaced by spaces during term preparation
const BOOLEAN_OPERATORS: [char; 10] = ['+', '-', '<', '>', '(', ')', '~', '*', '"', '@'];

/// Prefix-match marker appended to every word
const FUZZY_SUFFIX: &str = "*";

/// One `regexp_replace` step / 正则替换步骤
struct Replacement {
    pattern: String,
    replacement: &'static str,
}

impl Replacement {
    fn new(pattern: impl Into<String>, replacement: &'static str) -> Self {
        Self { pattern: pattern.into(), replacement }
    }
}

/// Tags, entities, punctuation, whitespace runs, in that order / 文本标准化步骤
fn normalize_steps() -> Vec<Replacement> {
    vec![
        Replacement::new(r"<[^>]*>", " "),
        Replacement::new(r"&[^\s;]+;", " "),
        Replacement::new(r"[^\w\s]", " "),
        Replacement::new(r"\s+", " "),
    ]
}

fn tag_alternation(tags: &[&str]) -> String {
    tags.iter()
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join("|")
}

/// Remove everything outside the named tags / 只保留指定标签内容
fn tag_contents_steps(tags: &[&str]) -> Vec<Replacement> {
    let alt = tag_alternation(tags);
    vec![Replacement::new(
        format!(r"(?is)(?:^|</(?:{alt})\s*>).*?(?:<(?:{alt})\b[^>]*>|$)"),
        " ",
    )]
}

/// Remove the named tags together with their contents / 删除指定标签及内容
fn excluding_tags_steps(tags: &[&str]) -> Vec<Replacement> {
    tags.iter()
        .map(|t| {
            let t = t.to_lowercase();
            Replacement::new(format!(r"(?is)<{t}\b[^>]*>.*?</{t}\s*>"), " ")
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MariaDbDialect;

impl MariaDbDialect {
    fn index_name(source: &SearchResultTypeName, suffix: &str) -> String {
        format!("idx_{}_{}", source, suffix)
    }

    fn create_index(&self, source: &SearchResultTypeName, suffix: &str, table: &str, columns: &[&str]) -> String {
        format!(
            "create fulltext index if not exists {} on {} ({})",
            Self::index_name(source, suffix),
            table,
            columns.join(", ")
        )
    }

    /// Wrap `expression` in one `regexp_replace` per step. `(*UCP)` makes `\w`
    /// and `\s` Unicode-aware in PCRE.
    fn render_steps(&self, expression: &str, steps: &[Replacement]) -> String {
        steps.iter().fold(expression.to_string(), |acc, step| {
            format!(
                "regexp_replace({}, {}, {})",
                acc,
                self.quote_literal(&format!("(*UCP){}", step.pattern)),
                self.quote_literal(step.replacement)
            )
        })
    }

    fn normalize(&self, expression: &str) -> String {
        format!("lower(trim({}))", self.render_steps(expression, &normalize_steps()))
    }
}

impl Dialect for MariaDbDialect {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MariaDb
    }

    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn create_fulltext_indexes(
        &self,
        source: &SearchResultTypeName,
        table: &str,
        buckets: &ColumnNamesByBucket,
    ) -> Vec<String> {
        let all = buckets.all_columns();
        if all.is_empty() {
            return Vec::new();
        }
        let mut statements = vec![self.create_index(source, ALL_COLUMNS_SUFFIX, table, &all)];
        for (bucket, columns) in buckets.non_empty() {
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
            statements.push(self.create_index(source, bucket.suffix(), table, &columns));
        }
        statements
    }

    fn drop_fulltext_indexes(&self, source: &SearchResultTypeName, table: &str) -> Vec<String> {
        INDEX_SUFFIXES
            .iter()
            .map(|suffix| format!("drop index if exists {} on {}", Self::index_name(source, suffix), table))
            .collect()
    }

    fn add_generated_column(&self, table: &str, column: &str, expression: &str) -> String {
        format!(
            "alter table {} add column if not exists {} longtext as ({}) stored",
            table, column, expression
        )
    }

    fn drop_generated_column(&self, table: &str, column: &str) -> String {
        format!("alter table {} drop column if exists {}", table, column)
    }

    fn extract_normalized_text(&self, expression: &str) -> String {
        self.normalize(expression)
    }

    fn extract_json_field(&self, expression: &str, key: &str) -> String {
        let path = format!("$.\"{}\"", key.replace('"', "\\\""));
        format!(
            "lower(json_unquote(json_extract({}, {})))",
            expression,
            self.quote_literal(&path)
        )
    }

    fn extract_html_tag_contents(&self, expression: &str, tags: &[&str]) -> String {
        if tags.is_empty() {
            return "''".to_string();
        }
        self.normalize(&self.render_steps(expression, &tag_contents_steps(tags)))
    }

    fn extract_html_excluding_tags(&self, expression: &str, tags: &[&str]) -> String {
        self.normalize(&self.render_steps(expression, &excluding_tags_steps(tags)))
    }

    fn prepare_search_term(&self, raw: &str) -> String {
        let words: Vec<String> = split_words(raw)
            .iter()
            .flat_map(|w| strip_reserved(w, &BOOLEAN_OPERATORS))
            .collect();
        join_with_suffix(&words, FUZZY_SUFFIX)
    }

    fn fulltext_match(&self, columns: &[&str], parameter: &str) -> String {
        format!(
            "match ({}) against ({} in boolean mode)",
            columns.join(", "),
            self.parameter(parameter)
        )
    }

    fn json_object(&self, pairs: &[(&str, &str)]) -> String {
        if pairs.is_empty() {
            return "null".to_string();
        }
        let args: Vec<String> = pairs
            .iter()
            .map(|(key, value)| format!("{}, {}", self.quote_literal(key), value))
            .collect();
        format!("json_object({})", args.join(", "))
    }

    fn compose_query(&self, searching: &[NamedSubquery], merging: &[String]) -> String {
        let mut ctes: Vec<String> = searching
            .iter()
            .map(|q| format!("{} as (\n{}\n)", q.name, q.sql.trim()))
            .collect();
        let union = merging
            .iter()
            .map(|m| m.trim().to_string())
            .collect::<Vec<_>>()
            .join("\nunion\n");
        ctes.push(format!("{} as (\n{}\n)", ALL_RESULTS_CTE, union));

        format!(
            "with\n{ctes}\nselect\n    result_id,\n    result_type,\n    max(result_title) as result_title,\n    sum(score) as score,\n    max(metadata) as metadata\nfrom {all}\nwhere {query} <> ''\ngroup by result_id, result_type\norder by score desc, result_id asc, result_type asc\nlimit {limit}",
            ctes = ctes.join(",\n"),
            all = ALL_RESULTS_CTE,
            query = self.parameter(QUERY_PARAM),
            limit = self.parameter(LIMIT_PARAM),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::buckets::Bucket;
    use regex::Regex;

    /// Evaluate the same replacement chain in Rust; MariaDB's PCRE and the
    /// `regex` crate agree on these patterns.
    fn apply(text: &str, steps: &[Replacement]) -> String {
        steps.iter().fold(text.to_string(), |acc, step| {
            Regex::new(&step.pattern)
                .unwrap()
                .replace_all(&acc, step.replacement)
                .into_owned()
        })
    }

    fn normalize_in_rust(text: &str) -> String {
        apply(text, &normalize_steps()).trim().to_lowercase()
    }

    fn articles() -> SearchResultTypeName {
        SearchResultTypeName::new("articles").unwrap()
    }

    #[test]
    fn test_prepare_search_term() {
        let d = MariaDbDialect;
        assert_eq!(d.prepare_search_term("hello world"), "hello* world*");
        assert_eq!(d.prepare_search_term(""), "");
        assert_eq!(d.prepare_search_term("  Foo  Bar"), "foo* bar*");
        assert_eq!(d.prepare_search_term("launch"), "launch*");
    }

    #[test]
    fn test_prepare_search_term_strips_operators() {
        let d = MariaDbDialect;
        assert_eq!(d.prepare_search_term("+rust -java"), "rust* java*");
        assert_eq!(d.prepare_search_term("\"quoted\" (x)"), "quoted* x*");
        assert_eq!(d.prepare_search_term("*** @"), "");
    }

    #[test]
    fn test_create_indexes_one_per_non_empty_bucket() {
        let buckets = ColumnNamesByBucket::new()
            .with(Bucket::Critical, "title")
            .with(Bucket::Minor, "body");
        let ddl = MariaDbDialect.create_fulltext_indexes(&articles(), "articles", &buckets);
        assert_eq!(
            ddl,
            vec![
                "create fulltext index if not exists idx_articles_all on articles (title, body)",
                "create fulltext index if not exists idx_articles_critical on articles (title)",
                "create fulltext index if not exists idx_articles_minor on articles (body)",
            ]
        );
    }

    #[test]
    fn test_create_indexes_empty_buckets_emit_nothing() {
        let ddl = MariaDbDialect.create_fulltext_indexes(&articles(), "articles", &ColumnNamesByBucket::new());
        assert!(ddl.is_empty());
    }

    #[test]
    fn test_drop_indexes_always_five() {
        let ddl = MariaDbDialect.drop_fulltext_indexes(&articles(), "articles");
        assert_eq!(ddl.len(), 5);
        assert_eq!(ddl[0], "drop index if exists idx_articles_all on articles");
        assert_eq!(ddl[4], "drop index if exists idx_articles_minor on articles");
        assert!(ddl.iter().all(|s| s.starts_with("drop index if exists")));
    }

    #[test]
    fn test_quote_literal_escapes() {
        let d = MariaDbDialect;
        assert_eq!(d.quote_literal("it's"), "'it''s'");
        assert_eq!(d.quote_literal(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn test_normalized_text_sql_shape() {
        let sql = MariaDbDialect.extract_normalized_text("body");
        assert!(sql.starts_with("lower(trim(regexp_replace(regexp_replace(regexp_replace(regexp_replace(body, "));
        assert!(sql.contains(r"'(*UCP)<[^>]*>'"));
        // backslashes are doubled inside the literal
        assert!(sql.contains(r"'(*UCP)\\s+'"));
    }

    #[test]
    fn test_normalize_pipeline_semantics() {
        assert_eq!(
            normalize_in_rust("<p>Hello&nbsp;<b>World</b>!!  Foo,bar</p>"),
            "hello world foo bar"
        );
    }

    #[test]
    fn test_excluding_tags_drops_content() {
        let text = apply("<script>x</script>keep", &excluding_tags_steps(&["script"]));
        let normalized = normalize_in_rust(&text);
        assert!(normalized.contains("keep"));
        assert!(!normalized.contains('x'));

        let sql = MariaDbDialect.extract_html_excluding_tags("body", &["script"]);
        assert!(sql.contains("script"));
        assert!(sql.starts_with("lower(trim("));
    }

    #[test]
    fn test_tag_contents_keeps_only_inner_text() {
        let html = "intro<h1 class=\"t\">Main Title</h1>between<H2>Sub</H2>tail";
        let text = normalize_in_rust(&apply(html, &tag_contents_steps(&["h1", "h2"])));
        assert_eq!(text, "main title sub");
        assert_eq!(MariaDbDialect.extract_html_tag_contents("body", &[]), "''");
    }

    #[test]
    fn test_json_field() {
        let sql = MariaDbDialect.extract_json_field("properties", "title");
        assert_eq!(sql, "lower(json_unquote(json_extract(properties, '$.\"title\"')))");
    }

    #[test]
    fn test_fulltext_match_and_json_object() {
        let d = MariaDbDialect;
        assert_eq!(
            d.fulltext_match(&["title", "body"], "query"),
            "match (title, body) against (:query in boolean mode)"
        );
        assert_eq!(d.json_object(&[]), "null");
        assert_eq!(d.json_object(&[("lang", "language")]), "json_object('lang', language)");
    }

    #[test]
    fn test_generated_column_ddl() {
        let d = MariaDbDialect;
        assert_eq!(
            d.add_generated_column("pages", "search_body", "lower(body)"),
            "alter table pages add column if not exists search_body longtext as (lower(body)) stored"
        );
        assert_eq!(
            d.drop_generated_column("pages", "search_body"),
            "alter table pages drop column if exists search_body"
        );
    }

    #[test]
    fn test_compose_query_shape() {
        let searching = vec![
            NamedSubquery::new("articles_hits", "select 1").unwrap(),
            NamedSubquery::new("pages_hits", "select 2").unwrap(),
        ];
        let merging = vec![
            "select a from articles_hits".to_string(),
            "select b from pages_hits".to_string(),
        ];
        let sql = MariaDbDialect.compose_query(&searching, &merging);
        assert!(sql.starts_with("with\narticles_hits as (\nselect 1\n),\npages_hits as (\nselect 2\n),\nall_results as ("));
        assert!(sql.contains("select a from articles_hits\nunion\nselect b from pages_hits"));
        assert!(!sql.contains("union all"));
        assert!(sql.contains("sum(score) as score"));
        assert!(sql.contains("where :query <> ''"));
        assert!(sql.contains("group by result_id, result_type"));
        assert!(sql.contains("order by score desc, result_id asc"));
        assert!(sql.ends_with("limit :limit"));
    }
}
