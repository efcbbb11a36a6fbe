//! Text-search language resolution / 全文检索语言解析
//!
//! Resolution never swallows a failure: an unknown or missing hint yields an
//! explicit `Fallback` carrying the reason, which callers can log or assert on.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No hint supplied / 未提供语言
    Missing,
    /// Hint not in the configured language list / 不支持的语言
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LanguageResolution {
    Resolved { language: String },
    Fallback { language: String, reason: FallbackReason },
}

impl LanguageResolution {
    pub fn language(&self) -> &str {
        match self {
            Self::Resolved { language } | Self::Fallback { language, .. } => language,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Resolve a language hint against the supported list / 解析语言提示
///
/// Matching is case-insensitive and accepts region-qualified hints
/// (`de-CH` resolves to `de` when only `de` is supported).
pub fn resolve_language(hint: Option<&str>, supported: &[String], default: &str) -> LanguageResolution {
    let fallback = |reason| LanguageResolution::Fallback {
        language: default.to_string(),
        reason,
    };

    let hint = match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(h) => h.to_lowercase(),
        None => return fallback(FallbackReason::Missing),
    };

    let primary = hint.split(['-', '_']).next().unwrap_or(&hint).to_string();
    for candidate in [&hint, &primary] {
        if let Some(found) = supported.iter().find(|s| s.eq_ignore_ascii_case(candidate)) {
            return LanguageResolution::Resolved { language: found.clone() };
        }
    }

    fallback(FallbackReason::Unsupported(hint))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supported() -> Vec<String> {
        vec!["en".to_string(), "de".to_string()]
    }

    #[test]
    fn test_exact_and_region_hints_resolve() {
        assert_eq!(
            resolve_language(Some("DE"), &supported(), "en"),
            LanguageResolution::Resolved { language: "de".to_string() }
        );
        assert_eq!(resolve_language(Some("de-CH"), &supported(), "en").language(), "de");
        assert!(!resolve_language(Some("en_US"), &supported(), "en").is_fallback());
    }

    #[test]
    fn test_missing_hint_falls_back() {
        let res = resolve_language(None, &supported(), "en");
        assert_eq!(
            res,
            LanguageResolution::Fallback {
                language: "en".to_string(),
                reason: FallbackReason::Missing,
            }
        );
        assert!(resolve_language(Some("  "), &supported(), "en").is_fallback());
    }

    #[test]
    fn test_unsupported_hint_reports_reason() {
        match resolve_language(Some("fr"), &supported(), "en") {
            LanguageResolution::Fallback { language, reason } => {
                assert_eq!(language, "en");
                assert_eq!(reason, FallbackReason::Unsupported("fr".to_string()));
            }
            other => panic!("expected fallback, got {:?}", other),
        }
    }
}
