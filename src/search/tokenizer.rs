//! Search term tokenizer / 搜索词分词
//!
//! Dialect-independent half of term preparation: trimming, lowercasing and
//! splitting on single spaces. Dialects add their own operator handling and
//! fuzzy suffix on top.

/// Split a raw term into lowercase words / 对搜索词进行分词
///
/// Splits on single spaces, so runs of spaces produce empty pieces which are
/// dropped here.
pub fn split_words(text: &str) -> Vec<String> {
    text.trim()
        .to_lowercase()
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replace reserved operator characters with spaces and re-split / 去除保留运算符
///
/// `"+rust"` becomes `["rust"]`, `"e-mail"` becomes `["e", "mail"]`, and a word
/// made only of operators disappears.
pub fn strip_reserved(word: &str, reserved: &[char]) -> Vec<String> {
    word.chars()
        .map(|c| if reserved.contains(&c) || c.is_whitespace() { ' ' } else { c })
        .collect::<String>()
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Append `suffix` to every word and join with single spaces / 追加模糊后缀
pub fn join_with_suffix(words: &[String], suffix: &str) -> String {
    words
        .iter()
        .map(|w| format!("{}{}", w, suffix))
        .collect::<Vec<_>>()
        .join(" ")
}
