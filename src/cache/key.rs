// Cache key construction.
// Builds colon-delimited namespaced keys and the well-known keys used by the editor shell.

use std::fmt::Display;

/// Delimiter between the namespace and each key part.
pub const KEY_DELIMITER: char = ':';

/// Content longer than this is fingerprinted by its head and tail only.
const FINGERPRINT_THRESHOLD: usize = 100;
const FINGERPRINT_EDGE: usize = 50;

/// Join a namespace and its ordered parts into a cache key.
///
/// The namespace is always followed by the delimiter, so `make_key("ns", [] as [&str; 0])`
/// yields `"ns:"`. Identical arguments always produce identical keys.
pub fn make_key<I>(namespace: &str, parts: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    let mut key = String::with_capacity(namespace.len() + 16);
    key.push_str(namespace);
    key.push(KEY_DELIMITER);

    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            key.push(KEY_DELIMITER);
        }
        key.push_str(&part.to_string());
    }

    key
}

/// Key for the persisted list of open editor tabs.
pub fn editor_tabs_key() -> String {
    make_key("editor", ["tabs", "v2"])
}

/// Key for the persisted file-explorer tree.
pub fn file_tree_key() -> String {
    make_key("file-explorer", ["tree", "v2"])
}

/// Key for memoized syntax-highlight output of `content` in `language`.
pub fn syntax_highlight_key(language: &str, content: &str) -> String {
    make_key(
        "syntax-highlight",
        [language.to_string(), content_fingerprint(content)],
    )
}

/// Short stand-in for editor content: its length plus its head and tail.
pub fn content_fingerprint(content: &str) -> String {
    let len = content.chars().count();

    if len <= FINGERPRINT_THRESHOLD {
        return format!("{}-{}", len, content);
    }

    let head: String = content.chars().take(FINGERPRINT_EDGE).collect();
    let tail: String = content.chars().skip(len - FINGERPRINT_EDGE).collect();
    format!("{}-{}{}", len, head, tail)
}
