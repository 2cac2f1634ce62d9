// Syntax highlight memoization.
// Highlighting a fixed input never changes, so results are kept for a long TTL.

use std::convert::Infallible;

use crate::cache::{ExpiringStore, syntax_highlight_key, ttl};

/// Highlight `content` with `highlighter`, reusing a cached result for the same input.
pub async fn highlight_cached<H>(
    store: &ExpiringStore,
    language: &str,
    content: &str,
    highlighter: H,
) -> String
where
    H: FnOnce(&str) -> String,
{
    if content.is_empty() {
        return String::new();
    }

    let key = syntax_highlight_key(language, content);
    let result: Result<String, Infallible> = store
        .get_or_compute(
            &key,
            || async move { Ok(highlighter(content)) },
            ttl::LONG,
            false,
        )
        .await;

    match result {
        Ok(html) => html,
        Err(never) => match never {},
    }
}
