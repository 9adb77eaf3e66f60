//! Cache key normalization.

use axum::http::Method;
use url::form_urlencoded;

/// Build the cache signature for a request: method, path and the query
/// pairs sorted by key then value.
pub fn signature(method: &Method, path: &str, query: Option<&str>) -> String {
    let mut pairs: Vec<(String, String)> = query
        .map(|q| {
            form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default();

    if pairs.is_empty() {
        return format!("{} {}", method, path);
    }

    pairs.sort();
    let normalized = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{} {}?{}", method, path, normalized)
}
