use axum::http::HeaderValue;
use sha2::{Digest, Sha256};

/// Weak entity tag over a representation body.
pub(crate) fn entity_tag(body: &str) -> String {
    format!("W/\"{:x}\"", Sha256::digest(body.as_bytes()))
}

/// Whether an `If-Match`/`If-None-Match` value names `tag`. Accepts `*` and
/// comma-separated lists, and compares weakly.
pub(crate) fn tag_matches(header: &HeaderValue, tag: &str) -> bool {
    let Ok(header) = header.to_str() else {
        return false;
    };
    let tag = opaque(tag);
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || (!candidate.is_empty() && opaque(candidate) == tag)
    })
}

fn opaque(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}
