use axum::http::Uri;

use crate::config::ServerConfig;

/// The IRI a request addresses: the public origin plus the request path.
/// Query and fragment are not part of a resource's name.
pub(crate) fn request_iri(config: &ServerConfig, uri: &Uri) -> String {
    format!("{}{}", config.app_base.trim_end_matches('/'), uri.path())
}

/// Appends one path segment to `base`. The segment keeps only word
/// characters, whitespace and `-`, and is then percent-encoded. `None` when
/// nothing is left of it.
pub(crate) fn add_path(base: &str, segment: &str) -> Option<String> {
    let cleaned: String = segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    if cleaned.trim().is_empty() {
        return None;
    }
    let base = base.split(['?', '#']).next().unwrap_or(base);
    let mut iri = base.to_string();
    if !iri.ends_with('/') {
        iri.push('/');
    }
    for byte in cleaned.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            iri.push(char::from(byte));
        } else {
            iri.push_str(&format!("%{byte:02X}"));
        }
    }
    Some(iri)
}

/// The container a resource sits in: the IRI with its last path segment
/// cut off. `None` at the origin.
pub(crate) fn parent_of(iri: &str) -> Option<String> {
    let trimmed = iri.trim_end_matches('/');
    let path_start = trimmed.find("://").map_or(0, |i| i + 3);
    let (parent, _) = trimmed[path_start..].rsplit_once('/')?;
    Some(format!("{}{parent}", &trimmed[..path_start]))
}
