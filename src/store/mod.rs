//! The triple-store as the server consumes it: one named graph per LDP
//! resource, addressed by a case-normalized key.

mod fuseki;
mod memory;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::StatusCode;

pub(crate) use self::fuseki::FusekiStore;
pub(crate) use self::memory::MemoryStore;

pub(crate) const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoreResponse {
    pub(crate) status: StatusCode,
    pub(crate) body: String,
}

impl StoreResponse {
    pub(crate) fn new(status: StatusCode, body: impl Into<String>) -> StoreResponse {
        StoreResponse {
            status,
            body: body.into(),
        }
    }
    pub(crate) fn status(status: StatusCode) -> StoreResponse {
        StoreResponse::new(status, String::new())
    }
}

#[async_trait]
pub(crate) trait Storage: Send + Sync {
    /// Fetches the graph named `uri` serialized as `accept`.
    async fn get(&self, uri: &str, accept: &str) -> Result<StoreResponse>;

    /// Replaces the graph named `uri` with `body`.
    async fn put(&self, uri: &str, body: &str, content_type: &str) -> Result<StatusCode>;

    /// Drops the graph named `uri`. A `404` status means nothing was removed.
    async fn remove(&self, uri: &str) -> Result<StoreResponse>;

    /// Provisionally claims `uri`. Fails when the graph already exists or
    /// another reservation won the race.
    async fn reserve_uri(&self, uri: &str) -> Result<()>;

    /// Gives a reserved but never populated `uri` back. Failures are logged,
    /// not reported.
    async fn release_uri(&self, uri: &str);

    /// Runs a SPARQL SELECT query across all named graphs.
    async fn query(&self, sparql: &str, accept: &str) -> Result<StoreResponse>;
}

/// Storage key for a resource IRI: lowercased, without a trailing slash, so
/// `…/c` and `…/c/` address the same graph.
pub(crate) fn canonical_key(uri: &str) -> String {
    let lowered = uri.to_lowercase();
    let trimmed = lowered.trim_end_matches('/');
    if trimmed.ends_with(':') || trimmed.ends_with(":/") || trimmed.is_empty() {
        return lowered;
    }
    trimmed.to_owned()
}

/// Whether two IRIs name the same stored resource.
pub(crate) fn same_resource(a: &str, b: &str) -> bool {
    canonical_key(a) == canonical_key(b)
}

#[cfg(test)]
mod tests {
    use super::{canonical_key, same_resource};

    #[test]
    fn keys_are_case_and_slash_insensitive() {
        assert_eq!(canonical_key("http://Example.org/R/Photos/"), "http://example.org/r/photos");
        assert_eq!(canonical_key("http://example.org/r/photos"), "http://example.org/r/photos");
        assert!(same_resource("http://example.org/r/", "http://EXAMPLE.org/r"));
        assert!(!same_resource("http://example.org/r/a", "http://example.org/r/ab"));
    }

    #[test]
    fn bare_authority_keeps_its_shape() {
        assert_eq!(canonical_key("urn:"), "urn:");
        assert_eq!(canonical_key("http://example.org"), "http://example.org");
    }
}
