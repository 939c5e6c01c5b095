use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;
use tracing::debug;

use super::{Storage, StoreResponse, canonical_key};
use crate::rdf::{RdfFormat, Triple};

/// A process-local store for development and tests. Graphs are kept parsed
/// and re-serialized in whatever format a reader asks for. It does not
/// evaluate SPARQL: every query is answered with the list of stored graphs.
#[derive(Default)]
pub(crate) struct MemoryStore {
    graphs: Mutex<BTreeMap<String, Graph>>,
    #[cfg(test)]
    queries: Mutex<Vec<String>>,
}

struct Graph {
    uri: String,
    triples: Vec<Triple>,
}

impl MemoryStore {
    pub(crate) fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn graphs(&self) -> Result<MutexGuard<'_, BTreeMap<String, Graph>>> {
        self.graphs
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    #[cfg(test)]
    pub(crate) fn triples(&self, uri: &str) -> Option<Vec<Triple>> {
        let graphs = self.graphs.lock().ok()?;
        graphs.get(&canonical_key(uri)).map(|g| g.triples.clone())
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, uri: &str) -> bool {
        self.triples(uri).is_some()
    }

    #[cfg(test)]
    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn get(&self, uri: &str, accept: &str) -> Result<StoreResponse> {
        let graphs = self.graphs()?;
        let Some(graph) = graphs.get(&canonical_key(uri)) else {
            return Ok(StoreResponse::status(StatusCode::NOT_FOUND));
        };
        let format = RdfFormat::from_media_type(accept).unwrap_or(RdfFormat::Turtle);
        let (_, body) = format.serialize(&graph.triples)?;
        Ok(StoreResponse::new(StatusCode::OK, body))
    }

    async fn put(&self, uri: &str, body: &str, content_type: &str) -> Result<StatusCode> {
        let format = RdfFormat::from_media_type(content_type)
            .with_context(|| format!("unsupported content type {content_type}"))?;
        let triples = format.parse(body, uri)?;
        let mut graphs = self.graphs()?;
        // Named graphs exist only while they hold triples.
        if triples.is_empty() {
            graphs.remove(&canonical_key(uri));
            return Ok(StatusCode::NO_CONTENT);
        }
        let created = graphs
            .insert(
                canonical_key(uri),
                Graph {
                    uri: uri.to_owned(),
                    triples,
                },
            )
            .is_none();
        Ok(if created {
            StatusCode::CREATED
        } else {
            StatusCode::NO_CONTENT
        })
    }

    async fn remove(&self, uri: &str) -> Result<StoreResponse> {
        let mut graphs = self.graphs()?;
        Ok(match graphs.remove(&canonical_key(uri)) {
            Some(_) => StoreResponse::status(StatusCode::NO_CONTENT),
            None => StoreResponse::status(StatusCode::NOT_FOUND),
        })
    }

    async fn reserve_uri(&self, uri: &str) -> Result<()> {
        let mut graphs = self.graphs()?;
        let key = canonical_key(uri);
        if graphs.contains_key(&key) {
            bail!("{uri} is already taken");
        }
        graphs.insert(
            key,
            Graph {
                uri: uri.to_owned(),
                triples: vec![],
            },
        );
        Ok(())
    }

    async fn release_uri(&self, uri: &str) {
        if let Ok(mut graphs) = self.graphs() {
            graphs.remove(&canonical_key(uri));
        }
    }

    async fn query(&self, sparql: &str, _accept: &str) -> Result<StoreResponse> {
        debug!(target: "store", %sparql, "query");
        #[cfg(test)]
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(sparql.to_owned());
        }
        let graphs = self.graphs()?;
        let bindings: Vec<_> = graphs
            .values()
            .map(|graph| json!({ "g": { "type": "uri", "value": graph.uri } }))
            .collect();
        let results = json!({
            "head": { "vars": ["g"] },
            "results": { "bindings": bindings }
        });
        Ok(StoreResponse::new(StatusCode::OK, results.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use axum::http::StatusCode;

    use super::MemoryStore;
    use crate::store::Storage;

    #[tokio::test]
    async fn reservation_is_exclusive_until_released() -> Result<()> {
        let store = MemoryStore::new();
        store.reserve_uri("http://example.org/r/a").await?;
        assert!(store.reserve_uri("http://example.org/R/A/").await.is_err());
        store.release_uri("http://example.org/r/a").await;
        store.reserve_uri("http://example.org/r/a").await?;
        Ok(())
    }

    #[tokio::test]
    async fn get_transcodes_to_requested_format() -> Result<()> {
        let store = MemoryStore::new();
        store
            .put(
                "http://example.org/r/a",
                "<> <http://example.org/p> \"v\" .",
                "text/turtle",
            )
            .await?;
        let response = store.get("http://example.org/r/a", "application/ld+json").await?;
        assert_eq!(response.status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&response.body)?;
        assert_eq!(value[0]["@id"], "http://example.org/r/a");
        assert_eq!(value[0]["http://example.org/p"][0]["@value"], "v");
        Ok(())
    }

    #[tokio::test]
    async fn empty_graphs_are_not_kept() -> Result<()> {
        let store = MemoryStore::new();
        store.reserve_uri("http://example.org/r/a").await?;
        store.put("http://example.org/r/a", "", "text/turtle").await?;
        assert!(!store.contains("http://example.org/r/a"));
        assert_eq!(
            store.get("http://example.org/r/a", "text/turtle").await?.status,
            StatusCode::NOT_FOUND
        );
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_reservations_have_one_winner() -> Result<()> {
        let store = MemoryStore::new();
        let (first, second) = tokio::join!(
            store.reserve_uri("http://example.org/r/c/foo"),
            store.reserve_uri("http://example.org/r/c/foo"),
        );
        assert!(first.is_ok() != second.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn remove_reports_missing_graphs() -> Result<()> {
        let store = MemoryStore::new();
        store
            .put("http://example.org/r/a", "<> a <http://example.org/A> .", "text/turtle")
            .await?;
        assert_eq!(
            store.remove("http://example.org/r/a").await?.status,
            StatusCode::NO_CONTENT
        );
        assert_eq!(
            store.remove("http://example.org/r/a").await?.status,
            StatusCode::NOT_FOUND
        );
        Ok(())
    }
}
