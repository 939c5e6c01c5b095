use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{SPARQL_RESULTS_JSON, Storage, StoreResponse, canonical_key};
use crate::config::StoreConfig;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
const RESERVATION: &str = "urn:x-ldp-fuseki:reservation";

/// Client for an Apache Jena Fuseki dataset speaking the SPARQL 1.1 Graph
/// Store Protocol, Query and Update endpoints.
pub(crate) struct FusekiStore {
    client: Client,
    endpoint: String,
    credentials: Option<(String, SecretString)>,
}

#[derive(Deserialize)]
struct AskResult {
    boolean: bool,
}

impl FusekiStore {
    pub(crate) fn new(config: StoreConfig) -> Result<FusekiStore> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .gzip(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("unable to build store client")?;
        let mut endpoint = config.endpoint;
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let credentials = config.username.zip(config.password);
        Ok(FusekiStore {
            client,
            endpoint,
            credentials,
        })
    }

    fn graph_url(&self, uri: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}data", self.endpoint))?;
        url.query_pairs_mut().append_pair("graph", &canonical_key(uri));
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.credentials {
            Some((username, password)) => builder.basic_auth(username, Some(password.expose_secret())),
            None => builder,
        }
    }

    async fn update(&self, sparql: String) -> Result<()> {
        debug!(target: "store", %sparql, "update");
        let url = Url::parse(&format!("{}update", self.endpoint))?;
        let response = self
            .request(Method::POST, url)
            .header(CONTENT_TYPE, "application/sparql-update")
            .body(sparql)
            .send()
            .await?;
        if response.error_for_status_ref().is_err() {
            let code = response.status();
            let text = response.text().await?;
            bail!("update failed with error {code} {text}");
        }
        Ok(())
    }

    async fn ask(&self, sparql: String) -> Result<bool> {
        let response = self.query(&sparql, SPARQL_RESULTS_JSON).await?;
        if !response.status.is_success() {
            bail!("ask failed with error {}", response.status);
        }
        let result: AskResult = serde_json::from_str(&response.body)?;
        Ok(result.boolean)
    }
}

#[async_trait]
impl Storage for FusekiStore {
    async fn get(&self, uri: &str, accept: &str) -> Result<StoreResponse> {
        let response = self
            .request(Method::GET, self.graph_url(uri)?)
            .header(ACCEPT, accept)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(StoreResponse::new(status, body))
    }

    async fn put(&self, uri: &str, body: &str, content_type: &str) -> Result<StatusCode> {
        let response = self
            .request(Method::PUT, self.graph_url(uri)?)
            .header(CONTENT_TYPE, content_type)
            .body(body.to_owned())
            .send()
            .await?;
        if response.error_for_status_ref().is_err() {
            let code = response.status();
            let text = response.text().await?;
            bail!("storing {uri} failed with error {code} {text}");
        }
        Ok(response.status())
    }

    async fn remove(&self, uri: &str) -> Result<StoreResponse> {
        let response = self
            .request(Method::DELETE, self.graph_url(uri)?)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::NOT_FOUND && !status.is_success() {
            bail!("removing {uri} failed with error {status} {body}");
        }
        Ok(StoreResponse::new(status, body))
    }

    async fn reserve_uri(&self, uri: &str) -> Result<()> {
        let key = canonical_key(uri);
        if key.chars().any(|c| c.is_whitespace() || "<>\"{}|^`\\".contains(c)) {
            bail!("{uri} cannot be used as a graph name");
        }
        // Only the first writer into an empty graph lands its token; the ask
        // tells us whether that was us.
        let token = uuid::Uuid::now_v7().simple().to_string();
        self.update(format!(
            "INSERT {{ GRAPH <{key}> {{ <{key}> <{RESERVATION}> \"{token}\" }} }} \
             WHERE {{ FILTER NOT EXISTS {{ GRAPH <{key}> {{ ?s ?p ?o }} }} }}"
        ))
        .await?;
        let won = self
            .ask(format!(
                "ASK {{ GRAPH <{key}> {{ <{key}> <{RESERVATION}> \"{token}\" }} }}"
            ))
            .await?;
        if !won {
            bail!("{uri} is already taken");
        }
        Ok(())
    }

    async fn release_uri(&self, uri: &str) {
        let result = match self.graph_url(uri) {
            Ok(url) => self
                .request(Method::DELETE, url)
                .send()
                .await
                .map(|_| ())
                .map_err(anyhow::Error::from),
            Err(error) => Err(error),
        };
        if let Err(error) = result {
            warn!(target: "store", %error, uri, "unable to release reserved uri");
        }
    }

    async fn query(&self, sparql: &str, accept: &str) -> Result<StoreResponse> {
        debug!(target: "store", %sparql, "query");
        let url = Url::parse(&format!("{}query", self.endpoint))?;
        let response = self
            .request(Method::POST, url)
            .header(CONTENT_TYPE, "application/sparql-query")
            .header(ACCEPT, accept)
            .body(sparql.to_owned())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(StoreResponse::new(status, body))
    }
}
