use std::path::Path;

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;

#[derive(Default, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub(crate) server: ServerConfig,
    pub(crate) store: StoreConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct ServerConfig {
    pub(crate) bind: String,
    pub(crate) port: u16,
    /// Public origin resources are named under, e.g. `https://data.example.org`.
    pub(crate) app_base: String,
    /// Path prefix of the LDP resources, e.g. `/r/`.
    pub(crate) context: String,
    pub(crate) search_path: String,
    pub(crate) cors: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum StoreKind {
    #[default]
    Fuseki,
    Memory,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct StoreConfig {
    pub(crate) kind: StoreKind,
    /// Fuseki dataset URL; `data`, `query` and `update` are resolved below it.
    pub(crate) endpoint: String,
    pub(crate) timeout_secs: u64,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<SecretString>,
}

impl Config {
    pub(crate) fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        Config::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }
    pub(crate) fn parse(text: &str) -> Result<Config> {
        Ok(toml::from_str(text)?)
    }
}

impl ServerConfig {
    /// IRI of the root container.
    pub(crate) fn root_container(&self) -> String {
        format!("{}{}", self.app_base.trim_end_matches('/'), self.context)
    }
    pub(crate) fn constraints_iri(&self) -> String {
        format!("{}/constraints.html", self.app_base.trim_end_matches('/'))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
            app_base: "http://localhost:3000".to_string(),
            context: "/r/".to_string(),
            search_path: "/search".to_string(),
            cors: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Fuseki,
            endpoint: "http://localhost:3030/ldp/".to_string(),
            timeout_secs: 10,
            username: None,
            password: None,
        }
    }
}
