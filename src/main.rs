mod config;
mod http;
mod ldp;
mod query;
mod rdf;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;

use crate::config::{Config, StoreKind};
use crate::http::AppState;
use crate::ldp::vocab::{LDP_BASIC_CONTAINER, RDF_TYPE};
use crate::ldp::{Document, fetch_document, store_document};
use crate::rdf::{Term, Triple};
use crate::store::{FusekiStore, MemoryStore, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let flags = xflags::parse_or_exit! {
        /// Path to the TOML config file
        optional -c,--config CONFIG: PathBuf
        /// Listen port, overriding the config file
        optional -p,--port PORT: u16
    };

    let mut config = match flags.config {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    if let Some(port) = flags.port {
        config.server.port = port;
    }

    let store: Arc<dyn Storage> = match config.store.kind {
        StoreKind::Fuseki => Arc::new(FusekiStore::new(config.store)?),
        StoreKind::Memory => Arc::new(MemoryStore::new()),
    };
    let server = Arc::new(config.server);

    let root = server.root_container();
    if fetch_document(store.as_ref(), &root).await?.is_none() {
        info!(target: "ldp", %root, "creating the root container");
        let triples = vec![Triple::new(&root, RDF_TYPE, Term::iri(LDP_BASIC_CONTAINER))];
        store_document(store.as_ref(), &Document::new(&root, triples)).await?;
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => {
                info!(target: "http", "Received the terminate signal; stopping");
            }
            _ = sigint.recv() => {
                info!(target: "http", "Received the interrupt signal; stopping");
            }
        }
    };

    http::serve(
        AppState {
            store,
            config: server,
        },
        shutdown,
    )
    .await
}
