mod content_type;
mod error;
mod etag;
mod iri;
mod prefer;
mod resource;
mod search;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::{CONTENT_TYPE, LINK};
use axum::response::IntoResponse;
use axum::routing::{any, get};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::ldp::vocab::LDP_CONSTRAINED_BY;
use crate::store::Storage;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<dyn Storage>,
    pub(crate) config: Arc<ServerConfig>,
}

pub(crate) async fn serve(
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let address = format!("{}:{}", state.config.bind, state.config.port);
    let app = router(state)?;
    let listener = TcpListener::bind(address).await?;
    info!(target: "http", address = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub(crate) fn router(state: AppState) -> Result<Router> {
    let config = state.config.clone();
    let prefix = config.context.trim_end_matches('/');
    let mut resources = Router::new()
        .route(&format!("{prefix}/"), any(resource::dispatch))
        .route(&format!("{prefix}/{{*path}}"), any(resource::dispatch));
    if !prefix.is_empty() {
        resources = resources.route(prefix, any(resource::dispatch));
    }
    let constrained_by = HeaderValue::from_str(&format!(
        "<{}>; rel=\"{LDP_CONSTRAINED_BY}\"",
        config.constraints_iri()
    ))
    .context("app_base cannot be used in a Link header")?;
    let resources = resources
        .layer(SetResponseHeaderLayer::appending(
            LINK,
            HeaderValue::from_static(RESOURCE_TYPE_LINK),
        ))
        .layer(SetResponseHeaderLayer::appending(LINK, constrained_by));

    let mut app = Router::new()
        .merge(resources)
        .route(
            &config.search_path,
            get(search::search_by_query_string).post(search::search_by_tree),
        )
        .route("/constraints.html", get(constraints))
        .with_state(state);
    if config.cors {
        app = app.layer(CorsLayer::permissive());
    }
    Ok(app)
}

const RESOURCE_TYPE_LINK: &str = "<http://www.w3.org/ns/ldp#Resource>; rel=\"type\"";

async fn constraints() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/html; charset=utf-8")],
        include_str!("constraints.html"),
    )
}
