use anyhow::anyhow;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_TYPE, VARY};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::AppState;
use super::content_type::negotiate;
use super::error::LdpError;
use crate::query::{Node, compile, parse_query_string, project_results};
use crate::store::SPARQL_RESULTS_JSON;

/// `GET {search_path}?oslc.select=…&oslc.where=…`
pub(super) async fn search_by_query_string(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let result = match parse_query_string(&params) {
        Ok(root) => search(&state, &headers, &root).await,
        Err(error) => Err(error.into()),
    };
    result.unwrap_or_else(IntoResponse::into_response)
}

/// `POST {search_path}` with an already parsed query tree as JSON.
pub(super) async fn search_by_tree(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(root): Json<Node>,
) -> Response {
    search(&state, &headers, &root)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

async fn search(state: &AppState, headers: &HeaderMap, root: &Node) -> Result<Response, LdpError> {
    let negotiated = negotiate(headers)?;
    let sparql = compile(root)?;
    debug!(target: "query", %sparql, "compiled");

    let response = state.store.query(&sparql, SPARQL_RESULTS_JSON).await?;
    if !response.status.is_success() {
        return Err(anyhow!("query failed with status {}", response.status).into());
    }
    let base = format!(
        "{}{}",
        state.config.app_base.trim_end_matches('/'),
        state.config.search_path
    );
    let triples = project_results(&response.body, &base).map_err(anyhow::Error::from)?;
    let (_, body) = negotiated.format.serialize(&triples)?;
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, negotiated.media_type),
            (VARY, "Accept"),
        ],
        body,
    )
        .into_response())
}
