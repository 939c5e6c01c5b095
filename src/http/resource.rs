use anyhow::anyhow;
use axum::extract::State;
use axum::http::header::{
    ALLOW, CONTENT_TYPE, ETAG, IF_MATCH, IF_NONE_MATCH, LINK, LOCATION, VARY,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use jiff::Timestamp;
use tracing::{debug, info};

use super::AppState;
use super::content_type::{ACCEPT_POST, negotiate, request_format};
use super::error::LdpError;
use super::etag::{entity_tag, tag_matches};
use super::iri::{add_path, parent_of, request_iri};
use super::prefer::{Preferences, has_resource_link};
use crate::ldp::vocab::{LDP_PREFER_CONTAINMENT, LDP_PREFER_MEMBERSHIP};
use crate::ldp::{
    Document, MembershipDirection, add_to_container, fetch_document,
    parse_document, remove_from_container, store_document,
};
use crate::rdf::{RdfFormat, Triple, sanitize_triples};
use crate::store::Storage;

const ALLOW_CONTAINER: &str = "GET,HEAD,DELETE,OPTIONS,POST";
const ALLOW_RESOURCE: &str = "GET,HEAD,DELETE,OPTIONS,PUT";
const ALLOW_ANY: &str = "GET,HEAD,PUT,POST,DELETE,OPTIONS";

const ACCEPT_POST_HEADER: HeaderName = HeaderName::from_static("accept-post");
const PREFERENCE_APPLIED: HeaderName = HeaderName::from_static("preference-applied");
const SLUG: HeaderName = HeaderName::from_static("slug");

pub(super) async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let iri = request_iri(&state.config, &uri);
    info!(target: "ldp", %method, %iri, "request");
    let store = state.store.as_ref();
    let result = match method {
        Method::GET => read(store, &iri, &headers, true).await,
        Method::HEAD => read(store, &iri, &headers, false).await,
        Method::OPTIONS => options(store, &iri).await,
        Method::PUT => put(store, &iri, &headers, &body).await,
        Method::POST => post(store, &iri, &headers, &body).await,
        Method::DELETE => delete(store, &iri).await,
        _ => Err(LdpError::MethodNotAllowed { allow: ALLOW_ANY }),
    };
    result.unwrap_or_else(IntoResponse::into_response)
}

async fn read(
    store: &dyn Storage,
    iri: &str,
    headers: &HeaderMap,
    with_body: bool,
) -> Result<Response, LdpError> {
    let negotiated = negotiate(headers);
    let format = negotiated.as_ref().map_or(RdfFormat::Turtle, |n| n.format);
    let body = fetch(store, iri, format).await?;
    let negotiated = negotiated?;
    let document = parse_document(iri, &body, format)?;

    let tag = entity_tag(&body);
    if headers
        .get(IF_NONE_MATCH)
        .is_some_and(|value| tag_matches(value, &tag))
    {
        return Ok((StatusCode::NOT_MODIFIED, [(ETAG, tag)]).into_response());
    }

    let mut response_headers = describe(&document);
    let preferences = Preferences::from_headers(headers);
    if preferences.includes(LDP_PREFER_MEMBERSHIP) || preferences.includes(LDP_PREFER_CONTAINMENT)
    {
        response_headers.insert(
            PREFERENCE_APPLIED,
            HeaderValue::from_static("return=representation"),
        );
    }
    response_headers.insert(
        ETAG,
        HeaderValue::from_str(&tag).map_err(|e| anyhow!("invalid entity tag: {e}"))?,
    );
    response_headers.insert(CONTENT_TYPE, HeaderValue::from_static(negotiated.media_type));
    response_headers.insert(VARY, HeaderValue::from_static("Accept"));
    if with_body {
        Ok((response_headers, body).into_response())
    } else {
        Ok(response_headers.into_response())
    }
}

async fn options(store: &dyn Storage, iri: &str) -> Result<Response, LdpError> {
    let body = fetch(store, iri, RdfFormat::Turtle).await?;
    let document = parse_document(iri, &body, RdfFormat::Turtle)?;
    Ok((StatusCode::OK, describe(&document)).into_response())
}

async fn put(
    store: &dyn Storage,
    iri: &str,
    headers: &HeaderMap,
    body: &str,
) -> Result<Response, LdpError> {
    let format = request_format(headers);
    // Compare tags over the representation the client is sending back.
    let stored_format = format.as_ref().map_or(RdfFormat::Turtle, |f| *f);
    let stored = match fetch(store, iri, stored_format).await {
        Ok(stored) => stored,
        Err(LdpError::NotFound) => return create_by_put(store, iri, headers, body).await,
        Err(error) => return Err(error),
    };
    let document = parse_document(iri, &stored, stored_format)?;
    if document.is_container() {
        return create(store, document, headers, body, MemberName::Slug(slug(headers))).await;
    }

    let if_match = headers
        .get(IF_MATCH)
        .ok_or(LdpError::PreconditionRequired)?;
    if !tag_matches(if_match, &entity_tag(&stored)) {
        return Err(LdpError::PreconditionFailed);
    }
    let format = format?;
    let replacement = Document::new(iri, parse_body(format, body, iri)?);
    store_document(store, &replacement).await?;
    info!(target: "ldp", %iri, "updated");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// PUT to a missing IRI creates exactly that IRI as a member of the parent
/// container.
async fn create_by_put(
    store: &dyn Storage,
    iri: &str,
    headers: &HeaderMap,
    body: &str,
) -> Result<Response, LdpError> {
    let parent = parent_of(iri).ok_or(LdpError::NotFound)?;
    let container = fetch_document(store, &parent)
        .await?
        .ok_or(LdpError::NotFound)?;
    create(store, container, headers, body, MemberName::Exact(iri)).await
}

async fn post(
    store: &dyn Storage,
    iri: &str,
    headers: &HeaderMap,
    body: &str,
) -> Result<Response, LdpError> {
    let container = fetch_document(store, iri)
        .await?
        .ok_or(LdpError::NotFound)?;
    create(store, container, headers, body, MemberName::Slug(slug(headers))).await
}

enum MemberName<'a> {
    /// A client hint; cleaned, and replaced by a generated name when taken.
    Slug(Option<String>),
    Exact(&'a str),
}

async fn create(
    store: &dyn Storage,
    container: Document,
    headers: &HeaderMap,
    body: &str,
    name: MemberName<'_>,
) -> Result<Response, LdpError> {
    if !container.is_container() {
        return Err(LdpError::MethodNotAllowed {
            allow: ALLOW_RESOURCE,
        });
    }
    let format = request_format(headers)?;
    let member = match name {
        MemberName::Slug(slug) => assign_uri(store, &container.uri, slug.as_deref()).await?,
        MemberName::Exact(iri) => {
            if let Err(error) = store.reserve_uri(iri).await {
                debug!(target: "ldp", %error, %iri, "reservation lost");
                return Err(LdpError::Conflict(format!("{iri} already exists")));
            }
            iri.to_owned()
        }
    };

    let document = match new_member(&container, &member, format, headers, body) {
        Ok(document) => document,
        Err(error) => {
            store.release_uri(&member).await;
            return Err(error);
        }
    };
    if let Err(error) = store_document(store, &document).await {
        store.release_uri(&member).await;
        return Err(error.into());
    }
    add_to_container(store, container, &member).await?;

    info!(target: "ldp", %member, model = ?document.interaction_model, "created");
    Ok((StatusCode::CREATED, [(LOCATION, member)]).into_response())
}

fn new_member(
    container: &Document,
    member: &str,
    format: RdfFormat,
    headers: &HeaderMap,
    body: &str,
) -> Result<Document, LdpError> {
    let mut document = Document::new(member, parse_body(format, body, member)?);
    if has_resource_link(headers) {
        document.force_rdf_source();
    }
    document
        .validate_membership()
        .map_err(|message| LdpError::Conflict(message.to_string()))?;
    if let Some(membership) = container.membership() {
        if membership.direction == MembershipDirection::IsMemberOf {
            document.triples.push(membership.triple(member));
        }
    }
    Ok(document)
}

/// Reserves the slug when one is given and free, otherwise a generated name.
async fn assign_uri(
    store: &dyn Storage,
    container: &str,
    slug: Option<&str>,
) -> Result<String, LdpError> {
    if let Some(candidate) = slug.and_then(|slug| add_path(container, slug)) {
        match store.reserve_uri(&candidate).await {
            Ok(()) => return Ok(candidate),
            Err(error) => {
                debug!(target: "ldp", %error, %candidate, "slug unavailable, generating a name");
            }
        }
    }
    let name = format!("res{}", Timestamp::now().as_millisecond());
    let candidate =
        add_path(container, &name).ok_or_else(|| anyhow!("cannot name a member of {container}"))?;
    store.reserve_uri(&candidate).await?;
    Ok(candidate)
}

async fn delete(store: &dyn Storage, iri: &str) -> Result<Response, LdpError> {
    let removed = store.remove(iri).await?;
    if removed.status == StatusCode::NOT_FOUND {
        return Err(LdpError::NotFound);
    }
    info!(target: "ldp", %iri, "deleted");

    let Some(parent) = parent_of(iri) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    let Some(container) = fetch_document(store, &parent).await? else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    if !container.is_container() {
        return Err(LdpError::MethodNotAllowed {
            allow: ALLOW_RESOURCE,
        });
    }
    remove_from_container(store, container, iri).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn fetch(store: &dyn Storage, iri: &str, format: RdfFormat) -> Result<String, LdpError> {
    let stored = store.get(iri, format.media_type()).await?;
    match stored.status {
        StatusCode::NOT_FOUND => Err(LdpError::NotFound),
        StatusCode::GONE => Err(LdpError::Gone),
        status if status.is_success() => Ok(stored.body),
        status => Err(anyhow!("fetching {iri} failed with status {status}").into()),
    }
}

fn parse_body(format: RdfFormat, body: &str, base: &str) -> Result<Vec<Triple>, LdpError> {
    format
        .parse(body, base)
        .map(sanitize_triples)
        .map_err(|error| LdpError::BadRequest(error.to_string()))
}

fn slug(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SLUG)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// `Allow`, `Accept-Post` and the interaction model `Link`.
fn describe(document: &Document) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if document.is_container() {
        headers.insert(ALLOW, HeaderValue::from_static(ALLOW_CONTAINER));
        headers.insert(ACCEPT_POST_HEADER, HeaderValue::from_static(ACCEPT_POST));
    } else {
        headers.insert(ALLOW, HeaderValue::from_static(ALLOW_RESOURCE));
    }
    let link = format!("<{}>; rel=\"type\"", document.interaction_model.iri());
    if let Ok(link) = HeaderValue::from_str(&link) {
        headers.append(LINK, link);
    }
    headers
}
