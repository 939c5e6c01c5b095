use axum::http::StatusCode;
use axum::http::header::ALLOW;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

use crate::query::QueryError;

/// Every way an LDP request can fail, mapped onto a status at the handler
/// boundary.
#[derive(Debug, Error)]
pub(crate) enum LdpError {
    #[error("an If-Match header is required to update this resource")]
    PreconditionRequired,
    #[error("the entity tag does not match the current representation")]
    PreconditionFailed,
    #[error("no acceptable representation; available types are text/turtle, application/ld+json and application/json")]
    NotAcceptable,
    #[error("unsupported content type {0}")]
    UnsupportedMediaType(String),
    #[error("{0}")]
    Conflict(String),
    #[error("resource not found")]
    NotFound,
    #[error("resource is gone")]
    Gone,
    #[error("method not allowed")]
    MethodNotAllowed { allow: &'static str },
    #[error("malformed request body: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("internal server error")]
    Backend(#[from] anyhow::Error),
}

impl LdpError {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            LdpError::PreconditionRequired => StatusCode::PRECONDITION_REQUIRED,
            LdpError::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            LdpError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            LdpError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            LdpError::Conflict(_) => StatusCode::CONFLICT,
            LdpError::NotFound => StatusCode::NOT_FOUND,
            LdpError::Gone => StatusCode::GONE,
            LdpError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            LdpError::BadRequest(_) | LdpError::Query(_) => StatusCode::BAD_REQUEST,
            LdpError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LdpError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            LdpError::Backend(error) => warn!(target: "ldp", ?error, "backend failure"),
            LdpError::MethodNotAllowed { allow } => {
                return (status, [(ALLOW, *allow)], self.to_string()).into_response();
            }
            _ => {}
        }
        (status, self.to_string()).into_response()
    }
}
