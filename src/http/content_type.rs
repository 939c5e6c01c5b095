use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use headers::HeaderMapExt;
use headers_accept::Accept;
use mediatype::names::{APPLICATION, JSON, TEXT, TURTLE};
use mediatype::{MediaType, Name};

use super::error::LdpError;
use crate::rdf::{APPLICATION_JSON, APPLICATION_LD_JSON, RdfFormat, TEXT_TURTLE};

/// Types a POST or PUT body may use, for `Accept-Post`.
pub(crate) const ACCEPT_POST: &str = "text/turtle,application/ld+json,application/json";

static MEDIA_TYPES: [MediaType<'_>; 3] = [
    MediaType::new(TEXT, TURTLE),
    MediaType::from_parts(APPLICATION, Name::new_unchecked("ld"), Some(JSON), &[]),
    MediaType::new(APPLICATION, JSON),
];

static FORMATS: [(RdfFormat, &str); 3] = [
    (RdfFormat::Turtle, TEXT_TURTLE),
    (RdfFormat::JsonLd, APPLICATION_LD_JSON),
    (RdfFormat::JsonLd, APPLICATION_JSON),
];

/// The representation picked for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Negotiated {
    pub(crate) format: RdfFormat,
    /// Echoed as `Content-Type`; plain JSON stays plain JSON.
    pub(crate) media_type: &'static str,
}

/// Picks a response representation from `Accept`. No (or an unreadable)
/// header means Turtle.
pub(crate) fn negotiate(headers: &HeaderMap) -> Result<Negotiated, LdpError> {
    let Some(accept) = headers.typed_get::<Accept>() else {
        return Ok(Negotiated {
            format: RdfFormat::Turtle,
            media_type: TEXT_TURTLE,
        });
    };
    let negotiated = accept
        .negotiate(&MEDIA_TYPES)
        .ok_or(LdpError::NotAcceptable)?;
    let index = MEDIA_TYPES
        .iter()
        .position(|media_type| media_type == negotiated)
        .ok_or(LdpError::NotAcceptable)?;
    let (format, media_type) = FORMATS[index];
    Ok(Negotiated { format, media_type })
}

/// The codec for a request body, by its `Content-Type`.
pub(crate) fn request_format(headers: &HeaderMap) -> Result<RdfFormat, LdpError> {
    let value = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| LdpError::UnsupportedMediaType("(none)".to_string()))?;
    let media_type = MediaType::parse(value)
        .map_err(|_| LdpError::UnsupportedMediaType(value.to_string()))?;
    RdfFormat::from_media_type(&media_type.essence().to_string())
        .ok_or_else(|| LdpError::UnsupportedMediaType(value.to_string()))
}
