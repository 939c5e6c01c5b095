//! Triples as the server sees them, and the codecs that read and write them.

mod json_ld;
mod sanitize;
mod turtle;

use std::fmt::Display;

use anyhow::Result;

use crate::ldp::vocab::{RDF_LANG_STRING, XSD_STRING};

pub(crate) use self::json_ld::JsonLd;
pub(crate) use self::sanitize::sanitize_triples;
pub(crate) use self::turtle::Turtle;

pub(crate) const TEXT_TURTLE: &str = "text/turtle";
pub(crate) const APPLICATION_LD_JSON: &str = "application/ld+json";
pub(crate) const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Term {
    Iri(String),
    /// Blank node label without the `_:` prefix.
    Blank(String),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Literal {
    pub(crate) value: String,
    pub(crate) datatype: String,
    pub(crate) language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Triple {
    pub(crate) subject: Term,
    pub(crate) predicate: String,
    pub(crate) object: Term,
}

impl Term {
    pub(crate) fn iri(iri: impl Into<String>) -> Term {
        Term::Iri(iri.into())
    }
    pub(crate) fn string(value: impl Into<String>) -> Term {
        Term::Literal(Literal {
            value: value.into(),
            datatype: XSD_STRING.to_string(),
            language: None,
        })
    }
    pub(crate) fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Term {
        Term::Literal(Literal {
            value: value.into(),
            datatype: datatype.into(),
            language: None,
        })
    }
    pub(crate) fn lang_string(value: impl Into<String>, language: impl Into<String>) -> Term {
        Term::Literal(Literal {
            value: value.into(),
            datatype: RDF_LANG_STRING.to_string(),
            language: Some(language.into()),
        })
    }
    pub(crate) fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }
    /// Lexical form of the term, as the sanitizer and matchers see it.
    pub(crate) fn lexical(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::Blank(label) => label,
            Term::Literal(literal) => &literal.value,
        }
    }
    pub(crate) fn lexical_mut(&mut self) -> &mut String {
        match self {
            Term::Iri(iri) => iri,
            Term::Blank(label) => label,
            Term::Literal(literal) => &mut literal.value,
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::Blank(label) => write!(f, "_:{label}"),
            Term::Literal(Literal {
                value,
                language: Some(language),
                ..
            }) => write!(f, "{value:?}@{language}"),
            Term::Literal(Literal {
                value, datatype, ..
            }) => write!(f, "{value:?}^^<{datatype}>"),
        }
    }
}

impl Triple {
    /// A triple whose subject is an IRI.
    pub(crate) fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Triple {
        Triple {
            subject: Term::Iri(subject.into()),
            predicate: predicate.into(),
            object,
        }
    }
}

impl Display for Triple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.predicate, self.object)
    }
}

/// Reads and writes one RDF serialization.
pub(crate) trait Codec: Send + Sync {
    fn content_type(&self) -> &'static str;
    fn parse(&self, body: &str, base_iri: &str) -> Result<Vec<Triple>>;
    fn serialize(&self, triples: &[Triple]) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RdfFormat {
    Turtle,
    JsonLd,
}

impl RdfFormat {
    /// Maps a media type essence (no parameters) to the codec that reads it.
    /// Plain JSON is read as JSON-LD.
    pub(crate) fn from_media_type(essence: &str) -> Option<RdfFormat> {
        match essence.to_ascii_lowercase().as_str() {
            TEXT_TURTLE => Some(RdfFormat::Turtle),
            APPLICATION_LD_JSON | APPLICATION_JSON => Some(RdfFormat::JsonLd),
            _ => None,
        }
    }
    pub(crate) fn media_type(self) -> &'static str {
        self.codec().content_type()
    }
    pub(crate) fn codec(self) -> &'static dyn Codec {
        match self {
            RdfFormat::Turtle => &Turtle,
            RdfFormat::JsonLd => &JsonLd,
        }
    }
    pub(crate) fn parse(self, body: &str, base_iri: &str) -> Result<Vec<Triple>> {
        self.codec().parse(body, base_iri)
    }
    /// Returns the content type together with the serialized body.
    pub(crate) fn serialize(self, triples: &[Triple]) -> Result<(&'static str, String)> {
        let codec = self.codec();
        Ok((codec.content_type(), codec.serialize(triples)?))
    }
}
