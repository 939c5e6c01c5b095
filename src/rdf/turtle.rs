use anyhow::{Context, Result, bail};
use oxrdf::{BlankNode, NamedNode, Subject};
use oxttl::{TurtleParser, TurtleSerializer};

use super::{Codec, Literal, TEXT_TURTLE, Term, Triple};
use crate::ldp::vocab::{LDP_NS, RDF_NS, RDFS_NS, XSD_NS};

pub(crate) struct Turtle;

impl Codec for Turtle {
    fn content_type(&self) -> &'static str {
        TEXT_TURTLE
    }

    fn parse(&self, body: &str, base_iri: &str) -> Result<Vec<Triple>> {
        let parser = TurtleParser::new()
            .with_base_iri(base_iri)
            .with_context(|| format!("invalid base IRI {base_iri}"))?;
        let mut triples = vec![];
        for triple in parser.for_slice(body.as_bytes()) {
            let triple = triple.context("malformed Turtle document")?;
            triples.push(from_oxrdf(triple)?);
        }
        Ok(triples)
    }

    fn serialize(&self, triples: &[Triple]) -> Result<String> {
        let mut serializer = TurtleSerializer::new()
            .with_prefix("ldp", LDP_NS)?
            .with_prefix("rdf", RDF_NS)?
            .with_prefix("rdfs", RDFS_NS)?
            .with_prefix("xsd", XSD_NS)?
            .for_writer(Vec::new());
        for triple in triples {
            let triple = to_oxrdf(triple).with_context(|| format!("cannot serialize {triple}"))?;
            serializer.serialize_triple(&triple)?;
        }
        let bytes = serializer.finish()?;
        Ok(String::from_utf8(bytes)?)
    }
}

fn from_oxrdf(triple: oxrdf::Triple) -> Result<Triple> {
    let subject = match triple.subject {
        Subject::NamedNode(node) => Term::Iri(node.into_string()),
        Subject::BlankNode(node) => Term::Blank(node.into_string()),
        #[allow(unreachable_patterns)]
        _ => bail!("quoted triples are not supported"),
    };
    let object = match triple.object {
        oxrdf::Term::NamedNode(node) => Term::Iri(node.into_string()),
        oxrdf::Term::BlankNode(node) => Term::Blank(node.into_string()),
        oxrdf::Term::Literal(literal) => Term::Literal(Literal {
            value: literal.value().to_owned(),
            datatype: literal.datatype().as_str().to_owned(),
            language: literal.language().map(str::to_owned),
        }),
        #[allow(unreachable_patterns)]
        _ => bail!("quoted triples are not supported"),
    };
    Ok(Triple {
        subject,
        predicate: triple.predicate.into_string(),
        object,
    })
}

fn to_oxrdf(triple: &Triple) -> Result<oxrdf::Triple> {
    let subject: Subject = match &triple.subject {
        Term::Iri(iri) => NamedNode::new(iri.as_str())?.into(),
        Term::Blank(label) => BlankNode::new(label.as_str())?.into(),
        Term::Literal(_) => bail!("a literal cannot be a subject"),
    };
    let predicate = NamedNode::new(triple.predicate.as_str())?;
    let object: oxrdf::Term = match &triple.object {
        Term::Iri(iri) => NamedNode::new(iri.as_str())?.into(),
        Term::Blank(label) => BlankNode::new(label.as_str())?.into(),
        Term::Literal(Literal {
            value,
            language: Some(language),
            ..
        }) => oxrdf::Literal::new_language_tagged_literal(value.as_str(), language.as_str())?
            .into(),
        Term::Literal(Literal {
            value, datatype, ..
        }) => oxrdf::Literal::new_typed_literal(value.as_str(), NamedNode::new(datatype.as_str())?)
            .into(),
    };
    Ok(oxrdf::Triple::new(subject, predicate, object))
}
