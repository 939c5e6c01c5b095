//! Just enough JSON-LD
//!
//! Reads expanded, flattened and simply compacted documents (inline contexts
//! with term, prefix and `@vocab` definitions) and writes flattened expanded
//! form. Remote contexts and lists are rejected.

use std::collections::HashMap;

use anyhow::{Context as _, Result, bail};
use oxiri::Iri;
use serde_json::{Map, Value};

use super::{APPLICATION_LD_JSON, Codec, Literal, Term, Triple};
use crate::ldp::vocab::{RDF_TYPE, XSD_BOOLEAN, XSD_DOUBLE, XSD_INTEGER, XSD_STRING};

pub(crate) struct JsonLd;

impl Codec for JsonLd {
    fn content_type(&self) -> &'static str {
        APPLICATION_LD_JSON
    }

    fn parse(&self, body: &str, base_iri: &str) -> Result<Vec<Triple>> {
        if body.trim().is_empty() {
            return Ok(vec![]);
        }
        let value: Value = serde_json::from_str(body).context("malformed JSON-LD document")?;
        let base = Iri::parse(base_iri.to_owned())
            .with_context(|| format!("invalid base IRI {base_iri}"))?;
        let mut reader = Reader {
            base,
            triples: vec![],
            next_blank: 0,
            labels: HashMap::new(),
        };
        reader.read_document(&value, &Context::default())?;
        Ok(reader.triples)
    }

    fn serialize(&self, triples: &[Triple]) -> Result<String> {
        let mut nodes: Vec<Map<String, Value>> = vec![];
        let mut index: HashMap<String, usize> = HashMap::new();
        for triple in triples {
            let id = match &triple.subject {
                Term::Iri(iri) => iri.clone(),
                Term::Blank(label) => format!("_:{label}"),
                Term::Literal(_) => bail!("a literal cannot be a subject"),
            };
            let position = *index.entry(id.clone()).or_insert_with(|| {
                let mut node = Map::new();
                node.insert("@id".to_string(), Value::String(id));
                nodes.push(node);
                nodes.len() - 1
            });
            let node = &mut nodes[position];
            if let (RDF_TYPE, Term::Iri(class)) = (triple.predicate.as_str(), &triple.object) {
                push_value(node, "@type", Value::String(class.clone()));
                continue;
            }
            push_value(node, &triple.predicate, value_object(&triple.object));
        }
        let document = Value::Array(nodes.into_iter().map(Value::Object).collect());
        Ok(serde_json::to_string_pretty(&document)?)
    }
}

fn push_value(node: &mut Map<String, Value>, key: &str, value: Value) {
    let entry = node
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(vec![]));
    if let Value::Array(values) = entry {
        values.push(value);
    }
}

fn value_object(term: &Term) -> Value {
    let mut object = Map::new();
    match term {
        Term::Iri(iri) => {
            object.insert("@id".into(), Value::String(iri.clone()));
        }
        Term::Blank(label) => {
            object.insert("@id".into(), Value::String(format!("_:{label}")));
        }
        Term::Literal(Literal {
            value,
            datatype,
            language,
        }) => {
            object.insert("@value".into(), Value::String(value.clone()));
            if let Some(language) = language {
                object.insert("@language".into(), Value::String(language.clone()));
            } else if datatype != XSD_STRING {
                object.insert("@type".into(), Value::String(datatype.clone()));
            }
        }
    }
    Value::Object(object)
}

#[derive(Debug, Clone, Default)]
struct Context {
    vocab: Option<String>,
    terms: HashMap<String, TermDefinition>,
}

#[derive(Debug, Clone)]
struct TermDefinition {
    iri: String,
    /// `"@type": "@id"`: string values are IRIs.
    coerce_id: bool,
}

impl Context {
    fn merge(&self, local: &Value) -> Result<Context> {
        let mut context = self.clone();
        match local {
            Value::Null => context = Context::default(),
            Value::Array(items) => {
                for item in items {
                    context = context.merge(item)?;
                }
            }
            Value::String(iri) => bail!("remote context {iri} is not supported"),
            Value::Object(definitions) => {
                for (key, definition) in definitions {
                    if key == "@vocab" {
                        context.vocab = definition.as_str().map(str::to_owned);
                        continue;
                    }
                    if key.starts_with('@') {
                        continue;
                    }
                    let term = match definition {
                        Value::String(iri) => TermDefinition {
                            iri: context.expand_prefixed(iri),
                            coerce_id: false,
                        },
                        Value::Object(expanded) => {
                            let Some(iri) = expanded.get("@id").and_then(Value::as_str) else {
                                continue;
                            };
                            TermDefinition {
                                iri: context.expand_prefixed(iri),
                                coerce_id: expanded.get("@type").and_then(Value::as_str)
                                    == Some("@id"),
                            }
                        }
                        _ => continue,
                    };
                    context.terms.insert(key.clone(), term);
                }
            }
            _ => bail!("invalid @context"),
        }
        Ok(context)
    }

    fn expand_prefixed(&self, value: &str) -> String {
        if let Some((prefix, suffix)) = value.split_once(':') {
            if !suffix.starts_with("//") {
                if let Some(term) = self.terms.get(prefix) {
                    return format!("{}{suffix}", term.iri);
                }
            }
        }
        value.to_owned()
    }

    /// Expands a property or type name. Unmapped terms are dropped.
    fn expand_vocab(&self, value: &str) -> Option<String> {
        if let Some(term) = self.terms.get(value) {
            return Some(term.iri.clone());
        }
        if value.contains(':') {
            return Some(self.expand_prefixed(value));
        }
        self.vocab.as_ref().map(|vocab| format!("{vocab}{value}"))
    }
}

struct Reader {
    base: Iri<String>,
    triples: Vec<Triple>,
    next_blank: usize,
    /// Document blank node labels, relabeled so they never meet generated ones.
    labels: HashMap<String, Term>,
}

impl Reader {
    fn read_document(&mut self, value: &Value, context: &Context) -> Result<()> {
        match value {
            Value::Array(nodes) => {
                for node in nodes {
                    self.read_document(node, context)?;
                }
            }
            Value::Object(object) => {
                let context = match object.get("@context") {
                    Some(local) => context.merge(local)?,
                    None => context.clone(),
                };
                if let Some(graph) = object.get("@graph") {
                    self.read_document(graph, &context)?;
                } else {
                    self.read_node(object, &context)?;
                }
            }
            _ => bail!("expected a JSON-LD node object"),
        }
        Ok(())
    }

    fn read_node(&mut self, object: &Map<String, Value>, context: &Context) -> Result<Term> {
        let local;
        let context = match object.get("@context") {
            Some(definitions) => {
                local = context.merge(definitions)?;
                &local
            }
            None => context,
        };
        let subject = match object.get("@id").and_then(Value::as_str) {
            Some(id) => self.node_reference(id, context)?,
            None => self.fresh_blank(),
        };
        for (key, value) in object {
            match key.as_str() {
                "@type" => {
                    let types = match value {
                        Value::Array(types) => types.iter().collect(),
                        single => vec![single],
                    };
                    for class in types {
                        let class = class.as_str().context("@type must be a string")?;
                        if let Some(class) = context.expand_vocab(class) {
                            self.push(subject.clone(), RDF_TYPE, Term::Iri(class));
                        }
                    }
                }
                "@reverse" | "@list" => bail!("{key} is not supported"),
                keyword if keyword.starts_with('@') => {}
                property => {
                    let Some(predicate) = context.expand_vocab(property) else {
                        continue;
                    };
                    let coerce_id = context
                        .terms
                        .get(property)
                        .is_some_and(|term| term.coerce_id);
                    for object in self.read_values(value, coerce_id, context)? {
                        self.push(subject.clone(), &predicate, object);
                    }
                }
            }
        }
        Ok(subject)
    }

    fn read_values(&mut self, value: &Value, coerce_id: bool, context: &Context) -> Result<Vec<Term>> {
        let term = match value {
            Value::Null => return Ok(vec![]),
            Value::Array(values) => {
                let mut terms = vec![];
                for value in values {
                    terms.extend(self.read_values(value, coerce_id, context)?);
                }
                return Ok(terms);
            }
            Value::String(s) if coerce_id => self.node_reference(s, context)?,
            Value::String(s) => Term::string(s.as_str()),
            Value::Bool(b) => Term::typed(b.to_string(), XSD_BOOLEAN),
            Value::Number(n) if n.is_i64() || n.is_u64() => Term::typed(n.to_string(), XSD_INTEGER),
            Value::Number(n) => {
                let double = n.as_f64().context("number out of range")?;
                Term::typed(format!("{double:E}"), XSD_DOUBLE)
            }
            Value::Object(object) => {
                if let Some(literal) = object.get("@value") {
                    self.read_literal(literal, object, context)?
                } else if let Some(set) = object.get("@set") {
                    return self.read_values(set, coerce_id, context);
                } else if object.contains_key("@list") {
                    bail!("@list is not supported");
                } else if object.len() == 1 && object.contains_key("@id") {
                    let id = object["@id"].as_str().context("@id must be a string")?;
                    self.node_reference(id, context)?
                } else {
                    self.read_node(object, context)?
                }
            }
        };
        Ok(vec![term])
    }

    fn read_literal(
        &self,
        literal: &Value,
        object: &Map<String, Value>,
        context: &Context,
    ) -> Result<Term> {
        let lexical = match literal {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            _ => bail!("@value must be a scalar"),
        };
        if let Some(language) = object.get("@language").and_then(Value::as_str) {
            return Ok(Term::lang_string(lexical, language));
        }
        if let Some(datatype) = object.get("@type").and_then(Value::as_str) {
            let datatype = context
                .expand_vocab(datatype)
                .with_context(|| format!("unknown datatype {datatype}"))?;
            return Ok(Term::typed(lexical, datatype));
        }
        Ok(match literal {
            Value::Bool(_) => Term::typed(lexical, XSD_BOOLEAN),
            Value::Number(n) if n.is_i64() || n.is_u64() => Term::typed(lexical, XSD_INTEGER),
            Value::Number(_) => Term::typed(lexical, XSD_DOUBLE),
            _ => Term::string(lexical),
        })
    }

    fn node_reference(&mut self, id: &str, context: &Context) -> Result<Term> {
        if let Some(label) = id.strip_prefix("_:") {
            if let Some(term) = self.labels.get(label) {
                return Ok(term.clone());
            }
            let term = self.fresh_blank();
            self.labels.insert(label.to_owned(), term.clone());
            return Ok(term);
        }
        let expanded = context.expand_prefixed(id);
        let resolved = self
            .base
            .resolve(&expanded)
            .with_context(|| format!("invalid IRI {id}"))?;
        Ok(Term::Iri(resolved.into_inner()))
    }

    fn fresh_blank(&mut self) -> Term {
        self.next_blank += 1;
        Term::Blank(format!("b{}", self.next_blank))
    }

    fn push(&mut self, subject: Term, predicate: &str, object: Term) {
        self.triples.push(Triple {
            subject,
            predicate: predicate.to_owned(),
            object,
        });
    }
}
