//! LDP documents: a stored graph together with the interaction model and
//! membership pattern inferred from its own triples.

mod containment;
pub(crate) mod vocab;

use anyhow::{Context, Result, bail};
use axum::http::StatusCode;

use self::vocab::{
    LDP_BASIC_CONTAINER, LDP_DIRECT_CONTAINER, LDP_HAS_MEMBER_RELATION, LDP_IS_MEMBER_OF_RELATION,
    LDP_MEMBERSHIP_RESOURCE, LDP_RDF_SOURCE, RDF_TYPE,
};
use crate::rdf::{RdfFormat, TEXT_TURTLE, Term, Triple, sanitize_triples};
use crate::store::{Storage, same_resource};

pub(crate) use self::containment::{add_to_container, remove_from_container};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InteractionModel {
    RdfSource,
    BasicContainer,
    DirectContainer,
}

impl InteractionModel {
    pub(crate) fn iri(self) -> &'static str {
        match self {
            InteractionModel::RdfSource => LDP_RDF_SOURCE,
            InteractionModel::BasicContainer => LDP_BASIC_CONTAINER,
            InteractionModel::DirectContainer => LDP_DIRECT_CONTAINER,
        }
    }
    pub(crate) fn is_container(self) -> bool {
        !matches!(self, InteractionModel::RdfSource)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Document {
    pub(crate) uri: String,
    pub(crate) interaction_model: InteractionModel,
    pub(crate) triples: Vec<Triple>,
    pub(crate) membership_resource: Option<String>,
    pub(crate) has_member_relation: Option<String>,
    pub(crate) is_member_of_relation: Option<String>,
}

/// Which end of the membership triple the member sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MembershipDirection {
    /// `<resource> <relation> <member>`
    HasMember,
    /// `<member> <relation> <resource>`
    IsMemberOf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Membership {
    pub(crate) resource: String,
    pub(crate) relation: String,
    pub(crate) direction: MembershipDirection,
}

impl Membership {
    pub(crate) fn triple(&self, member: &str) -> Triple {
        match self.direction {
            MembershipDirection::HasMember => {
                Triple::new(&self.resource, &self.relation, Term::iri(member))
            }
            MembershipDirection::IsMemberOf => {
                Triple::new(member, &self.relation, Term::iri(&self.resource))
            }
        }
    }
    pub(crate) fn matches(&self, triple: &Triple, member: &str) -> bool {
        if triple.predicate != self.relation {
            return false;
        }
        let (subject, object) = match self.direction {
            MembershipDirection::HasMember => (self.resource.as_str(), member),
            MembershipDirection::IsMemberOf => (member, self.resource.as_str()),
        };
        triple.subject.as_iri().is_some_and(|s| same_resource(s, subject))
            && triple.object.as_iri().is_some_and(|o| same_resource(o, object))
    }
}

impl Document {
    /// Builds a document from (sanitized) triples, reading the interaction
    /// model and membership pattern off the triples whose subject is `uri`.
    /// A DirectContainer type wins over BasicContainer in any order.
    pub(crate) fn new(uri: impl Into<String>, triples: Vec<Triple>) -> Document {
        let uri = uri.into();
        let mut document = Document {
            uri,
            interaction_model: InteractionModel::RdfSource,
            triples: vec![],
            membership_resource: None,
            has_member_relation: None,
            is_member_of_relation: None,
        };
        for triple in &triples {
            let about_self = triple
                .subject
                .as_iri()
                .is_some_and(|s| same_resource(s, &document.uri));
            if !about_self {
                continue;
            }
            let Some(object) = triple.object.as_iri() else {
                continue;
            };
            match triple.predicate.as_str() {
                RDF_TYPE if object == LDP_DIRECT_CONTAINER => {
                    document.interaction_model = InteractionModel::DirectContainer;
                }
                RDF_TYPE
                    if object == LDP_BASIC_CONTAINER
                        && document.interaction_model != InteractionModel::DirectContainer =>
                {
                    document.interaction_model = InteractionModel::BasicContainer;
                }
                LDP_MEMBERSHIP_RESOURCE => document.membership_resource = Some(object.to_owned()),
                LDP_HAS_MEMBER_RELATION => document.has_member_relation = Some(object.to_owned()),
                LDP_IS_MEMBER_OF_RELATION => {
                    document.is_member_of_relation = Some(object.to_owned())
                }
                _ => {}
            }
        }
        document.triples = triples;
        document
    }

    pub(crate) fn is_container(&self) -> bool {
        self.interaction_model.is_container()
    }

    /// Honors a client's `Link: <ldp:Resource>; rel="type"` request. The
    /// document's own container types are dropped so the stored graph reads
    /// back as an RDF source.
    pub(crate) fn force_rdf_source(&mut self) {
        let uri = &self.uri;
        self.triples.retain(|triple| {
            let own_container_type = triple.predicate == RDF_TYPE
                && triple.subject.as_iri().is_some_and(|s| same_resource(s, uri))
                && triple
                    .object
                    .as_iri()
                    .is_some_and(|o| o == LDP_BASIC_CONTAINER || o == LDP_DIRECT_CONTAINER);
            !own_container_type
        });
        self.interaction_model = InteractionModel::RdfSource;
        self.membership_resource = None;
        self.has_member_relation = None;
        self.is_member_of_relation = None;
    }

    /// `<uri> a <interaction model>`.
    pub(crate) fn type_triple(&self) -> Triple {
        Triple::new(&self.uri, RDF_TYPE, Term::iri(self.interaction_model.iri()))
    }

    /// A DirectContainer needs a membership resource and exactly one of
    /// `hasMemberRelation` and `isMemberOfRelation`.
    pub(crate) fn validate_membership(&self) -> Result<(), &'static str> {
        if self.interaction_model != InteractionModel::DirectContainer {
            return Ok(());
        }
        if self.membership_resource.is_none() {
            return Err("a direct container requires ldp:membershipResource");
        }
        match (&self.has_member_relation, &self.is_member_of_relation) {
            (Some(_), Some(_)) => Err(
                "a direct container cannot have both ldp:hasMemberRelation and ldp:isMemberOfRelation",
            ),
            (None, None) => Err(
                "a direct container requires ldp:hasMemberRelation or ldp:isMemberOfRelation",
            ),
            _ => Ok(()),
        }
    }

    /// The membership pattern of a valid DirectContainer.
    pub(crate) fn membership(&self) -> Option<Membership> {
        if self.interaction_model != InteractionModel::DirectContainer {
            return None;
        }
        let resource = self.membership_resource.clone()?;
        match (&self.has_member_relation, &self.is_member_of_relation) {
            (Some(relation), None) => Some(Membership {
                resource,
                relation: relation.clone(),
                direction: MembershipDirection::HasMember,
            }),
            (None, Some(relation)) => Some(Membership {
                resource,
                relation: relation.clone(),
                direction: MembershipDirection::IsMemberOf,
            }),
            _ => None,
        }
    }

    pub(crate) fn to_turtle(&self) -> Result<(&'static str, String)> {
        RdfFormat::Turtle.serialize(&self.triples)
    }
}

/// Loads and interprets the graph named `uri`. `None` when the store reports
/// it missing or gone.
pub(crate) async fn fetch_document(store: &dyn Storage, uri: &str) -> Result<Option<Document>> {
    let response = store.get(uri, TEXT_TURTLE).await?;
    if matches!(response.status, StatusCode::NOT_FOUND | StatusCode::GONE) {
        return Ok(None);
    }
    if !response.status.is_success() {
        bail!("fetching {uri} failed with status {}", response.status);
    }
    let document = parse_document(uri, &response.body, RdfFormat::Turtle)
        .with_context(|| format!("stored graph {uri} is not readable"))?;
    Ok(Some(document))
}

pub(crate) fn parse_document(uri: &str, body: &str, format: RdfFormat) -> Result<Document> {
    let triples = sanitize_triples(format.parse(body, uri)?);
    Ok(Document::new(uri, triples))
}

/// Writes `document` back in Turtle, replacing the stored graph. The store
/// keeps no empty graphs, so an empty document is written as its type.
pub(crate) async fn store_document(store: &dyn Storage, document: &Document) -> Result<()> {
    let (content_type, body) = if document.triples.is_empty() {
        RdfFormat::Turtle.serialize(&[document.type_triple()])?
    } else {
        document.to_turtle()?
    };
    store.put(&document.uri, &body, content_type).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::vocab::{
        LDP_BASIC_CONTAINER, LDP_DIRECT_CONTAINER, LDP_HAS_MEMBER_RELATION,
        LDP_IS_MEMBER_OF_RELATION, LDP_MEMBERSHIP_RESOURCE, RDF_TYPE,
    };
    use super::{
        Document, InteractionModel, MembershipDirection, fetch_document, parse_document,
        store_document,
    };
    use crate::rdf::{RdfFormat, Term, Triple};
    use crate::store::MemoryStore;

    const C: &str = "http://example.org/r/c";

    fn direct(extra: Vec<Triple>) -> Vec<Triple> {
        let mut triples = vec![
            Triple::new(C, RDF_TYPE, Term::iri(LDP_DIRECT_CONTAINER)),
            Triple::new(C, LDP_MEMBERSHIP_RESOURCE, Term::iri(C)),
        ];
        triples.extend(extra);
        triples
    }

    #[test]
    fn plain_resource_by_default() {
        let document = Document::new(C, vec![Triple::new(C, "http://example.org/p", Term::string("x"))]);
        assert_eq!(document.interaction_model, InteractionModel::RdfSource);
        assert!(!document.is_container());
        assert!(document.validate_membership().is_ok());
    }

    #[test]
    fn direct_container_wins_in_any_order() {
        for triples in [
            vec![
                Triple::new(C, RDF_TYPE, Term::iri(LDP_BASIC_CONTAINER)),
                Triple::new(C, RDF_TYPE, Term::iri(LDP_DIRECT_CONTAINER)),
            ],
            vec![
                Triple::new(C, RDF_TYPE, Term::iri(LDP_DIRECT_CONTAINER)),
                Triple::new(C, RDF_TYPE, Term::iri(LDP_BASIC_CONTAINER)),
            ],
        ] {
            let document = Document::new(C, triples);
            assert_eq!(document.interaction_model, InteractionModel::DirectContainer);
        }
    }

    #[test]
    fn only_triples_about_the_document_count() {
        let document = Document::new(
            C,
            vec![
                Triple::new("http://example.org/other", RDF_TYPE, Term::iri(LDP_BASIC_CONTAINER)),
                Triple::new(
                    "http://example.org/other",
                    LDP_MEMBERSHIP_RESOURCE,
                    Term::iri("http://example.org/x"),
                ),
            ],
        );
        assert_eq!(document.interaction_model, InteractionModel::RdfSource);
        assert_eq!(document.membership_resource, None);
    }

    #[test]
    fn membership_predicates_are_matched_exactly() {
        let document = Document::new(
            C,
            direct(vec![
                Triple::new(C, "http://purl.org/dc/terms/title", Term::iri("http://example.org/t")),
                Triple::new(C, LDP_HAS_MEMBER_RELATION, Term::iri("http://example.org/has")),
            ]),
        );
        assert_eq!(document.membership_resource.as_deref(), Some(C));
        assert_eq!(
            document.has_member_relation.as_deref(),
            Some("http://example.org/has")
        );
        assert_eq!(document.is_member_of_relation, None);
        let membership = document.membership().expect("valid pattern");
        assert_eq!(membership.direction, MembershipDirection::HasMember);
        assert_eq!(
            membership.triple("http://example.org/r/c/a"),
            Triple::new(C, "http://example.org/has", Term::iri("http://example.org/r/c/a"))
        );
    }

    #[test]
    fn invalid_membership_patterns() {
        let missing_resource = Document::new(
            C,
            vec![
                Triple::new(C, RDF_TYPE, Term::iri(LDP_DIRECT_CONTAINER)),
                Triple::new(C, LDP_HAS_MEMBER_RELATION, Term::iri("http://example.org/has")),
            ],
        );
        assert!(missing_resource.validate_membership().is_err());

        let both = Document::new(
            C,
            direct(vec![
                Triple::new(C, LDP_HAS_MEMBER_RELATION, Term::iri("http://example.org/has")),
                Triple::new(C, LDP_IS_MEMBER_OF_RELATION, Term::iri("http://example.org/in")),
            ]),
        );
        assert!(both.validate_membership().is_err());
        assert_eq!(both.membership(), None);

        let neither = Document::new(C, direct(vec![]));
        assert!(neither.validate_membership().is_err());
    }

    #[test]
    fn is_member_of_points_from_member() {
        let document = Document::new(
            C,
            direct(vec![Triple::new(
                C,
                LDP_IS_MEMBER_OF_RELATION,
                Term::iri("http://example.org/in"),
            )]),
        );
        let membership = document.membership().expect("valid pattern");
        let triple = membership.triple("http://example.org/r/c/a");
        assert_eq!(
            triple,
            Triple::new("http://example.org/r/c/a", "http://example.org/in", Term::iri(C))
        );
        assert!(membership.matches(&triple, "http://EXAMPLE.org/r/c/a"));
        assert!(!membership.matches(&triple, "http://example.org/r/c/b"));
    }

    #[test]
    fn escaped_subjects_are_repaired_before_inference() {
        let triples = crate::rdf::sanitize_triples(vec![Triple::new(
            "http://example.org/r/\\c",
            RDF_TYPE,
            Term::iri(LDP_BASIC_CONTAINER),
        )]);
        assert!(Document::new(C, triples).is_container());
    }

    #[test]
    fn relative_subjects_resolve_against_the_document() -> Result<()> {
        let body = format!("<> a <{LDP_BASIC_CONTAINER}> .");
        let document = parse_document(C, &body, RdfFormat::Turtle)?;
        assert!(document.is_container());
        Ok(())
    }

    #[tokio::test]
    async fn stored_documents_read_back() -> Result<()> {
        let store = MemoryStore::new();
        assert_eq!(fetch_document(&store, C).await?, None);
        let document = Document::new(C, direct(vec![]));
        store_document(&store, &document).await?;
        let fetched = fetch_document(&store, C).await?.expect("stored");
        assert_eq!(fetched.interaction_model, InteractionModel::DirectContainer);
        assert_eq!(fetched.triples, document.triples);
        Ok(())
    }

    #[tokio::test]
    async fn forced_rdf_source_survives_a_round_trip() -> Result<()> {
        let store = MemoryStore::new();
        let mut document = Document::new(
            C,
            direct(vec![
                Triple::new(C, RDF_TYPE, Term::iri(LDP_BASIC_CONTAINER)),
                Triple::new(C, LDP_HAS_MEMBER_RELATION, Term::iri("http://example.org/has")),
            ]),
        );
        document.force_rdf_source();
        assert_eq!(document.membership(), None);
        store_document(&store, &document).await?;
        let fetched = fetch_document(&store, C).await?.expect("stored");
        assert_eq!(fetched.interaction_model, InteractionModel::RdfSource);
        assert!(!fetched.is_container());
        Ok(())
    }

    #[tokio::test]
    async fn empty_documents_are_stored_as_their_type() -> Result<()> {
        let store = MemoryStore::new();
        store_document(&store, &Document::new(C, vec![])).await?;
        let fetched = fetch_document(&store, C).await?.expect("stored");
        assert_eq!(
            fetched.triples,
            [Triple::new(C, RDF_TYPE, Term::iri(super::vocab::LDP_RDF_SOURCE))]
        );
        Ok(())
    }
}
