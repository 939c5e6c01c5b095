//! IRIs of the vocabularies the server reasons about.

pub(crate) const LDP_NS: &str = "http://www.w3.org/ns/ldp#";
pub(crate) const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub(crate) const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub(crate) const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

pub(crate) const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub(crate) const RDF_LANG_STRING: &str =
    "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
pub(crate) const RDFS_MEMBER: &str = "http://www.w3.org/2000/01/rdf-schema#member";

pub(crate) const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub(crate) const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub(crate) const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub(crate) const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

pub(crate) const LDP_RESOURCE: &str = "http://www.w3.org/ns/ldp#Resource";
pub(crate) const LDP_RDF_SOURCE: &str = "http://www.w3.org/ns/ldp#RDFSource";
pub(crate) const LDP_BASIC_CONTAINER: &str = "http://www.w3.org/ns/ldp#BasicContainer";
pub(crate) const LDP_DIRECT_CONTAINER: &str = "http://www.w3.org/ns/ldp#DirectContainer";

pub(crate) const LDP_CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";
pub(crate) const LDP_MEMBERSHIP_RESOURCE: &str = "http://www.w3.org/ns/ldp#membershipResource";
pub(crate) const LDP_HAS_MEMBER_RELATION: &str = "http://www.w3.org/ns/ldp#hasMemberRelation";
pub(crate) const LDP_IS_MEMBER_OF_RELATION: &str =
    "http://www.w3.org/ns/ldp#isMemberOfRelation";
pub(crate) const LDP_CONSTRAINED_BY: &str = "http://www.w3.org/ns/ldp#constrainedBy";

pub(crate) const LDP_PREFER_MEMBERSHIP: &str = "http://www.w3.org/ns/ldp#PreferMembership";
pub(crate) const LDP_PREFER_CONTAINMENT: &str = "http://www.w3.org/ns/ldp#PreferContainment";
