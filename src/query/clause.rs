use super::{
    Node, OSLC_ORDER_BY, OSLC_PREFIX, OSLC_SEARCH_TERMS, OSLC_SELECT, OSLC_WHERE, QueryError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Clause {
    Select(Vec<Field>),
    Where(Vec<Condition>),
    OrderBy(Vec<SortKey>),
    Prefix(Vec<PrefixBinding>),
    SearchTerms(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Field {
    pub(crate) property: String,
    pub(crate) nested: Vec<Field>,
}

/// `?s <property> <value>`; only equality is expressible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Condition {
    pub(crate) property: String,
    pub(crate) value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Order {
    Ascending,
    Descending,
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SortKey {
    pub(crate) property: String,
    pub(crate) order: Order,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PrefixBinding {
    pub(crate) name: String,
    pub(crate) iri: String,
}

/// Walks the clause chain (linked through `left`) and checks every term, so
/// the emitter only ever sees well-formed pieces.
pub(crate) fn parse_clauses(root: &Node) -> Result<Vec<Clause>, QueryError> {
    let mut clauses = vec![];
    let mut next = Some(root);
    while let Some(node) = next {
        if node.val == OSLC_SELECT && node.right.is_none() {
            clauses.push(Clause::Select(vec![]));
            next = node.left.as_deref();
            continue;
        }
        let body = node
            .right
            .as_deref()
            .ok_or_else(|| QueryError::Tree(format!("{} has no body", node.val)))?;
        let clause = match node.val.as_str() {
            OSLC_SELECT => Clause::Select(fields(body)?),
            OSLC_WHERE => Clause::Where(
                body.items("and")
                    .into_iter()
                    .map(condition)
                    .collect::<Result<_, _>>()?,
            ),
            OSLC_PREFIX => Clause::Prefix(
                body.items(",")
                    .into_iter()
                    .map(prefix_binding)
                    .collect::<Result<_, _>>()?,
            ),
            OSLC_ORDER_BY => Clause::OrderBy(
                body.items(",")
                    .into_iter()
                    .map(sort_key)
                    .collect::<Result<_, _>>()?,
            ),
            OSLC_SEARCH_TERMS => Clause::SearchTerms(
                body.items(",")
                    .into_iter()
                    .map(search_term)
                    .collect::<Result<_, _>>()?,
            ),
            other => {
                return Err(QueryError::Tree(format!(
                    "expected a clause marker, found {other}"
                )));
            }
        };
        clauses.push(clause);
        next = node.left.as_deref();
    }
    Ok(clauses)
}

fn fields(body: &Node) -> Result<Vec<Field>, QueryError> {
    body.items(",").into_iter().map(field).collect()
}

fn field(node: &Node) -> Result<Field, QueryError> {
    if node.val == "{" {
        let property = leaf(node.left.as_deref(), "nested select")?;
        let nested = node
            .right
            .as_deref()
            .ok_or_else(|| QueryError::Tree(format!("{property} has an empty selection")))?;
        return Ok(Field {
            property: checked_property(property)?,
            nested: fields(nested)?,
        });
    }
    if !node.is_leaf() {
        return Err(QueryError::Tree(format!("unexpected {} in select", node.val)));
    }
    Ok(Field {
        property: checked_property(&node.val)?,
        nested: vec![],
    })
}

fn condition(node: &Node) -> Result<Condition, QueryError> {
    if node.val != "=" {
        return Err(QueryError::UnsupportedOperator(node.val.clone()));
    }
    let property = leaf(node.left.as_deref(), "comparison")?;
    let value = leaf(node.right.as_deref(), "comparison")?;
    if !is_value(value) {
        return Err(QueryError::InvalidTerm(value.to_owned()));
    }
    Ok(Condition {
        property: checked_property(property)?,
        value: value.to_owned(),
    })
}

fn prefix_binding(node: &Node) -> Result<PrefixBinding, QueryError> {
    let name = leaf(node.left.as_deref(), "prefix definition")?;
    let iri = leaf(node.right.as_deref(), "prefix definition")?;
    if node.val != "=" || name.contains(':') || !is_name(name) {
        return Err(QueryError::InvalidTerm(name.to_owned()));
    }
    if !is_iri(iri) {
        return Err(QueryError::InvalidTerm(iri.to_owned()));
    }
    Ok(PrefixBinding {
        name: name.to_owned(),
        iri: iri.to_owned(),
    })
}

fn sort_key(node: &Node) -> Result<SortKey, QueryError> {
    let term = leaf(Some(node), "sort term")?;
    let (order, property) = if let Some(property) = term.strip_prefix('+') {
        (Order::Ascending, property)
    } else if let Some(property) = term.strip_prefix('-') {
        (Order::Descending, property)
    } else {
        (Order::Unspecified, term)
    };
    Ok(SortKey {
        property: checked_property(property)?,
        order,
    })
}

fn search_term(node: &Node) -> Result<String, QueryError> {
    let term = leaf(Some(node), "search term")?;
    if !is_literal(term) {
        return Err(QueryError::InvalidTerm(term.to_owned()));
    }
    Ok(term.to_owned())
}

fn leaf<'a>(node: Option<&'a Node>, context: &str) -> Result<&'a str, QueryError> {
    match node {
        Some(node) if node.is_leaf() => Ok(&node.val),
        Some(node) => Err(QueryError::Tree(format!("unexpected {} in {context}", node.val))),
        None => Err(QueryError::Tree(format!("incomplete {context}"))),
    }
}

fn checked_property(property: &str) -> Result<String, QueryError> {
    let starts_well = property
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    if is_iri(property) || (starts_well && is_name(property)) {
        Ok(property.to_owned())
    } else {
        Err(QueryError::InvalidTerm(property.to_owned()))
    }
}

fn is_name(term: &str) -> bool {
    !term.is_empty()
        && term
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

fn is_iri(term: &str) -> bool {
    term.len() >= 2
        && term.starts_with('<')
        && term.ends_with('>')
        && !term[1..term.len() - 1]
            .contains(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | '"' | '{' | '}' | '\\'))
}

/// A quoted string, optionally followed by a datatype or language tag.
fn is_literal(term: &str) -> bool {
    let Some(body) = term.strip_prefix('"') else {
        return false;
    };
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => {
                let suffix = &body[i + 1..];
                return suffix.is_empty()
                    || suffix
                        .strip_prefix("^^")
                        .is_some_and(|t| is_iri(t) || is_name(t))
                    || suffix.strip_prefix('@').is_some_and(|tag| {
                        !tag.is_empty() && tag.chars().all(|c| c.is_alphanumeric() || c == '-')
                    });
            }
            _ => {}
        }
    }
    false
}

fn is_value(term: &str) -> bool {
    is_iri(term) || is_literal(term) || is_name(term.trim_start_matches(['+', '-']))
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{Clause, Condition, Field, Order, PrefixBinding, SortKey, parse_clauses};
    use crate::query::{Node, QueryError};

    fn clause(marker: &str, body: Option<Node>) -> Node {
        Node::branch(marker, None, body)
    }

    #[test]
    fn select_fields_nest() -> Result<()> {
        let root = clause(
            "oslc.select",
            Node::list(
                ",",
                vec![
                    Node::leaf("dcterms:title"),
                    Node::branch(
                        "{",
                        Some(Node::leaf("dcterms:creator")),
                        Some(Node::leaf("foaf:name")),
                    ),
                ],
            ),
        );
        assert_eq!(
            parse_clauses(&root)?,
            [Clause::Select(vec![
                Field {
                    property: "dcterms:title".into(),
                    nested: vec![],
                },
                Field {
                    property: "dcterms:creator".into(),
                    nested: vec![Field {
                        property: "foaf:name".into(),
                        nested: vec![],
                    }],
                },
            ])]
        );
        Ok(())
    }

    #[test]
    fn clauses_follow_the_chain() -> Result<()> {
        let order_by = clause("oslc.orderBy", Node::list(",", vec![Node::leaf("-ex:rank"), Node::leaf("ex:name")]));
        let prefix = Node::branch(
            "oslc.prefix",
            Some(order_by),
            Some(Node::branch(
                "=",
                Some(Node::leaf("ex")),
                Some(Node::leaf("<http://example.org/>")),
            )),
        );
        let root = Node::branch(
            "oslc.where",
            Some(prefix),
            Some(Node::branch("=", Some(Node::leaf("ex:open")), Some(Node::leaf("true")))),
        );
        assert_eq!(
            parse_clauses(&root)?,
            [
                Clause::Where(vec![Condition {
                    property: "ex:open".into(),
                    value: "true".into(),
                }]),
                Clause::Prefix(vec![PrefixBinding {
                    name: "ex".into(),
                    iri: "<http://example.org/>".into(),
                }]),
                Clause::OrderBy(vec![
                    SortKey {
                        property: "ex:rank".into(),
                        order: Order::Descending,
                    },
                    SortKey {
                        property: "ex:name".into(),
                        order: Order::Unspecified,
                    },
                ]),
            ]
        );
        Ok(())
    }

    #[test]
    fn only_equality_is_supported() {
        let root = clause(
            "oslc.where",
            Some(Node::branch(
                "<",
                Some(Node::leaf("ex:rank")),
                Some(Node::leaf("3")),
            )),
        );
        assert_eq!(
            parse_clauses(&root),
            Err(QueryError::UnsupportedOperator("<".into()))
        );
    }

    #[test]
    fn injected_terms_are_rejected() {
        let root = clause(
            "oslc.where",
            Some(Node::branch(
                "=",
                Some(Node::leaf("ex:p")),
                Some(Node::leaf("1 } } DROP ALL #")),
            )),
        );
        assert!(matches!(parse_clauses(&root), Err(QueryError::InvalidTerm(_))));

        let root = clause("oslc.select", Some(Node::leaf("?x")));
        assert!(matches!(parse_clauses(&root), Err(QueryError::InvalidTerm(_))));
    }

    #[test]
    fn unknown_markers_are_tree_errors() {
        let root = clause("oslc.limit", Some(Node::leaf("10")));
        assert!(matches!(parse_clauses(&root), Err(QueryError::Tree(_))));
        let root = clause("oslc.select", None);
        assert!(matches!(parse_clauses(&root), Err(QueryError::Tree(_))));
    }

    #[test]
    fn search_terms_must_be_quoted() -> Result<()> {
        let root = clause("oslc.searchTerms", Some(Node::leaf("\"disk full\"")));
        assert_eq!(
            parse_clauses(&root)?,
            [Clause::SearchTerms(vec!["\"disk full\"".into()])]
        );
        let root = clause("oslc.searchTerms", Some(Node::leaf("disk")));
        assert!(parse_clauses(&root).is_err());
        Ok(())
    }
}
