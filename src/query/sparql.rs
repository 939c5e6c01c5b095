use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use tracing::debug;

use super::clause::{Clause, Field, Order, parse_clauses};
use super::{Node, QueryError};
use crate::ldp::vocab::RDFS_MEMBER;
use crate::rdf::{Term, Triple};

/// Every named graph, whatever the rest of the tree asks for.
pub(crate) const WILDCARD_QUERY: &str = "SELECT ?g WHERE {GRAPH ?g {?s ?p ?o}}";

/// Translates a query tree to a SPARQL SELECT binding `?g` to each matching
/// graph.
pub(crate) fn compile(root: &Node) -> Result<String, QueryError> {
    if root.right.as_deref().is_some_and(|right| right.val == "*") {
        return Ok(WILDCARD_QUERY.to_string());
    }
    let clauses = parse_clauses(root)?;
    Ok(emit(&clauses))
}

#[derive(Default)]
struct Query {
    prefixes: Vec<String>,
    variables: Vec<String>,
    patterns: Vec<String>,
    /// `(variable, property, order)`, bound lazily if nothing selects it.
    order: Vec<(String, String, Order)>,
}

fn emit(clauses: &[Clause]) -> String {
    let mut query = Query::default();
    for clause in clauses {
        match clause {
            Clause::Prefix(bindings) => {
                for binding in bindings {
                    query
                        .prefixes
                        .push(format!("PREFIX {}: {}", binding.name, binding.iri));
                }
            }
            Clause::Select(fields) => query.select("?s", fields),
            Clause::Where(conditions) => {
                for condition in conditions {
                    query
                        .patterns
                        .push(format!("?s {} {}", condition.property, condition.value));
                }
            }
            Clause::OrderBy(keys) => {
                for key in keys {
                    query
                        .order
                        .push((variable_for(&key.property), key.property.clone(), key.order));
                }
            }
            Clause::SearchTerms(terms) => {
                debug!(target: "query", ?terms, "search terms are not translated");
            }
        }
    }
    query.render()
}

impl Query {
    fn select(&mut self, subject: &str, fields: &[Field]) {
        for field in fields {
            let variable = variable_for(&field.property);
            self.patterns
                .push(format!("{subject} {} ?{variable}", field.property));
            if !self.variables.contains(&variable) {
                self.variables.push(variable.clone());
            }
            if !field.nested.is_empty() {
                self.select(&format!("?{variable}"), &field.nested);
            }
        }
    }

    fn render(self) -> String {
        let mut sparql = String::new();
        for prefix in &self.prefixes {
            sparql.push_str(prefix);
            sparql.push('\n');
        }
        sparql.push_str("SELECT ?g");
        for variable in &self.variables {
            sparql.push_str(" ?");
            sparql.push_str(variable);
        }
        sparql.push_str(" WHERE { GRAPH ?g { ");
        if self.patterns.is_empty() {
            sparql.push_str("?s ?p ?o . ");
        }
        for pattern in &self.patterns {
            sparql.push_str(pattern);
            sparql.push_str(" . ");
        }
        let mut bound: HashSet<&str> = self.variables.iter().map(String::as_str).collect();
        for (variable, property, _) in &self.order {
            if bound.insert(variable) {
                sparql.push_str(&format!("OPTIONAL {{ ?s {property} ?{variable} }} "));
            }
        }
        sparql.push_str("} }");
        if !self.order.is_empty() {
            sparql.push_str(" ORDER BY");
            for (variable, _, order) in &self.order {
                match order {
                    Order::Ascending => sparql.push_str(&format!(" ASC(?{variable})")),
                    Order::Descending => sparql.push_str(&format!(" DESC(?{variable})")),
                    Order::Unspecified => sparql.push_str(&format!(" ?{variable}")),
                }
            }
        }
        sparql
    }
}

/// `dcterms:title` becomes `dcterms_title`; anything outside `[A-Za-z0-9_]`
/// is folded to `_`.
fn variable_for(property: &str) -> String {
    let folded: String = property
        .trim_start_matches('<')
        .trim_end_matches('>')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    folded.trim_matches('_').to_string()
}

#[derive(Deserialize)]
struct SparqlResults {
    results: ResultBindings,
}

#[derive(Deserialize)]
struct ResultBindings {
    bindings: Vec<BTreeMap<String, Binding>>,
}

#[derive(Deserialize)]
struct Binding {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

/// Turns SPARQL JSON results into `<base> rdfs:member <graph>` triples, one
/// per distinct `?g`.
pub(crate) fn project_results(body: &str, base: &str) -> Result<Vec<Triple>, QueryError> {
    let results: SparqlResults =
        serde_json::from_str(body).map_err(|e| QueryError::Results(e.to_string()))?;
    let mut seen = HashSet::new();
    let mut triples = vec![];
    for binding in results.results.bindings {
        let Some(graph) = binding.get("g") else {
            continue;
        };
        if graph.kind != "uri" || !seen.insert(graph.value.clone()) {
            continue;
        }
        triples.push(Triple::new(base, RDFS_MEMBER, Term::iri(&graph.value)));
    }
    Ok(triples)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{WILDCARD_QUERY, compile, project_results};
    use crate::ldp::vocab::RDFS_MEMBER;
    use crate::query::{Node, parse_query_string};
    use crate::rdf::{Term, Triple};

    fn compile_params(pairs: &[(&str, &str)]) -> Result<String> {
        let params: Vec<_> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Ok(compile(&parse_query_string(&params)?)?)
    }

    #[test]
    fn wildcard_ignores_everything_else() -> Result<()> {
        let root = Node::branch(
            "oslc.select",
            Some(Node::branch(
                "oslc.where",
                None,
                Some(Node::branch("<", Some(Node::leaf("?bad")), None)),
            )),
            Some(Node::leaf("*")),
        );
        assert_eq!(compile(&root)?, WILDCARD_QUERY);
        assert_eq!(compile(&Node::branch("anything", None, Some(Node::leaf("*"))))?, WILDCARD_QUERY);
        assert_eq!(compile_params(&[])?, "SELECT ?g WHERE {GRAPH ?g {?s ?p ?o}}");
        Ok(())
    }

    #[test]
    fn select_with_nested_properties() -> Result<()> {
        let sparql = compile_params(&[
            ("oslc.prefix", "dcterms=<http://purl.org/dc/terms/>,foaf=<http://xmlns.com/foaf/0.1/>"),
            ("oslc.select", "dcterms:title,dcterms:creator{foaf:name}"),
        ])?;
        assert_eq!(
            sparql,
            "PREFIX dcterms: <http://purl.org/dc/terms/>\n\
             PREFIX foaf: <http://xmlns.com/foaf/0.1/>\n\
             SELECT ?g ?dcterms_title ?dcterms_creator ?foaf_name WHERE { GRAPH ?g { \
             ?s dcterms:title ?dcterms_title . \
             ?s dcterms:creator ?dcterms_creator . \
             ?dcterms_creator foaf:name ?foaf_name . } }"
        );
        Ok(())
    }

    #[test]
    fn where_and_order_by() -> Result<()> {
        let sparql = compile_params(&[
            ("oslc.select", "dcterms:title"),
            ("oslc.where", r#"dcterms:type="bug" and ex:open=true"#),
            ("oslc.orderBy", "-dcterms:created,+dcterms:title,ex:rank"),
        ])?;
        assert_eq!(
            sparql,
            "SELECT ?g ?dcterms_title WHERE { GRAPH ?g { \
             ?s dcterms:title ?dcterms_title . \
             ?s dcterms:type \"bug\" . \
             ?s ex:open true . \
             OPTIONAL { ?s dcterms:created ?dcterms_created } \
             OPTIONAL { ?s ex:rank ?ex_rank } } } \
             ORDER BY DESC(?dcterms_created) ASC(?dcterms_title) ?ex_rank"
        );
        Ok(())
    }

    #[test]
    fn where_without_select_projects_graphs_only() -> Result<()> {
        let sparql = compile_params(&[("oslc.where", r#"dcterms:type="bug""#)])?;
        assert_eq!(
            sparql,
            "SELECT ?g WHERE { GRAPH ?g { ?s dcterms:type \"bug\" . } }"
        );
        Ok(())
    }

    #[test]
    fn other_comparisons_are_rejected() {
        assert!(compile_params(&[("oslc.select", "ex:a"), ("oslc.where", "ex:rank>3")]).is_err());
        assert!(
            compile_params(&[("oslc.select", "ex:a"), ("oslc.where", "ex:rank in [1,2]")])
                .is_err()
        );
    }

    #[test]
    fn results_become_distinct_member_triples() -> Result<()> {
        let body = r#"{
            "head": {"vars": ["g", "dcterms_title"]},
            "results": {"bindings": [
                {"g": {"type": "uri", "value": "http://example.org/r/a"},
                 "dcterms_title": {"type": "literal", "value": "A"}},
                {"g": {"type": "uri", "value": "http://example.org/r/a"},
                 "dcterms_title": {"type": "literal", "value": "A2"}},
                {"g": {"type": "uri", "value": "http://example.org/r/b"}},
                {"dcterms_title": {"type": "literal", "value": "orphan"}}
            ]}
        }"#;
        let triples = project_results(body, "http://example.org/search")?;
        assert_eq!(
            triples,
            [
                Triple::new(
                    "http://example.org/search",
                    RDFS_MEMBER,
                    Term::iri("http://example.org/r/a")
                ),
                Triple::new(
                    "http://example.org/search",
                    RDFS_MEMBER,
                    Term::iri("http://example.org/r/b")
                ),
            ]
        );
        assert!(project_results("not json", "http://example.org/search").is_err());
        Ok(())
    }
}
