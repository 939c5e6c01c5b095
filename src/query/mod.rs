//! OSLC query support: query strings become a binary tree, the tree becomes
//! typed clauses, and the clauses become one SPARQL SELECT over all named
//! graphs.

mod ast;
mod clause;
mod parser;
mod sparql;

use thiserror::Error;

pub(crate) use self::ast::Node;
pub(crate) use self::parser::parse_query_string;
pub(crate) use self::sparql::{compile, project_results};

pub(crate) const OSLC_SELECT: &str = "oslc.select";
pub(crate) const OSLC_WHERE: &str = "oslc.where";
pub(crate) const OSLC_PREFIX: &str = "oslc.prefix";
pub(crate) const OSLC_ORDER_BY: &str = "oslc.orderBy";
pub(crate) const OSLC_SEARCH_TERMS: &str = "oslc.searchTerms";

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum QueryError {
    #[error("syntax error in {clause} at offset {offset}: {message}")]
    Syntax {
        clause: &'static str,
        offset: usize,
        message: String,
    },
    #[error("malformed query tree: {0}")]
    Tree(String),
    #[error("comparison operator {0} is not supported")]
    UnsupportedOperator(String),
    #[error("{0} is not a valid term")]
    InvalidTerm(String),
    #[error("unreadable query results: {0}")]
    Results(String),
}
