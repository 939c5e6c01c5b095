use super::{
    Node, OSLC_ORDER_BY, OSLC_PREFIX, OSLC_SEARCH_TERMS, OSLC_SELECT, OSLC_WHERE, QueryError,
};

/// Builds a query tree from decoded `oslc.*` query parameters. `*` selects
/// every graph, as does a query with no clauses at all. A missing select
/// leaves the select node without a body, so only `?g` is projected.
/// Unknown parameters are ignored.
pub(crate) fn parse_query_string(params: &[(String, String)]) -> Result<Node, QueryError> {
    let lookup = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    };
    let select = match lookup(OSLC_SELECT) {
        Some("*") => Some(Node::leaf("*")),
        Some(text) => Some(parse_clause(OSLC_SELECT, text, Cursor::properties)?),
        None => None,
    };
    let mut clauses = vec![];
    if let Some(text) = lookup(OSLC_WHERE) {
        clauses.push((OSLC_WHERE, parse_clause(OSLC_WHERE, text, Cursor::compound_term)?));
    }
    if let Some(text) = lookup(OSLC_PREFIX) {
        clauses.push((OSLC_PREFIX, parse_clause(OSLC_PREFIX, text, Cursor::prefix_defs)?));
    }
    if let Some(text) = lookup(OSLC_ORDER_BY) {
        clauses.push((OSLC_ORDER_BY, parse_clause(OSLC_ORDER_BY, text, Cursor::sort_terms)?));
    }
    if let Some(text) = lookup(OSLC_SEARCH_TERMS) {
        clauses.push((
            OSLC_SEARCH_TERMS,
            parse_clause(OSLC_SEARCH_TERMS, text, Cursor::search_terms)?,
        ));
    }
    let rest = clauses
        .into_iter()
        .rev()
        .fold(None, |rest, (marker, body)| {
            Some(Node::branch(marker, rest, Some(body)))
        });
    let select = match (select, &rest) {
        (None, None) => Some(Node::leaf("*")),
        (select, _) => select,
    };
    Ok(Node::branch(OSLC_SELECT, rest, select))
}

fn parse_clause<'a>(
    clause: &'static str,
    text: &'a str,
    parse: impl FnOnce(&mut Cursor<'a>) -> Result<Node, QueryError>,
) -> Result<Node, QueryError> {
    let mut cursor = Cursor::new(clause, text);
    let node = parse(&mut cursor)?;
    if !cursor.at_end() {
        return Err(cursor.error("unexpected trailing input"));
    }
    Ok(node)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '*')
}

struct Cursor<'a> {
    clause: &'static str,
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(clause: &'static str, src: &'a str) -> Cursor<'a> {
        Cursor {
            clause,
            src,
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> QueryError {
        QueryError::Syntax {
            clause: self.clause,
            offset: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), QueryError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{c}`")))
        }
    }

    fn take_while(&mut self, f: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c| !f(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn name(&mut self) -> Result<&'a str, QueryError> {
        self.skip_ws();
        let name = self.take_while(is_name_char);
        if name.is_empty() {
            return Err(self.error("expected a name"));
        }
        Ok(name)
    }

    /// Consumes `word` when it stands alone as the next name.
    fn keyword(&mut self, word: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        let len = rest.find(|c| !is_name_char(c)).unwrap_or(rest.len());
        if &rest[..len] == word {
            self.pos += len;
            true
        } else {
            false
        }
    }

    fn iri(&mut self) -> Result<&'a str, QueryError> {
        self.skip_ws();
        let rest = self.rest();
        if !rest.starts_with('<') {
            return Err(self.error("expected an IRI"));
        }
        let Some(end) = rest.find('>') else {
            return Err(self.error("unterminated IRI"));
        };
        let iri = &rest[..=end];
        if iri[1..end].contains(|c: char| c.is_whitespace() || matches!(c, '<' | '"' | '{' | '}')) {
            return Err(self.error("invalid character in IRI"));
        }
        self.pos += end + 1;
        Ok(iri)
    }

    fn string(&mut self) -> Result<&'a str, QueryError> {
        self.skip_ws();
        let start = self.pos;
        if !self.rest().starts_with('"') {
            return Err(self.error("expected a quoted string"));
        }
        let mut escaped = false;
        let mut end = None;
        for (i, c) in self.rest().char_indices().skip(1) {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    end = Some(i + 1);
                    break;
                }
                _ => {}
            }
        }
        let Some(end) = end else {
            return Err(self.error("unterminated string"));
        };
        self.pos += end;
        if self.rest().starts_with("^^") {
            self.pos += 2;
            if self.rest().starts_with('<') {
                self.iri()?;
            } else {
                self.name()?;
            }
        } else if self.rest().starts_with('@') {
            self.pos += 1;
            if self.take_while(|c| c.is_alphanumeric() || c == '-').is_empty() {
                return Err(self.error("expected a language tag"));
            }
        }
        Ok(&self.src[start..self.pos])
    }

    fn property_name(&mut self) -> Result<&'a str, QueryError> {
        match self.peek() {
            Some('<') => self.iri(),
            _ => self.name(),
        }
    }

    fn value(&mut self) -> Result<&'a str, QueryError> {
        match self.peek() {
            Some('"') => self.string(),
            Some('<') => self.iri(),
            _ => self.name(),
        }
    }

    fn operator(&mut self) -> Result<&'a str, QueryError> {
        self.skip_ws();
        let rest = self.rest();
        for op in ["!=", "<=", ">=", "=", "<", ">"] {
            if rest.starts_with(op) {
                self.pos += op.len();
                return Ok(op);
            }
        }
        if self.keyword("in") {
            return Ok("in");
        }
        Err(self.error("expected a comparison operator"))
    }

    /// `property ("," property)*`, where a property may carry a nested
    /// `{…}` selection.
    fn properties(&mut self) -> Result<Node, QueryError> {
        let mut items = vec![self.property()?];
        while self.eat(',') {
            items.push(self.property()?);
        }
        Node::list(",", items).ok_or_else(|| self.error("expected a property"))
    }

    fn property(&mut self) -> Result<Node, QueryError> {
        let name = Node::leaf(self.property_name()?);
        if self.eat('{') {
            let nested = self.properties()?;
            self.expect('}')?;
            return Ok(Node::branch("{", Some(name), Some(nested)));
        }
        Ok(name)
    }

    fn compound_term(&mut self) -> Result<Node, QueryError> {
        let mut items = vec![self.simple_term()?];
        while self.keyword("and") {
            items.push(self.simple_term()?);
        }
        Node::list("and", items).ok_or_else(|| self.error("expected a term"))
    }

    fn simple_term(&mut self) -> Result<Node, QueryError> {
        let property = Node::leaf(self.property_name()?);
        if self.peek() == Some('{') {
            return Err(self.error("nested terms are not supported"));
        }
        let op = self.operator()?;
        if op == "in" {
            self.expect('[')?;
            let mut values = vec![Node::leaf(self.value()?)];
            while self.eat(',') {
                values.push(Node::leaf(self.value()?));
            }
            self.expect(']')?;
            return Ok(Node::branch(op, Some(property), Node::list(",", values)));
        }
        let value = Node::leaf(self.value()?);
        Ok(Node::branch(op, Some(property), Some(value)))
    }

    fn prefix_defs(&mut self) -> Result<Node, QueryError> {
        let mut items = vec![];
        loop {
            self.skip_ws();
            let name = self.take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
            if name.is_empty() {
                return Err(self.error("expected a prefix name"));
            }
            self.expect('=')?;
            let iri = self.iri()?;
            items.push(Node::branch("=", Some(Node::leaf(name)), Some(Node::leaf(iri))));
            if !self.eat(',') {
                break;
            }
        }
        Node::list(",", items).ok_or_else(|| self.error("expected a prefix definition"))
    }

    fn sort_terms(&mut self) -> Result<Node, QueryError> {
        let mut items = vec![];
        loop {
            let sign = if self.eat('+') {
                "+"
            } else if self.eat('-') {
                "-"
            } else {
                ""
            };
            let name = self.property_name()?;
            if self.peek() == Some('{') {
                return Err(self.error("nested sort terms are not supported"));
            }
            items.push(Node::leaf(format!("{sign}{name}")));
            if !self.eat(',') {
                break;
            }
        }
        Node::list(",", items).ok_or_else(|| self.error("expected a sort term"))
    }

    fn search_terms(&mut self) -> Result<Node, QueryError> {
        let mut items = vec![Node::leaf(self.string()?)];
        while self.eat(',') {
            items.push(Node::leaf(self.string()?));
        }
        Node::list(",", items).ok_or_else(|| self.error("expected a search term"))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::parse_query_string;
    use crate::query::{Node, QueryError};

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn star_or_empty_query_is_the_wildcard() -> Result<()> {
        for query in [params(&[]), params(&[("oslc.select", " * ")])] {
            let tree = parse_query_string(&query)?;
            assert_eq!(tree, Node::branch("oslc.select", None, Some(Node::leaf("*"))));
        }
        Ok(())
    }

    #[test]
    fn where_without_select_keeps_its_filter() -> Result<()> {
        let tree = parse_query_string(&params(&[("oslc.where", r#"dcterms:type="bug""#)]))?;
        assert_eq!(tree.val, "oslc.select");
        assert_eq!(tree.right, None);
        assert_eq!(tree.left.as_deref().map(|n| n.val.as_str()), Some("oslc.where"));
        Ok(())
    }

    #[test]
    fn nested_select() -> Result<()> {
        let tree = parse_query_string(&params(&[(
            "oslc.select",
            "dcterms:title, dcterms:creator{foaf:name}",
        )]))?;
        let expected = Node::branch(
            "oslc.select",
            None,
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
        assert_eq!(tree, expected);
        Ok(())
    }

    #[test]
    fn clauses_chain_behind_select() -> Result<()> {
        let tree = parse_query_string(&params(&[
            ("oslc.orderBy", "-dcterms:created"),
            ("oslc.where", r#"dcterms:title="Bug" and ex:open=true"#),
            ("oslc.select", "dcterms:title"),
            ("oslc.prefix", "dcterms=<http://purl.org/dc/terms/>,ex=<http://example.org/>"),
        ]))?;
        assert_eq!(tree.val, "oslc.select");
        let mut markers = vec![];
        let mut next = Some(&tree);
        while let Some(node) = next {
            markers.push(node.val.as_str());
            next = node.left.as_deref();
        }
        assert_eq!(markers, ["oslc.select", "oslc.where", "oslc.prefix", "oslc.orderBy"]);

        let where_body = tree.left.as_deref().and_then(|n| n.right.as_deref());
        let terms = where_body.map(|b| b.items("and")).unwrap_or_default();
        assert_eq!(terms.len(), 2);
        assert_eq!(
            *terms[0],
            Node::branch("=", Some(Node::leaf("dcterms:title")), Some(Node::leaf("\"Bug\"")))
        );
        Ok(())
    }

    #[test]
    fn typed_and_tagged_literals_stay_whole() -> Result<()> {
        let tree = parse_query_string(&params(&[(
            "oslc.where",
            r#"dcterms:created>="2020-01-01"^^xsd:date and dcterms:title="Hallo"@de"#,
        )]))?;
        let body = tree.left.as_deref().and_then(|n| n.right.as_deref());
        let values: Vec<_> = body
            .map(|b| b.items("and"))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| t.right.as_deref().map(|v| (t.val.clone(), v.val.clone())))
            .collect();
        assert_eq!(
            values,
            [
                (">=".to_string(), r#""2020-01-01"^^xsd:date"#.to_string()),
                ("=".to_string(), r#""Hallo"@de"#.to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn syntax_errors_report_the_clause() {
        let error = parse_query_string(&params(&[("oslc.select", "dcterms:creator{foaf:name")]))
            .err();
        assert!(matches!(
            error,
            Some(QueryError::Syntax {
                clause: "oslc.select",
                ..
            })
        ));
        assert!(parse_query_string(&params(&[("oslc.where", "dcterms:title")])).is_err());
        assert!(parse_query_string(&params(&[("oslc.prefix", "dcterms=http://x")])).is_err());
        assert!(parse_query_string(&params(&[("oslc.searchTerms", "bug")])).is_err());
    }
}
