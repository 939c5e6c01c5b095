//! Repairs backslash sequences that parsers leave behind where path
//! separators were meant.

use super::Triple;

pub(crate) fn sanitize_triples(mut triples: Vec<Triple>) -> Vec<Triple> {
    for triple in &mut triples {
        sanitize_in_place(triple.subject.lexical_mut());
        sanitize_in_place(&mut triple.predicate);
        sanitize_in_place(triple.object.lexical_mut());
    }
    triples
}

fn sanitize_in_place(value: &mut String) {
    if value.contains('\\') {
        *value = sanitize(value);
    }
}

fn sanitize(value: &str) -> String {
    let Some(slash) = value.find("/\\") else {
        return value.replace("\\\\", "/");
    };
    // Keep everything up to and including the slash, drop the escaping run.
    let (prefix, rest) = value.split_at(slash + 1);
    let suffix = rest.trim_start_matches('\\');

    let mut result = String::with_capacity(value.len());
    result.push_str(prefix);
    let mut in_run = false;
    for c in suffix.chars() {
        if c == '\\' {
            if !in_run {
                result.push('/');
            }
            in_run = true;
        } else {
            result.push(c);
            in_run = false;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::{sanitize, sanitize_triples};
    use crate::rdf::{Term, Triple};

    #[test]
    fn escaped_segment_after_slash() {
        assert_eq!(sanitize("http://example.org/r/\\foo"), "http://example.org/r/foo");
        assert_eq!(
            sanitize("http://example.org/r/\\\\foo\\\\bar"),
            "http://example.org/r/foo/bar"
        );
        assert_eq!(sanitize("http://example.org/r/\\a\\b"), "http://example.org/r/a/b");
    }

    #[test]
    fn doubled_backslashes_without_slash() {
        assert_eq!(sanitize("http:\\\\example.org"), "http:/example.org");
        assert_eq!(sanitize("a\\b"), "a\\b");
    }

    #[test]
    fn every_position_is_cleaned() {
        let triples = vec![Triple {
            subject: Term::iri("http://example.org/r/\\s"),
            predicate: "http://example.org/\\p".to_string(),
            object: Term::string("x\\\\y"),
        }];
        let triples = sanitize_triples(triples);
        assert_eq!(triples[0].subject, Term::iri("http://example.org/r/s"));
        assert_eq!(triples[0].predicate, "http://example.org/p");
        assert_eq!(triples[0].object, Term::string("x/y"));
    }

    #[test]
    fn clean_values_are_untouched() {
        let triples = vec![Triple::new(
            "http://example.org/r/c",
            "http://example.org/p",
            Term::iri("http://example.org/o"),
        )];
        assert_eq!(sanitize_triples(triples.clone()), triples);
    }
}
